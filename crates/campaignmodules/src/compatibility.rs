use crate::schemas::*;
use campaigncore::{field_key, CompatibilityMatrix, Targets};

/// Which built-in outputs may be wired into which built-in inputs
pub fn builtin_matrix() -> CompatibilityMatrix {
    let mut matrix = CompatibilityMatrix::new();

    matrix.allow(
        COPY_GENERATOR,
        "generated_copies",
        Targets::keys([
            field_key(VISUAL_GENERATOR, "prompt"),
            field_key(EMAIL_SENDER, "campaign_description"),
            field_key(TIMELINE_OPTIMIZER, "content_inventory"),
            field_key(DISTRIBUTION_SCHEDULER, "generated_copies"),
        ]),
    );

    matrix.allow(
        AUDIENCE_ANALYZER,
        "audience_segments",
        Targets::keys([
            field_key(TIMELINE_OPTIMIZER, "audience_segments"),
            field_key(COPY_GENERATOR, "target_audience"),
            field_key(LEAD_DISCOVERY, "audience_segments"),
        ]),
    );
    matrix.allow(
        AUDIENCE_ANALYZER,
        "optimal_posting_times",
        Targets::keys([field_key(TIMELINE_OPTIMIZER, "optimal_posting_times")]),
    );
    matrix.allow(
        AUDIENCE_ANALYZER,
        "recommended_channels",
        Targets::keys([field_key(COPY_GENERATOR, "platform")]),
    );

    // Images are accepted anywhere; consumers without a transformer get them as-is
    matrix.allow(VISUAL_GENERATOR, "generated_images", Targets::any());

    matrix.allow(
        TIMELINE_OPTIMIZER,
        "optimized_timeline",
        Targets::keys([
            field_key(COPY_GENERATOR, "campaign_brief"),
            field_key(DISTRIBUTION_SCHEDULER, "optimized_timeline"),
        ]),
    );

    matrix.allow(
        DISTRIBUTION_SCHEDULER,
        "distribution_schedule",
        Targets::keys([field_key(EMAIL_SENDER, "campaign_description")]),
    );

    matrix.allow(
        LEAD_DISCOVERY,
        "discovered_leads",
        Targets::keys([
            field_key(EMAIL_SENDER, "recipients"),
            field_key(OUTREACH_SCHEDULER, "discovered_leads"),
        ]),
    );
    matrix.allow(
        LEAD_DISCOVERY,
        "collaborators",
        Targets::keys([field_key(COPY_GENERATOR, "keywords")]),
    );

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_and_listed_targets() {
        let matrix = builtin_matrix();
        assert!(matrix.is_compatible(COPY_GENERATOR, "generated_copies", VISUAL_GENERATOR, "prompt"));
        assert!(!matrix.is_compatible(COPY_GENERATOR, "generated_copies", VISUAL_GENERATOR, "quantity"));
        assert!(matrix.is_compatible(VISUAL_GENERATOR, "generated_images", EMAIL_SENDER, "company_name"));
        assert!(!matrix.is_compatible(EMAIL_SENDER, "delivery_results", COPY_GENERATOR, "campaign_brief"));
    }
}
