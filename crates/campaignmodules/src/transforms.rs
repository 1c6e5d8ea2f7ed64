use crate::schemas::*;
use campaigncore::Value;
use campaignruntime::transform::{
    extract_first, first_record_as, join_text, map_records, normalize_records, pluck, prop, summarize,
};
use campaignruntime::{TransformKey, TransformerRegistry};

fn key(source_type: &str, source_field: &str, target_type: &str, target_field: &str) -> TransformKey {
    TransformKey::new(source_type, source_field, target_type, target_field)
}

/// Register the reshaping rules between built-in module pairs. Pairs not
/// listed here are passed through unchanged.
pub fn register_defaults(registry: &mut TransformerRegistry) {
    // copy generator -> single prompt/description strings
    registry.register(
        key(COPY_GENERATOR, "generated_copies", VISUAL_GENERATOR, "prompt"),
        extract_first("copy_text"),
    );
    registry.register(
        key(COPY_GENERATOR, "generated_copies", EMAIL_SENDER, "campaign_description"),
        extract_first("copy_text"),
    );
    registry.register(
        key(COPY_GENERATOR, "generated_copies", TIMELINE_OPTIMIZER, "content_inventory"),
        map_records(vec![
            prop("content_id", "copy_id", ""),
            prop("content_type", "content_type", "social_caption"),
            prop("platform", "platform", "instagram"),
        ]),
    );

    // audience analyzer
    registry.register(
        key(AUDIENCE_ANALYZER, "audience_segments", TIMELINE_OPTIMIZER, "audience_segments"),
        pluck("segment_name"),
    );
    registry.register(
        key(AUDIENCE_ANALYZER, "optimal_posting_times", TIMELINE_OPTIMIZER, "optimal_posting_times"),
        first_record_as(vec![
            prop("platform", "platform", ""),
            prop("time_slots", "time_slots", Value::empty_list()),
        ]),
    );
    registry.register(
        key(AUDIENCE_ANALYZER, "recommended_channels", COPY_GENERATOR, "platform"),
        extract_first("platform"),
    );
    registry.register(
        key(AUDIENCE_ANALYZER, "audience_segments", COPY_GENERATOR, "target_audience"),
        join_text("segment_name", ", "),
    );

    registry.register(
        key(VISUAL_GENERATOR, "generated_images", DISTRIBUTION_SCHEDULER, "generated_images"),
        normalize_records("image_id", "image_url", "image"),
    );

    registry.register(
        key(TIMELINE_OPTIMIZER, "optimized_timeline", COPY_GENERATOR, "campaign_brief"),
        summarize("scheduled post", "scheduled posts"),
    );
    registry.register(
        key(DISTRIBUTION_SCHEDULER, "distribution_schedule", EMAIL_SENDER, "campaign_description"),
        summarize("scheduled post", "scheduled posts"),
    );

    // lead discovery
    registry.register(
        key(LEAD_DISCOVERY, "discovered_leads", EMAIL_SENDER, "recipients"),
        map_records(vec![
            prop("name", "contact_name", ""),
            prop("email", "email", ""),
            prop("personal_description", "notes", ""),
        ]),
    );
    registry.register(
        key(LEAD_DISCOVERY, "discovered_leads", OUTREACH_SCHEDULER, "discovered_leads"),
        normalize_records("lead_id", "company_name", "lead"),
    );
    registry.register(
        key(LEAD_DISCOVERY, "collaborators", COPY_GENERATOR, "keywords"),
        pluck("name"),
    );

    tracing::debug!("Registered {} built-in transformers", registry.len());
}

pub fn builtin_transformers() -> TransformerRegistry {
    let mut registry = TransformerRegistry::new();
    register_defaults(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn apply(k: TransformKey, value: Value) -> Value {
        builtin_transformers().apply(&k, &value)
    }

    #[test]
    fn copies_become_prompt() {
        let copies = Value::list([
            Value::object([("copy_id", "c1"), ("copy_text", "Morning ritual, upgraded")]),
            Value::object([("copy_id", "c2"), ("copy_text", "Second")]),
        ]);
        assert_eq!(
            apply(key(COPY_GENERATOR, "generated_copies", VISUAL_GENERATOR, "prompt"), copies),
            Value::from("Morning ritual, upgraded")
        );
        assert_eq!(
            apply(
                key(COPY_GENERATOR, "generated_copies", VISUAL_GENERATOR, "prompt"),
                Value::empty_list()
            ),
            Value::from("")
        );
    }

    #[test]
    fn copies_become_content_inventory() {
        let copies = Value::list([Value::object([("copy_id", "c1"), ("copy_text", "Hello")])]);
        assert_eq!(
            apply(
                key(COPY_GENERATOR, "generated_copies", TIMELINE_OPTIMIZER, "content_inventory"),
                copies
            ),
            Value::list([Value::object([
                ("content_id", "c1"),
                ("content_type", "social_caption"),
                ("platform", "instagram"),
            ])])
        );
    }

    #[test]
    fn segments_feed_timeline_and_copy() {
        let segments = Value::list([
            Value::object([("segment_name", "Remote workers"), ("estimated_reach", "12000")]),
            Value::object([("segment_name", "Students")]),
        ]);
        assert_eq!(
            apply(
                key(AUDIENCE_ANALYZER, "audience_segments", TIMELINE_OPTIMIZER, "audience_segments"),
                segments.clone()
            ),
            Value::list(["Remote workers", "Students"])
        );
        assert_eq!(
            apply(
                key(AUDIENCE_ANALYZER, "audience_segments", COPY_GENERATOR, "target_audience"),
                segments
            ),
            Value::from("Remote workers, Students")
        );
    }

    #[test]
    fn posting_times_take_first_platform() {
        let times = Value::list([
            Value::object([
                ("platform", Value::from("LinkedIn")),
                ("time_slots", Value::list(["09:00", "12:00"])),
            ]),
            Value::object([("platform", "Instagram")]),
        ]);
        assert_eq!(
            apply(
                key(AUDIENCE_ANALYZER, "optimal_posting_times", TIMELINE_OPTIMIZER, "optimal_posting_times"),
                times
            ),
            Value::object([
                ("platform", Value::from("LinkedIn")),
                ("time_slots", Value::list(["09:00", "12:00"])),
            ])
        );
    }

    #[test]
    fn first_channel_becomes_platform() {
        assert_eq!(
            apply(
                key(AUDIENCE_ANALYZER, "recommended_channels", COPY_GENERATOR, "platform"),
                Value::list(["LinkedIn", "Instagram"])
            ),
            Value::from("LinkedIn")
        );
    }

    #[test]
    fn image_urls_are_normalized() {
        let images = Value::list([
            Value::from("https://img.example/1.png"),
            Value::object([("image_url", "https://img.example/2.png")]),
        ]);
        assert_eq!(
            apply(
                key(VISUAL_GENERATOR, "generated_images", DISTRIBUTION_SCHEDULER, "generated_images"),
                images
            ),
            Value::list([
                Value::object([
                    ("image_id", Value::from("image_1")),
                    ("image_url", Value::from("https://img.example/1.png")),
                    ("metadata", Value::empty_object()),
                ]),
                Value::object([
                    ("image_id", Value::from("image_2")),
                    ("image_url", Value::from("https://img.example/2.png")),
                    ("metadata", Value::empty_object()),
                ]),
            ])
        );
    }

    #[test]
    fn schedules_are_summarized() {
        let k = key(DISTRIBUTION_SCHEDULER, "distribution_schedule", EMAIL_SENDER, "campaign_description");
        assert_eq!(apply(k.clone(), Value::empty_list()), Value::from("No scheduled posts"));
        assert_eq!(
            apply(k.clone(), Value::list([Value::empty_object()])),
            Value::from("1 scheduled post")
        );
        assert_eq!(
            apply(k, Value::list([Value::empty_object(), Value::empty_object()])),
            Value::from("2 scheduled posts")
        );
    }

    #[test]
    fn leads_become_recipients() {
        let leads = Value::list([Value::object([
            ("lead_id", "l1"),
            ("contact_name", "Priya Shah"),
            ("email", "priya@example.com"),
            ("notes", "Loves cold brew"),
        ])]);
        assert_eq!(
            apply(key(LEAD_DISCOVERY, "discovered_leads", EMAIL_SENDER, "recipients"), leads),
            Value::list([Value::object([
                ("name", "Priya Shah"),
                ("email", "priya@example.com"),
                ("personal_description", "Loves cold brew"),
            ])])
        );
    }

    #[test]
    fn collaborators_become_keywords() {
        let collaborators = Value::list([
            Value::object([("name", "Ana"), ("image_link", "")]),
            Value::object([("image_link", "x")]),
        ]);
        assert_eq!(
            apply(key(LEAD_DISCOVERY, "collaborators", COPY_GENERATOR, "keywords"), collaborators),
            Value::list(["Ana"])
        );
    }

    #[test]
    fn unlisted_pair_passes_through() {
        let value = Value::list(["a", "b"]);
        assert_eq!(
            apply(key(EMAIL_SENDER, "delivery_results", COPY_GENERATOR, "keywords"), value.clone()),
            value
        );
    }
}
