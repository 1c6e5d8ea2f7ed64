use campaigncore::{FieldSpec, ModuleSchema, SchemaRegistry, Value};

pub const AUDIENCE_ANALYZER: &str = "audience_intelligence_analyzer";
pub const COPY_GENERATOR: &str = "copy_content_generator";
pub const VISUAL_GENERATOR: &str = "visual_asset_generator";
pub const TIMELINE_OPTIMIZER: &str = "campaign_timeline_optimizer";
pub const DISTRIBUTION_SCHEDULER: &str = "content_distribution_scheduler";
pub const LEAD_DISCOVERY: &str = "lead_discovery_engine";
pub const OUTREACH_SCHEDULER: &str = "outreach_call_scheduler";
pub const EMAIL_SENDER: &str = "email_campaign_sender";

fn open_object() -> FieldSpec {
    FieldSpec::object::<&str>([])
}

fn date_range() -> FieldSpec {
    FieldSpec::object([
        ("start_date", FieldSpec::string().describe("YYYY-MM-DD")),
        ("end_date", FieldSpec::string().describe("YYYY-MM-DD")),
    ])
}

fn strings() -> FieldSpec {
    FieldSpec::list_of(FieldSpec::string())
}

pub fn audience_analyzer() -> ModuleSchema {
    ModuleSchema::new(AUDIENCE_ANALYZER)
        .describe("Researches the target market and proposes audience segments, personas and channels")
        .category("research")
        .input("product_category", FieldSpec::string().required())
        .input(
            "geographic_location",
            FieldSpec::object([
                ("country", FieldSpec::string()),
                ("city", FieldSpec::string()),
                ("region", FieldSpec::string()),
            ])
            .required(),
        )
        .input("campaign_objective", FieldSpec::string().required())
        .input(
            "existing_customer_data",
            FieldSpec::object([
                ("age_range", FieldSpec::string()),
                ("interests", strings()),
                ("behavior_patterns", strings()),
            ]),
        )
        .input("competitor_analysis", FieldSpec::boolean().with_default(false))
        .output(
            "audience_segments",
            FieldSpec::list_of(FieldSpec::object([
                ("segment_name", FieldSpec::string()),
                ("demographics", open_object()),
                ("psychographics", open_object()),
                ("platform_preferences", strings()),
                ("content_preferences", strings()),
                ("estimated_reach", FieldSpec::integer()),
            ])),
        )
        .output("persona_profiles", FieldSpec::list_of(open_object()))
        .output("recommended_channels", strings())
        .output(
            "optimal_posting_times",
            FieldSpec::list_of(FieldSpec::object([
                ("platform", FieldSpec::string()),
                ("time_slots", strings()),
            ])),
        )
}

pub fn copy_generator() -> ModuleSchema {
    ModuleSchema::new(COPY_GENERATOR)
        .describe("Writes platform-tailored marketing copy")
        .category("content")
        .input(
            "content_type",
            FieldSpec::enumeration(["social_caption", "ad_copy", "blog_post", "email", "product_description"])
                .required(),
        )
        .input("campaign_brief", FieldSpec::string().required())
        .input(
            "tone_of_voice",
            FieldSpec::enumeration(["professional", "casual", "humorous", "inspirational", "educational"])
                .with_default("professional"),
        )
        .input("target_audience", FieldSpec::string())
        .input("platform", FieldSpec::string())
        .input("keywords", strings())
        .input(
            "word_count_range",
            FieldSpec::object([
                ("min", FieldSpec::integer().with_default(50)),
                ("max", FieldSpec::integer().with_default(150)),
            ]),
        )
        .output(
            "generated_copies",
            FieldSpec::list_of(FieldSpec::object([
                ("copy_id", FieldSpec::string()),
                ("copy_text", FieldSpec::string()),
                ("word_count", FieldSpec::integer()),
                ("hashtags", strings()),
                ("emojis", strings()),
            ])),
        )
}

pub fn visual_generator() -> ModuleSchema {
    ModuleSchema::new(VISUAL_GENERATOR)
        .describe("Generates images from a text prompt")
        .category("content")
        .input("prompt", FieldSpec::string().required())
        .input("quantity", FieldSpec::integer().with_default(1).describe("1 to 10 images"))
        .input(
            "dimensions",
            FieldSpec::object([
                ("width", FieldSpec::integer().with_default(512)),
                ("height", FieldSpec::integer().with_default(512)),
            ]),
        )
        .input(
            "image_style",
            FieldSpec::enumeration(["photorealistic", "illustration", "minimal", "abstract"]),
        )
        .output(
            "generated_images",
            FieldSpec::list_of(FieldSpec::object([
                ("image_id", FieldSpec::string()),
                ("image_url", FieldSpec::string()),
                ("metadata", open_object()),
            ])),
        )
}

pub fn timeline_optimizer() -> ModuleSchema {
    ModuleSchema::new(TIMELINE_OPTIMIZER)
        .describe("Schedules content into timeline slots around key dates and audience habits")
        .category("planning")
        .input("campaign_duration", date_range().required())
        .input(
            "content_inventory",
            FieldSpec::list_of(FieldSpec::object([
                ("content_id", FieldSpec::string()),
                ("content_type", FieldSpec::string()),
                ("platform", FieldSpec::string()),
            ])),
        )
        .input("audience_segments", strings())
        .input(
            "optimal_posting_times",
            FieldSpec::object([("platform", FieldSpec::string()), ("time_slots", strings())]),
        )
        .input(
            "posting_frequency",
            FieldSpec::object([
                ("min_posts_per_day", FieldSpec::integer().with_default(1)),
                ("max_posts_per_day", FieldSpec::integer().with_default(3)),
            ]),
        )
        .input(
            "key_dates",
            FieldSpec::list_of(FieldSpec::object([
                ("date", FieldSpec::string()),
                ("event", FieldSpec::string()),
                ("priority", strings()),
            ])),
        )
        .input("budget_constraints", open_object())
        .output(
            "optimized_timeline",
            FieldSpec::list_of(FieldSpec::object([
                ("timeline_slot_id", FieldSpec::string()),
                ("scheduled_date", FieldSpec::string()),
                ("content_type", FieldSpec::string()),
                ("platform", FieldSpec::string()),
                ("target_segment", FieldSpec::string()),
                ("priority", strings()),
                ("optimal_time", FieldSpec::string()),
                ("reasoning", FieldSpec::string()),
            ])),
        )
        .output("timeline_insights", open_object())
}

pub fn distribution_scheduler() -> ModuleSchema {
    ModuleSchema::new(DISTRIBUTION_SCHEDULER)
        .describe("Pairs copies and assets with timeline slots into a posting schedule")
        .category("distribution")
        .input("optimized_timeline", FieldSpec::list())
        .input("generated_copies", FieldSpec::list())
        .input("generated_images", FieldSpec::list())
        .input("video_url", FieldSpec::string())
        .input(
            "platform_specifications",
            FieldSpec::object([
                ("platform_name", FieldSpec::string()),
                ("max_caption_length", FieldSpec::integer().with_default(2200)),
                ("supported_formats", strings()),
                ("aspect_ratio_requirements", FieldSpec::string()),
            ]),
        )
        .output("distribution_schedule", FieldSpec::list_of(open_object()))
        .output(
            "schedule_summary",
            FieldSpec::object([
                ("total_posts", FieldSpec::integer()),
                ("posts_by_platform", open_object()),
                ("campaign_coverage", open_object()),
            ]),
        )
}

pub fn lead_discovery() -> ModuleSchema {
    ModuleSchema::new(LEAD_DISCOVERY)
        .describe("Finds prospective leads and collaborators matching search criteria")
        .category("outreach")
        .input(
            "search_criteria",
            FieldSpec::object([
                ("industry", strings()),
                ("company_size", FieldSpec::string()),
                ("job_titles", strings()),
                ("location", FieldSpec::string()),
            ])
            .required(),
        )
        .input("audience_segments", FieldSpec::list())
        .input(
            "data_sources",
            strings().with_default(Value::list(["linkedin", "web_scraping"])),
        )
        .output(
            "discovered_leads",
            FieldSpec::list_of(FieldSpec::object([
                ("lead_id", FieldSpec::string()),
                ("company_name", FieldSpec::string()),
                ("contact_name", FieldSpec::string()),
                ("email", FieldSpec::string()),
                ("job_title", FieldSpec::string()),
                ("industry", FieldSpec::string()),
                ("qualification_score", FieldSpec::number()),
                ("notes", FieldSpec::string()),
            ])),
        )
        .output(
            "collaborators",
            FieldSpec::list_of(FieldSpec::object([
                ("name", FieldSpec::string()),
                ("image_link", FieldSpec::string()),
            ])),
        )
}

pub fn outreach_scheduler() -> ModuleSchema {
    ModuleSchema::new(OUTREACH_SCHEDULER)
        .describe("Prioritizes leads and books outreach calls inside the allowed windows")
        .category("outreach")
        .input("discovered_leads", FieldSpec::list().required())
        .input(
            "call_window_preferences",
            FieldSpec::object([
                ("timezone", FieldSpec::string()),
                ("preferred_hours", strings()),
                ("avoid_dates", strings()),
            ]),
        )
        .input("campaign_duration", date_range())
        .input("calls_per_day", FieldSpec::integer().with_default(10))
        .input(
            "prioritization_criteria",
            FieldSpec::object([
                ("qualification_score_threshold", FieldSpec::number().with_default(50.0)),
                ("priority_segments", strings()),
            ]),
        )
        .output("call_schedule", FieldSpec::list_of(open_object()))
        .output(
            "schedule_summary",
            FieldSpec::object([
                ("total_calls_scheduled", FieldSpec::integer()),
                ("daily_distribution", open_object()),
                ("coverage_percentage", FieldSpec::number()),
                ("estimated_completion_date", FieldSpec::string()),
            ]),
        )
}

pub fn email_sender() -> ModuleSchema {
    ModuleSchema::new(EMAIL_SENDER)
        .describe("Writes and sends personalised campaign emails")
        .category("outreach")
        .input("company_name", FieldSpec::string().required())
        .input("campaign_description", FieldSpec::string().required())
        .input(
            "recipients",
            FieldSpec::list_of(FieldSpec::object([
                ("name", FieldSpec::string()),
                ("email", FieldSpec::string()),
                ("personal_description", FieldSpec::string()),
            ]))
            .required(),
        )
        .input("sender_name", FieldSpec::string())
        .input("email_subject", FieldSpec::string())
        .output("campaign_summary", open_object())
        .output(
            "delivery_results",
            FieldSpec::list_of(FieldSpec::object([
                ("recipient_name", FieldSpec::string()),
                ("recipient_email", FieldSpec::string()),
                ("status", FieldSpec::enumeration(["sent", "failed"])),
                ("error_message", FieldSpec::string()),
                ("email_content", FieldSpec::string()),
            ])),
        )
}

/// Every built-in marketing module
pub fn builtin_schemas() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    for schema in [
        audience_analyzer(),
        copy_generator(),
        visual_generator(),
        timeline_optimizer(),
        distribution_scheduler(),
        lead_discovery(),
        outreach_scheduler(),
        email_sender(),
    ] {
        registry.register(schema);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_every_module() {
        let registry = builtin_schemas();
        assert_eq!(registry.len(), 8);
        assert!(registry.contains(LEAD_DISCOVERY));
        assert_eq!(registry.get(VISUAL_GENERATOR).unwrap().endpoint_path(), VISUAL_GENERATOR);
    }

    #[test]
    fn copy_generator_defaults() {
        let schema = copy_generator();
        assert_eq!(
            schema.inputs["content_type"].default_value(),
            Some(Value::from("social_caption"))
        );
        assert_eq!(
            schema.inputs["word_count_range"].default_value(),
            Some(Value::object([("min", 50), ("max", 150)]))
        );
        assert_eq!(schema.inputs["target_audience"].default_value(), None);
        let mut required: Vec<&str> = schema.required_inputs().collect();
        required.sort();
        assert_eq!(required, vec!["campaign_brief", "content_type"]);
    }
}
