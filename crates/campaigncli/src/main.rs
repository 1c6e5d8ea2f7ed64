// crates/campaigncli/src/main.rs

use anyhow::{bail, Context, Result};
use campaigncore::{CampaignGraph, ExecutionEvent, ModuleInstance};
use campaignmodules::schemas::*;
use campaignmodules::{
    builtin_transformers, Catalog, DryRunInvoker, HttpInvokerConfig, HttpModuleInvoker,
};
use campaignruntime::{
    CampaignRuntime, DependencyGraph, ModuleInvoker, RuntimeConfig, TransformKey,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "campaign")]
#[command(about = "Campaign Flow Engine CLI", long_about = None)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a campaign graph file
    Run {
        /// Path to campaign graph JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Log resolved inputs instead of calling the module services
        #[arg(long)]
        dry_run: bool,

        /// Base URL of the module services
        #[arg(long)]
        base_url: Option<String>,

        /// Maximum number of modules running at once (1 = sequential)
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Module catalog JSON file (defaults to the built-in catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Validate a campaign graph file
    Validate {
        /// Path to campaign graph JSON file
        file: PathBuf,

        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// List available module types
    Modules {
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Check whether an output may feed an input, e.g.
    /// `copy_content_generator.generated_copies visual_asset_generator.prompt`
    Check {
        source: String,
        target: String,

        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Create an example campaign graph
    Init {
        /// Output file path
        #[arg(short, long, default_value = "campaign.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run {
            file,
            dry_run,
            base_url,
            max_parallel,
            catalog,
        } => {
            run_campaign(file, dry_run, base_url, max_parallel, catalog).await?;
        }

        Commands::Validate { file, catalog } => {
            validate_campaign(&file, catalog.as_deref())?;
        }

        Commands::Modules { catalog } => {
            list_modules(catalog.as_deref())?;
        }

        Commands::Check {
            source,
            target,
            catalog,
        } => {
            check_pair(&source, &target, catalog.as_deref())?;
        }

        Commands::Init { output } => {
            create_example_campaign(output)?;
        }
    }

    Ok(())
}

fn load_graph(file: &Path) -> Result<CampaignGraph> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let graph: CampaignGraph =
        serde_json::from_str(&json).with_context(|| format!("parsing {}", file.display()))?;
    tracing::debug!(
        "Loaded campaign {} with {} modules and {} connections",
        graph.name,
        graph.modules.len(),
        graph.connections.len()
    );
    Ok(graph)
}

async fn run_campaign(
    file: PathBuf,
    dry_run: bool,
    base_url: Option<String>,
    max_parallel: Option<usize>,
    catalog: Option<PathBuf>,
) -> Result<()> {
    println!("🚀 Loading campaign from: {}", file.display());

    let graph = load_graph(&file)?;
    let catalog = Catalog::load(catalog.as_deref())?;

    println!("📋 Campaign: {}", graph.name);
    println!("   Modules: {}", graph.modules.len());
    println!("   Connections: {}", graph.connections.len());
    println!();

    let schemas = Arc::new(catalog.schemas);
    let invoker: Arc<dyn ModuleInvoker> = if dry_run {
        println!("🧪 Dry run: no module services will be called");
        Arc::new(DryRunInvoker::new(Arc::clone(&schemas)))
    } else {
        let mut config = HttpInvokerConfig::from_env();
        if let Some(base_url) = base_url {
            config = config.with_base_url(base_url);
        }
        println!("🌐 Module services: {}", config.base_url);
        Arc::new(HttpModuleInvoker::new(config, Arc::clone(&schemas))?)
    };

    let mut config = RuntimeConfig::from_env();
    if let Some(max_parallel) = max_parallel {
        config = config.with_max_parallel(max_parallel);
    }

    let runtime = CampaignRuntime::new(
        schemas,
        Arc::new(builtin_transformers()),
        invoker,
        config,
    );

    // Print progress as events arrive
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(follow_progress(events, |line| println!("{}", line)));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("🛑 Cancelling: in-flight modules will finish, nothing new starts");
            ctrl_c.cancel();
        }
    });

    let report = match runtime
        .execute_with(&graph, &campaigncore::NoopObserver, &cancel)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            event_task.abort();
            if let campaigncore::CampaignError::Cancelled { completed, total } = e {
                println!("🛑 Run cancelled after {}/{} modules", completed, total);
                return Ok(());
            }
            return Err(e.into());
        }
    };
    let _ = event_task.await;

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", report.execution_id);
    println!(
        "   Succeeded: {}/{} modules",
        report.succeeded(),
        graph.modules.len()
    );
    if !report.forced.is_empty() {
        println!("   Forced: {}", report.forced.join(", "));
    }

    println!();
    println!("📤 Outputs:");
    for module in &graph.modules {
        let Some(result) = report.result(&module.id) else {
            continue;
        };
        println!("   {} ({}):", module.label(), module.module_type);
        if let Some(error) = &result.error {
            println!("     error: {}", error);
        }
        let mut fields: Vec<_> = result.outputs.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in fields {
            println!("     {}: {}", key, value.to_json());
        }
    }

    Ok(())
}


/// Print one line per execution event until the run completes. A lagging
/// receiver skips what it missed and keeps following.
async fn follow_progress(
    mut events: broadcast::Receiver<ExecutionEvent>,
    mut print: impl FnMut(String),
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Progress output lagging, skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event {
            ExecutionEvent::RunStarted { modules, .. } => {
                print(format!("▶️  Run started ({} modules)", modules));
            }
            ExecutionEvent::ModuleStarted {
                module_id,
                module_type,
                ..
            } => {
                print(format!("  ⚡ Starting module: {} ({})", module_id, module_type));
            }
            ExecutionEvent::ModuleCompleted {
                module_id, result, ..
            } => {
                if result.is_success() {
                    print(format!("  ✅ Module {} completed", module_id));
                } else {
                    print(format!(
                        "  ❌ Module {} failed: {}",
                        module_id,
                        result.error.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
            ExecutionEvent::ModuleForced { module_id, .. } => {
                print(format!(
                    "  ⚠️  Module {} forced through a dependency cycle",
                    module_id
                ));
            }
            ExecutionEvent::RunCompleted {
                succeeded,
                failed,
                duration_ms,
                ..
            } => {
                print(format!(
                    "✨ Run completed in {}ms: {} succeeded, {} failed",
                    duration_ms, succeeded, failed
                ));
                break;
            }
        }
    }
}

fn validate_campaign(file: &Path, catalog: Option<&Path>) -> Result<()> {
    println!("🔍 Validating campaign: {}", file.display());

    let graph = load_graph(file)?;
    let catalog = Catalog::load(catalog)?;

    let deps = DependencyGraph::from_graph(&graph)?;

    let mut problems = Vec::new();
    for module in &graph.modules {
        if !catalog.schemas.contains(&module.module_type) {
            problems.push(format!(
                "module {} has unknown type {}",
                module.id, module.module_type
            ));
        }
    }
    for connection in &graph.connections {
        if let Err(e) = catalog
            .compatibility
            .check_connection(&graph, &catalog.schemas, connection)
        {
            problems.push(format!(
                "{}.{} -> {}.{}: {}",
                connection.source_module_id,
                connection.source_output_field,
                connection.target_module_id,
                connection.target_input_field,
                e
            ));
        }
    }

    let cycles = deps.cycles();
    for cycle in &cycles {
        println!("⚠️  Dependency cycle: {}", cycle.join(" -> "));
        println!("   These modules will run, but one will be forced through without its inputs.");
    }

    if !problems.is_empty() {
        println!("❌ Campaign has {} problem(s):", problems.len());
        for problem in &problems {
            println!("   • {}", problem);
        }
        bail!("{} is not valid", file.display());
    }

    println!("✅ Campaign is valid:");
    println!("   Name: {}", graph.name);
    println!("   Modules: {}", graph.modules.len());
    println!("   Connections: {}", graph.connections.len());
    if let Some(order) = deps.topological_order() {
        println!("   Execution order: {}", order.join(" -> "));
    }

    Ok(())
}

fn list_modules(catalog: Option<&Path>) -> Result<()> {
    let catalog = Catalog::load(catalog)?;

    println!("📦 Available Module Types:");
    println!();

    for module_type in catalog.schemas.module_types() {
        let Some(schema) = catalog.schemas.get(&module_type) else {
            continue;
        };
        println!("  • {} ({})", module_type, schema.category);
        if !schema.description.is_empty() {
            println!("    {}", schema.description);
        }
        for (name, spec) in &schema.inputs {
            let marker = if spec.required { "*" } else { " " };
            println!("      in  {}{}: {}", name, marker, spec.field_type.name());
        }
        for (name, spec) in &schema.outputs {
            println!("      out  {}: {}", name, spec.field_type.name());
        }
        println!();
    }

    Ok(())
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once('.') {
        Some((module_type, field)) if !module_type.is_empty() && !field.is_empty() => {
            Ok((module_type, field))
        }
        _ => bail!("expected <module_type>.<field>, got {:?}", key),
    }
}

fn check_pair(source: &str, target: &str, catalog: Option<&Path>) -> Result<()> {
    let catalog = Catalog::load(catalog)?;
    let (source_type, source_field) = split_key(source)?;
    let (target_type, target_field) = split_key(target)?;

    if catalog
        .compatibility
        .is_compatible(source_type, source_field, target_type, target_field)
    {
        let key = TransformKey::new(source_type, source_field, target_type, target_field);
        if builtin_transformers().contains(&key) {
            println!("✅ {} can feed {} (reshaped by a built-in transformer)", source, target);
        } else {
            println!("✅ {} can feed {} (passed through as-is)", source, target);
        }
    } else {
        println!("❌ {} cannot feed {}", source, target);
    }

    Ok(())
}

fn create_example_campaign(output: PathBuf) -> Result<()> {
    let mut graph = CampaignGraph::new("Example Product Launch");
    graph.description =
        Some("Audience research feeds copy, copy feeds visuals, both feed distribution".to_string());

    let audience = graph.add_module(
        ModuleInstance::new("audience", AUDIENCE_ANALYZER)
            .with_name("Audience Research")
            .with_config("product_category", "specialty coffee")
            .with_config("campaign_objective", "brand awareness"),
    );
    let copy = graph.add_module(
        ModuleInstance::new("copy", COPY_GENERATOR)
            .with_name("Launch Copy")
            .with_config("content_type", "social_caption")
            .with_config("campaign_brief", "Launch of our single-origin cold brew"),
    );
    let visual = graph.add_module(
        ModuleInstance::new("visual", VISUAL_GENERATOR)
            .with_name("Launch Visuals")
            .with_config("quantity", 2)
            .with_config("image_style", "photorealistic"),
    );
    let distribution = graph.add_module(
        ModuleInstance::new("distribution", DISTRIBUTION_SCHEDULER).with_name("Posting Schedule"),
    );

    graph.connect(&audience, "audience_segments", &copy, "target_audience");
    graph.connect(&audience, "recommended_channels", &copy, "platform");
    graph.connect(&copy, "generated_copies", &visual, "prompt");
    graph.connect(&copy, "generated_copies", &distribution, "generated_copies");
    graph.connect(&visual, "generated_images", &distribution, "generated_images");

    let json = serde_json::to_string_pretty(&graph)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example campaign: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  campaign run --file {} --dry-run", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_progress_keeps_following_after_lag() {
        let (tx, rx) = broadcast::channel(2);
        let execution_id = Uuid::new_v4();

        for i in 0..5 {
            tx.send(ExecutionEvent::ModuleStarted {
                execution_id,
                module_id: format!("m{}", i),
                module_type: "echo".to_string(),
                timestamp: Utc::now(),
            })
            .unwrap();
        }
        tx.send(ExecutionEvent::RunCompleted {
            execution_id,
            succeeded: 5,
            failed: 0,
            forced: 0,
            duration_ms: 12,
            timestamp: Utc::now(),
        })
        .unwrap();

        let mut lines = Vec::new();
        follow_progress(rx, |line| lines.push(line)).await;

        // Only the last two events survive the lag
        assert_eq!(
            lines,
            vec![
                "  ⚡ Starting module: m4 (echo)".to_string(),
                "✨ Run completed in 12ms: 5 succeeded, 0 failed".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_stops_when_channel_closes() {
        let (tx, rx) = broadcast::channel::<ExecutionEvent>(4);
        drop(tx);

        let mut lines = Vec::new();
        follow_progress(rx, |line| lines.push(line)).await;
        assert!(lines.is_empty());
    }
}
