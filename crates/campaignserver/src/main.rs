use actix_cors::Cors;
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult};
use actix_ws::Message;
use campaigncore::{CampaignError, CampaignGraph, CampaignId, CompatibilityMatrix};
use campaignmodules::{
    builtin_transformers, Catalog, DryRunInvoker, HttpInvokerConfig, HttpModuleInvoker,
};
use campaignruntime::{
    CampaignRuntime, DependencyGraph, ModuleInvoker, RuntimeConfig, TransformKey,
    TransformerRegistry,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Application state shared across handlers
struct AppState {
    runtime: Arc<CampaignRuntime>,
    compatibility: CompatibilityMatrix,
    transformers: Arc<TransformerRegistry>,
    campaigns: Arc<RwLock<HashMap<CampaignId, CampaignGraph>>>,
}

impl AppState {
    fn new(catalog: Catalog, invoker: Arc<dyn ModuleInvoker>, config: RuntimeConfig) -> Self {
        let transformers = Arc::new(builtin_transformers());
        let runtime = CampaignRuntime::new(
            Arc::new(catalog.schemas),
            Arc::clone(&transformers),
            invoker,
            config,
        );
        Self {
            runtime: Arc::new(runtime),
            compatibility: catalog.compatibility,
            transformers,
            campaigns: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// Request body for a connection compatibility check
#[derive(Debug, Deserialize)]
struct CheckRequest {
    source_type: String,
    source_field: String,
    target_type: String,
    target_field: String,
}

#[derive(Debug, Serialize)]
struct CheckResponse {
    compatible: bool,
    /// Whether the value is reshaped on the way, rather than passed as-is
    transformed: bool,
}

/// Response for campaign creation
#[derive(Debug, Serialize)]
struct CampaignResponse {
    id: Uuid,
    message: String,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn run_error_response(e: CampaignError) -> HttpResponse {
    match e {
        CampaignError::Graph(_) => HttpResponse::BadRequest().json(ErrorResponse {
            error: e.to_string(),
        }),
        CampaignError::Cancelled { .. } => HttpResponse::Conflict().json(ErrorResponse {
            error: e.to_string(),
        }),
        _ => HttpResponse::InternalServerError().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "campaignflow"
    }))
}

/// List module types with their schemas
#[get("/api/modules")]
async fn list_modules(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let schemas = data.runtime.schemas();
    let modules: Vec<_> = schemas
        .module_types()
        .iter()
        .filter_map(|module_type| schemas.get(module_type))
        .collect();

    Ok(HttpResponse::Ok().json(modules))
}

/// Schema of one module type
#[get("/api/modules/{module_type}")]
async fn get_module(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let module_type = path.into_inner();

    match data.runtime.schemas().get(&module_type) {
        Some(schema) => Ok(HttpResponse::Ok().json(schema)),
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Module type {} not found", module_type),
        })),
    }
}

/// Whether an output field may feed an input field
#[post("/api/connections/check")]
async fn check_connection(
    data: web::Data<AppState>,
    req: web::Json<CheckRequest>,
) -> ActixResult<impl Responder> {
    let req = req.into_inner();
    let compatible = data.compatibility.is_compatible(
        &req.source_type,
        &req.source_field,
        &req.target_type,
        &req.target_field,
    );
    let key = TransformKey::new(req.source_type, req.source_field, req.target_type, req.target_field);

    Ok(HttpResponse::Ok().json(CheckResponse {
        compatible,
        transformed: compatible && data.transformers.contains(&key),
    }))
}

/// List stored campaigns
#[get("/api/campaigns")]
async fn list_campaigns(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let campaigns = data.campaigns.read().await;
    let campaign_list: Vec<_> = campaigns
        .values()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "name": c.name,
                "description": c.description,
                "modules": c.modules.len(),
                "connections": c.connections.len(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(campaign_list))
}

/// Store a campaign graph
#[post("/api/campaigns")]
async fn create_campaign(
    data: web::Data<AppState>,
    campaign: web::Json<CampaignGraph>,
) -> ActixResult<impl Responder> {
    let campaign = campaign.into_inner();
    let campaign_id = campaign.id;

    if let Err(e) = DependencyGraph::from_graph(&campaign) {
        warn!("Rejected campaign {}: {}", campaign.name, e);
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: e.to_string(),
        }));
    }

    info!("Storing campaign: {} ({})", campaign.name, campaign_id);
    data.campaigns.write().await.insert(campaign_id, campaign);

    Ok(HttpResponse::Created().json(CampaignResponse {
        id: campaign_id,
        message: "Campaign stored successfully".to_string(),
    }))
}

/// Get a stored campaign
#[get("/api/campaigns/{id}")]
async fn get_campaign(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let campaign_id = path.into_inner();
    let campaigns = data.campaigns.read().await;

    match campaigns.get(&campaign_id) {
        Some(campaign) => Ok(HttpResponse::Ok().json(campaign)),
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Campaign {} not found", campaign_id),
        })),
    }
}

/// Delete a stored campaign
#[actix_web::delete("/api/campaigns/{id}")]
async fn delete_campaign(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let campaign_id = path.into_inner();
    let mut campaigns = data.campaigns.write().await;

    match campaigns.remove(&campaign_id) {
        Some(_) => {
            info!("Deleted campaign: {}", campaign_id);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "Campaign deleted successfully"
            })))
        }
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Campaign {} not found", campaign_id),
        })),
    }
}

/// Run a stored campaign
#[post("/api/campaigns/{id}/execute")]
async fn execute_campaign(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let campaign_id = path.into_inner();

    // Clone so the store is not locked for the whole run
    let campaign = data.campaigns.read().await.get(&campaign_id).cloned();
    let Some(campaign) = campaign else {
        return Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Campaign {} not found", campaign_id),
        }));
    };

    info!("Executing campaign: {}", campaign_id);
    Ok(run(&data, &campaign).await)
}

/// Run a graph supplied in the request body without storing it
#[post("/api/runs")]
async fn execute_inline(
    data: web::Data<AppState>,
    campaign: web::Json<CampaignGraph>,
) -> ActixResult<impl Responder> {
    let campaign = campaign.into_inner();
    info!("Executing inline campaign: {}", campaign.name);
    Ok(run(&data, &campaign).await)
}

async fn run(data: &AppState, campaign: &CampaignGraph) -> HttpResponse {
    match data.runtime.execute(campaign).await {
        Ok(report) => {
            info!(
                "Campaign {} finished: {} succeeded, {} failed",
                campaign.id,
                report.succeeded(),
                report.failed()
            );
            HttpResponse::Ok().json(report)
        }
        Err(e) => {
            error!("Campaign {} could not run: {}", campaign.id, e);
            run_error_response(e)
        }
    }
}

/// WebSocket endpoint for real-time events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.runtime.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("WebSocket client lagging, skipped {} events", skipped);
                        }
                        Err(_) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(list_modules)
        .service(get_module)
        .service(check_connection)
        .service(list_campaigns)
        .service(create_campaign)
        .service(get_campaign)
        .service(delete_campaign)
        .service(execute_campaign)
        .service(execute_inline)
        .service(websocket_events);
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting Campaign Flow Server");

    let catalog = Catalog::load(std::env::var("CAMPAIGN_CATALOG").ok().map(PathBuf::from).as_deref())?;
    let schemas = Arc::new(catalog.schemas.clone());

    let dry_run = std::env::var("CAMPAIGN_DRY_RUN")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let invoker: Arc<dyn ModuleInvoker> = if dry_run {
        info!("🧪 Dry run mode: module services will not be called");
        Arc::new(DryRunInvoker::new(schemas))
    } else {
        let config = HttpInvokerConfig::from_env();
        info!("🌐 Module services at {}", config.base_url);
        Arc::new(HttpModuleInvoker::new(config, schemas)?)
    };

    let app_state = web::Data::new(AppState::new(catalog, invoker, RuntimeConfig::from_env()));
    info!(
        "✅ Runtime initialized with {} module types",
        app_state.runtime.schemas().len()
    );

    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .configure(configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use campaigncore::{ModuleInstance, RunReport};
    use campaignmodules::schemas::{COPY_GENERATOR, VISUAL_GENERATOR};

    fn state() -> web::Data<AppState> {
        let catalog = Catalog::builtin();
        let invoker = Arc::new(DryRunInvoker::new(Arc::new(catalog.schemas.clone())));
        web::Data::new(AppState::new(catalog, invoker, RuntimeConfig::default()))
    }

    fn graph() -> CampaignGraph {
        let mut graph = CampaignGraph::new("api test");
        graph.add_module(ModuleInstance::new("copy", COPY_GENERATOR).with_config("campaign_brief", "tea"));
        graph.add_module(ModuleInstance::new("visual", VISUAL_GENERATOR));
        graph.connect("copy", "generated_copies", "visual", "prompt");
        graph
    }

    #[actix_web::test]
    async fn test_connection_check() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/connections/check")
            .set_json(serde_json::json!({
                "source_type": COPY_GENERATOR,
                "source_field": "generated_copies",
                "target_type": VISUAL_GENERATOR,
                "target_field": "prompt"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["compatible"], true);
        assert_eq!(body["transformed"], true);
    }

    #[actix_web::test]
    async fn test_inline_run_returns_report() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/runs")
            .set_json(graph())
            .to_request();
        let report: RunReport = test::call_and_read_body_json(&app, req).await;

        assert_eq!(report.succeeded(), 2);
    }

    #[actix_web::test]
    async fn test_broken_graph_is_bad_request() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let mut broken = graph();
        broken.connect("copy", "generated_copies", "ghost", "prompt");
        let req = test::TestRequest::post()
            .uri("/api/runs")
            .set_json(broken)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_store_then_execute() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let campaign = graph();
        let id = campaign.id;

        let req = test::TestRequest::post()
            .uri("/api/campaigns")
            .set_json(&campaign)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri(&format!("/api/campaigns/{}/execute", id))
            .to_request();
        let report: RunReport = test::call_and_read_body_json(&app, req).await;
        assert_eq!(report.results.len(), 2);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/campaigns/{}", id))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::get()
            .uri(&format!("/api/campaigns/{}", id))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            actix_web::http::StatusCode::NOT_FOUND
        );
    }
}
