use async_trait::async_trait;
use campaigncore::{CampaignError, ExecutionResult, InvokeError, SchemaRegistry, Value};
use campaignruntime::{Invocation, ModuleInvoker};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// `execution_status` values that count as a successful call
const SUCCESS_STATUSES: [&str; 3] = ["success", "completed", "partial_success"];

/// How much of an error body is kept in the result message
const DETAIL_EXCERPT_CHARS: usize = 300;

#[derive(Debug, Clone)]
pub struct HttpInvokerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Sent as a bearer token when set
    pub api_key: Option<String>,
}

impl HttpInvokerConfig {
    /// Reads `CAMPAIGN_API_BASE_URL`, `CAMPAIGN_API_TIMEOUT_SECS` and
    /// `CAMPAIGN_API_KEY`, falling back to the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timeout_secs = match std::env::var("CAMPAIGN_API_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring unparsable CAMPAIGN_API_TIMEOUT_SECS={:?}", raw);
                defaults.timeout_secs
            }),
            Err(_) => defaults.timeout_secs,
        };

        Self {
            base_url: std::env::var("CAMPAIGN_API_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs,
            api_key: std::env::var("CAMPAIGN_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for HttpInvokerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
            api_key: None,
        }
    }
}

/// Calls each module's remote service: `POST {base_url}/{endpoint}` with
/// the resolved inputs as the JSON body.
pub struct HttpModuleInvoker {
    client: reqwest::Client,
    config: HttpInvokerConfig,
    schemas: Arc<SchemaRegistry>,
}

impl HttpModuleInvoker {
    pub fn new(config: HttpInvokerConfig, schemas: Arc<SchemaRegistry>) -> Result<Self, CampaignError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CampaignError::Execution(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            schemas,
        })
    }

    pub fn config(&self) -> &HttpInvokerConfig {
        &self.config
    }

    fn url_for(&self, module_type: &str) -> String {
        let endpoint = self
            .schemas
            .get(module_type)
            .map(|schema| schema.endpoint_path())
            .unwrap_or(module_type);
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn call(&self, invocation: &Invocation) -> Result<ExecutionResult, InvokeError> {
        let url = self.url_for(&invocation.module_type);
        tracing::info!("POST {} ({})", url, invocation.module_id);

        let mut request = self.client.post(&url).json(&invocation.inputs);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let transport = |e: reqwest::Error| InvokeError::Transport {
            url: url.clone(),
            message: e.to_string(),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        tracing::debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(InvokeError::Status {
                module_type: invocation.module_type.clone(),
                status: status.as_u16(),
                detail: error_detail(&text),
            });
        }

        let body: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| InvokeError::MalformedResponse {
                module_type: invocation.module_type.clone(),
                message: e.to_string(),
            })?;

        parse_response(&invocation.module_type, &body)
            .map(|result| result.with_metadata("http_status", status.as_u16() as i64))
    }
}

#[async_trait]
impl ModuleInvoker for HttpModuleInvoker {
    async fn invoke(&self, invocation: &Invocation) -> ExecutionResult {
        match self.call(invocation).await {
            Ok(result) => result,
            Err(error) => {
                tracing::error!("Module {} failed: {}", invocation.module_id, error);
                ExecutionResult::failure(error.to_string())
            }
        }
    }
}

/// Turn a 2xx response body into a result envelope
fn parse_response(module_type: &str, body: &serde_json::Value) -> Result<ExecutionResult, InvokeError> {
    let outputs = body
        .get("outputs")
        .and_then(|o| o.as_object())
        .ok_or_else(|| InvokeError::MalformedResponse {
            module_type: module_type.to_string(),
            message: "missing `outputs` object".to_string(),
        })?;

    let status = body
        .get("execution_status")
        .and_then(|s| s.as_str())
        .unwrap_or_default();
    if !SUCCESS_STATUSES
        .iter()
        .any(|ok| ok.eq_ignore_ascii_case(status))
    {
        let message = ["error", "message"]
            .iter()
            .find_map(|k| body.get(*k).and_then(|m| m.as_str()))
            .unwrap_or("no error message")
            .to_string();
        return Err(InvokeError::Rejected {
            module_type: module_type.to_string(),
            status: status.to_string(),
            message,
        });
    }

    let outputs: HashMap<String, Value> = outputs
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(v.clone())))
        .collect();
    let mut result = ExecutionResult::success(outputs);

    if let Some(meta) = body.get("generation_metadata").and_then(|m| m.as_object()) {
        for (k, v) in meta {
            result = result.with_metadata(k.clone(), Value::from(v.clone()));
        }
    }

    Ok(result)
}

/// FastAPI-style `detail`, or a bounded excerpt of the raw body
fn error_detail(text: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|body| body.get("detail").cloned())
        .map(|detail| match detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });

    detail.unwrap_or_else(|| text.chars().take(DETAIL_EXCERPT_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{builtin_schemas, COPY_GENERATOR};
    use mockito::{Matcher, Server};

    fn invoker(base_url: String, api_key: Option<&str>) -> HttpModuleInvoker {
        let config = HttpInvokerConfig {
            base_url,
            timeout_secs: 5,
            api_key: api_key.map(str::to_string),
        };
        HttpModuleInvoker::new(config, Arc::new(builtin_schemas())).unwrap()
    }

    fn invocation() -> Invocation {
        let mut inputs = HashMap::new();
        inputs.insert("campaign_brief".to_string(), Value::from("coffee launch"));
        inputs.insert("content_type".to_string(), Value::from("social_caption"));
        Invocation {
            module_id: "copy".to_string(),
            module_type: COPY_GENERATOR.to_string(),
            inputs,
        }
    }

    #[tokio::test]
    async fn test_success_maps_outputs_and_metadata() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/copy_content_generator")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "campaign_brief": "coffee launch"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "outputs": {"generated_copies": [{"copy_id": "c1", "copy_text": "Brewed for you"}]},
                "execution_status": "success",
                "generation_metadata": {"model": "gpt-4o"}
            }"#,
            )
            .create_async()
            .await;

        let result = invoker(server.url(), None).invoke(&invocation()).await;

        mock.assert_async().await;
        assert!(result.is_success());
        let copies = result.output("generated_copies").unwrap();
        assert_eq!(
            copies.as_list().unwrap()[0].get("copy_text"),
            Some(&Value::from("Brewed for you"))
        );
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata["model"], Value::from("gpt-4o"));
        assert_eq!(metadata["http_status"], Value::Integer(200));
        // timing is stamped by the executor, not per invoker
        assert!(!metadata.contains_key("duration_ms"));
    }

    #[tokio::test]
    async fn test_partial_success_is_success() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/copy_content_generator")
            .with_status(200)
            .with_body(r#"{"outputs": {}, "execution_status": "PARTIAL_SUCCESS"}"#)
            .create_async()
            .await;

        let result = invoker(server.url(), None).invoke(&invocation()).await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_server_error_uses_detail() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/copy_content_generator")
            .with_status(500)
            .with_body(r#"{"detail": "model overloaded"}"#)
            .create_async()
            .await;

        let result = invoker(server.url(), None).invoke(&invocation()).await;
        assert!(!result.is_success());
        assert_eq!(
            result.error.as_deref(),
            Some("copy_content_generator returned HTTP 500: model overloaded")
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/copy_content_generator")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let result = invoker(server.url(), None).invoke(&invocation()).await;
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .starts_with("malformed response from copy_content_generator"));
    }

    #[tokio::test]
    async fn test_missing_outputs_is_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/copy_content_generator")
            .with_status(200)
            .with_body(r#"{"execution_status": "success"}"#)
            .create_async()
            .await;

        let result = invoker(server.url(), None).invoke(&invocation()).await;
        assert!(result.error.as_deref().unwrap().contains("missing `outputs` object"));
    }

    #[tokio::test]
    async fn test_failed_status_carries_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/copy_content_generator")
            .with_status(200)
            .with_body(r#"{"outputs": {}, "execution_status": "failed", "error": "quota exceeded"}"#)
            .create_async()
            .await;

        let result = invoker(server.url(), None).invoke(&invocation()).await;
        assert_eq!(
            result.error.as_deref(),
            Some("copy_content_generator reported status 'failed': quota exceeded")
        );
    }

    #[tokio::test]
    async fn test_api_key_sent_as_bearer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/copy_content_generator")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body(r#"{"outputs": {}, "execution_status": "completed"}"#)
            .create_async()
            .await;

        let result = invoker(server.url(), Some("secret")).invoke(&invocation()).await;
        mock.assert_async().await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_error() {
        let result = invoker("http://127.0.0.1:1".to_string(), None)
            .invoke(&invocation())
            .await;
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .starts_with("request to http://127.0.0.1:1/copy_content_generator failed"));
    }

    #[test]
    fn detail_falls_back_to_excerpt() {
        assert_eq!(error_detail(r#"{"detail": [{"loc": ["body"]}]}"#), r#"[{"loc":["body"]}]"#);
        assert_eq!(error_detail("plain text"), "plain text");
        assert_eq!(error_detail(&"x".repeat(1000)).len(), DETAIL_EXCERPT_CHARS);
    }
}
