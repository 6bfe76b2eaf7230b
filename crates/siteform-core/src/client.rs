use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::error::{ExportError, Result};

pub const MODEL_PAGE_SIZE: usize = 250;

/// Discovery surface of the management API as consumed by the exporter.
/// Every call returns the raw response tree; the engine treats the trees as
/// read-only input.
pub trait SourceApi {
    fn list_models(&self, cursor: Option<&str>) -> Result<Value>;
    fn describe_model(&self, model_id: &str) -> Result<Value>;
    fn list_tags(&self, resource_id: &str) -> Result<Value>;
    fn list_top_level_assets(&self) -> Result<Value>;
    fn describe_asset(&self, asset_id: &str) -> Result<Value>;
    fn list_child_assets(&self, asset_id: &str, hierarchy_id: &str) -> Result<Value>;
    fn list_portals(&self) -> Result<Value>;
    fn list_projects(&self, portal_id: &str) -> Result<Value>;
    fn list_dashboards(&self, project_id: &str) -> Result<Value>;
    fn describe_dashboard(&self, dashboard_id: &str) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_ms: u64,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.as_ref()),
            token: None,
            timeout_ms: 10_000,
        }
    }

    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("SITEFORM_API_URL").ok()?;
        let timeout_ms = std::env::var("SITEFORM_API_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10_000);

        Some(Self {
            base_url: normalize_base_url(&base_url),
            token: std::env::var("SITEFORM_API_TOKEN").ok(),
            timeout_ms,
        })
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}

#[derive(Clone)]
pub struct HttpSourceApi {
    config: ApiConfig,
    http: Client,
}

impl std::fmt::Debug for HttpSourceApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSourceApi")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpSourceApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                ExportError::upstream("configure", format!("invalid API token: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { config, http })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn get(&self, operation: &'static str, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{path}", self.config.base_url);
        let response = self.http.get(url).query(query).send()?;
        check_response(operation, response)
    }
}

/// A non-success status or a non-empty `errorEntries` payload fails the
/// call; partial-batch errors are not silently dropped.
fn check_response(operation: &str, response: reqwest::blocking::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ExportError::upstream(
            operation,
            format!("status {status}: {body}"),
        ));
    }

    let value = response.json::<Value>()?;
    if let Some(entries) = value.get("errorEntries").and_then(Value::as_array) {
        if !entries.is_empty() {
            return Err(ExportError::upstream(
                operation,
                serde_json::to_string(entries)?,
            ));
        }
    }
    Ok(value)
}

impl SourceApi for HttpSourceApi {
    fn list_models(&self, cursor: Option<&str>) -> Result<Value> {
        let page_size = MODEL_PAGE_SIZE.to_string();
        let mut query = vec![("maxResults", page_size.as_str())];
        if let Some(cursor) = cursor {
            query.push(("nextToken", cursor));
        }
        self.get("list_models", "/models", &query)
    }

    fn describe_model(&self, model_id: &str) -> Result<Value> {
        self.get("describe_model", &format!("/models/{model_id}"), &[])
    }

    fn list_tags(&self, resource_id: &str) -> Result<Value> {
        self.get("list_tags", "/tags", &[("resourceId", resource_id)])
    }

    fn list_top_level_assets(&self) -> Result<Value> {
        self.get("list_assets", "/assets", &[("filter", "TOP_LEVEL")])
    }

    fn describe_asset(&self, asset_id: &str) -> Result<Value> {
        self.get("describe_asset", &format!("/assets/{asset_id}"), &[])
    }

    fn list_child_assets(&self, asset_id: &str, hierarchy_id: &str) -> Result<Value> {
        self.get(
            "list_child_assets",
            &format!("/assets/{asset_id}/hierarchies/{hierarchy_id}/children"),
            &[],
        )
    }

    fn list_portals(&self) -> Result<Value> {
        self.get("list_portals", "/portals", &[])
    }

    fn list_projects(&self, portal_id: &str) -> Result<Value> {
        self.get(
            "list_projects",
            &format!("/portals/{portal_id}/projects"),
            &[],
        )
    }

    fn list_dashboards(&self, project_id: &str) -> Result<Value> {
        self.get(
            "list_dashboards",
            &format!("/projects/{project_id}/dashboards"),
            &[],
        )
    }

    fn describe_dashboard(&self, dashboard_id: &str) -> Result<Value> {
        self.get(
            "describe_dashboard",
            &format!("/dashboards/{dashboard_id}"),
            &[],
        )
    }
}
