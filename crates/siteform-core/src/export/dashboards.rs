use serde_json::{Value, json};
use tracing::{debug, info};

use crate::client::SourceApi;
use crate::error::{ExportError, Result};
use crate::models::{DashboardSummary, PortalSummary, ProjectSummary, ProjectedResource};
use crate::project::{RewriteRules, RuleContext, project};
use crate::registry::{EntityCategory, LogicalIdRegistry};
use crate::shape::ShapeFilter;
use crate::template::DASHBOARD_RESOURCE_TYPE;

use super::required_str;

/// Walk every portal's projects and export each dashboard found. Widget
/// metrics name native asset and property ids; they become reference
/// markers resolved in pass 2 against the exported assets and model
/// properties.
pub(crate) fn export_dashboards(
    api: &dyn SourceApi,
    registry: &mut LogicalIdRegistry,
) -> Result<Vec<ProjectedResource>> {
    debug!("scanning dashboards");
    let filter = ShapeFilter::for_dashboards();
    let mut resources = Vec::new();

    let portals: Vec<PortalSummary> = summaries(&api.list_portals()?, "portalSummaries")?;
    for portal in &portals {
        let projects: Vec<ProjectSummary> =
            summaries(&api.list_projects(&portal.id)?, "projectSummaries")?;
        for project_summary in &projects {
            let dashboards: Vec<DashboardSummary> = summaries(
                &api.list_dashboards(&project_summary.id)?,
                "dashboardSummaries",
            )?;
            for dashboard in &dashboards {
                info!(dashboard = %dashboard.name, portal = %portal.name, "discovered dashboard");
                let description = api.describe_dashboard(&dashboard.id)?;
                let native_id = required_str(&description, "dashboardId")?;
                let display_name = required_str(&description, "dashboardName")?;
                let name = registry.register(
                    EntityCategory::Dashboard,
                    None,
                    native_id,
                    display_name,
                )?;

                let mut rules = DashboardRules;
                let properties = project(&description, &mut rules, Some(&filter), None)?;
                resources.push(ProjectedResource {
                    name,
                    resource_type: DASHBOARD_RESOURCE_TYPE,
                    properties,
                });
            }
        }
    }
    Ok(resources)
}

fn summaries<T: serde::de::DeserializeOwned>(listing: &Value, field: &str) -> Result<Vec<T>> {
    let raw = listing
        .get(field)
        .cloned()
        .ok_or_else(|| ExportError::malformed(format!("listing without {field}")))?;
    Ok(serde_json::from_value(raw)?)
}

/// Rewrite rules for dashboard description trees. The embedded definition
/// arrives as a JSON string; it is parsed into the tree so its widget
/// metrics project and resolve like any other node.
struct DashboardRules;

impl RewriteRules for DashboardRules {
    fn rewrite(&mut self, field: &str, value: &Value, _ctx: &RuleContext<'_>) -> Result<Value> {
        match (field, value) {
            ("dashboardDefinition", Value::String(raw)) => Ok(serde_json::from_str(raw)?),
            ("metrics", Value::Array(metrics)) => Ok(Value::Array(
                metrics.iter().map(dashboard_metric).collect(),
            )),
            _ => Ok(value.clone()),
        }
    }
}

/// Swap a metric's native asset/property ids for a reference marker under
/// `value`; the rest of the metric is left for the shape filter to trim.
fn dashboard_metric(metric: &Value) -> Value {
    let Value::Object(fields) = metric else {
        return metric.clone();
    };
    let mut out = fields.clone();
    let asset = out.shift_remove("assetId");
    let property = out.shift_remove("propertyId");
    let marker = match (asset, property) {
        (Some(asset), Some(property)) => {
            json!({"AssetLogicalId": asset, "PropertyLogicalId": property})
        }
        (Some(asset), None) => json!({"AssetLogicalId": asset}),
        (None, Some(property)) => json!({"PropertyLogicalId": property}),
        (None, None) => return metric.clone(),
    };
    out.insert("value".to_string(), marker);
    Value::Object(out)
}
