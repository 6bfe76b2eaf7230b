use serde_json::{Map, Value, json};
use tracing::info;

use crate::client::SourceApi;
use crate::error::{ExportError, Result};
use crate::registry::LogicalIdRegistry;
use crate::resolve::resolve;
use crate::template::TemplateDocument;

mod assets;
mod dashboards;
mod models;

#[cfg(test)]
mod tests;

/// Export selection. `assets: Some(vec![])` means "every top-level asset";
/// `None` exports models only. Dashboards reference assets, so exporting
/// them without assets fails resolution.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub assets: Option<Vec<String>>,
    pub dashboards: bool,
}

/// Drives one export run: projection pass over every selected entity, then
/// the resolution pass over the merged resource set. The registry lives
/// exactly as long as the run.
pub struct Exporter<'a> {
    api: &'a dyn SourceApi,
    registry: LogicalIdRegistry,
}

impl<'a> Exporter<'a> {
    #[must_use]
    pub fn new(api: &'a dyn SourceApi) -> Self {
        Self {
            api,
            registry: LogicalIdRegistry::new(),
        }
    }

    pub fn export(mut self, options: &ExportOptions) -> Result<TemplateDocument> {
        let mut projected = models::export_models(self.api, &mut self.registry)?;

        if let Some(ids) = &options.assets {
            let ids = if ids.is_empty() {
                assets::top_level_asset_ids(self.api)?
            } else {
                ids.clone()
            };
            projected.extend(assets::export_assets(self.api, &mut self.registry, &ids)?);
        }

        if options.dashboards {
            projected.extend(dashboards::export_dashboards(
                self.api,
                &mut self.registry,
            )?);
        }

        // Resolution must not start until every entity has registered; the
        // projection pass above is complete for all categories here.
        let mut template = TemplateDocument::new("SiteForm export");
        for resource in projected {
            let properties = resolve(&resource.properties, &self.registry)?;
            template.insert(&resource.name, resource.resource_type, properties)?;
        }

        info!(resources = template.len(), "export complete");
        Ok(template)
    }
}

pub(crate) fn required_str<'v>(node: &'v Value, field: &str) -> Result<&'v str> {
    node.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ExportError::malformed(format!("missing field {field}")))
}

/// Merge the entity's tags into its description tree under `tags`, the way
/// the discovery API reports them: a flat name-to-value mapping. Empty tag
/// sets are not merged.
pub(crate) fn merge_tags(api: &dyn SourceApi, resource_id: &str, tree: &mut Value) -> Result<()> {
    let response = api.list_tags(resource_id)?;
    let Some(tags) = response.get("tags").and_then(Value::as_object) else {
        return Ok(());
    };
    if tags.is_empty() {
        return Ok(());
    }
    if let Some(fields) = tree.as_object_mut() {
        fields.insert("tags".to_string(), Value::Object(tags.clone()));
    }
    Ok(())
}

/// Tag mapping to a `[{Key, Value}]` list, sorted by key so the output does
/// not depend on response field order.
pub(crate) fn tag_list(tags: &Map<String, Value>) -> Value {
    let mut pairs: Vec<(&String, &Value)> = tags.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    Value::Array(
        pairs
            .into_iter()
            .map(|(key, value)| json!({"Key": key, "Value": value}))
            .collect(),
    )
}
