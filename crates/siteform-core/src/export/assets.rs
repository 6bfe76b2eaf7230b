use std::collections::HashSet;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::SourceApi;
use crate::error::{ExportError, Result};
use crate::models::{AssetSummary, ProjectedResource};
use crate::project::{RewriteRules, RuleContext, project};
use crate::registry::{EntityCategory, LogicalIdRegistry};
use crate::shape::ShapeFilter;
use crate::template::ASSET_RESOURCE_TYPE;

use super::{merge_tags, required_str, tag_list};

pub(crate) fn top_level_asset_ids(api: &dyn SourceApi) -> Result<Vec<String>> {
    debug!("listing top-level assets");
    let response = api.list_top_level_assets()?;
    let summaries = asset_summaries(&response)?;
    Ok(summaries.into_iter().map(|summary| summary.id).collect())
}

/// Discover assets recursively from `ids` and project each into a template
/// resource. Discovery registers every reachable asset before projection
/// starts, so child references resolve inline.
pub(crate) fn export_assets(
    api: &dyn SourceApi,
    registry: &mut LogicalIdRegistry,
    ids: &[String],
) -> Result<Vec<ProjectedResource>> {
    debug!("scanning assets");
    let mut discovery = AssetDiscovery {
        api,
        registry,
        visited: HashSet::new(),
        descriptions: Vec::new(),
    };
    discovery.discover(ids)?;
    let descriptions = discovery.descriptions;

    let filter = ShapeFilter::for_assets();
    let mut resources = Vec::with_capacity(descriptions.len());
    for description in &descriptions {
        let asset_id = required_str(description, "assetId")?;
        let mut rules = AssetRules {
            registry: &*registry,
        };
        let properties = project(description, &mut rules, Some(&filter), None)?;
        let name = registry.lookup(EntityCategory::Asset, None, asset_id)?;
        resources.push(ProjectedResource {
            name,
            resource_type: ASSET_RESOURCE_TYPE,
            properties,
        });
    }
    Ok(resources)
}

struct AssetDiscovery<'a> {
    api: &'a dyn SourceApi,
    registry: &'a mut LogicalIdRegistry,
    visited: HashSet<String>,
    descriptions: Vec<Value>,
}

impl AssetDiscovery<'_> {
    /// Depth-first walk over the asset tree. An asset that cannot be
    /// described is skipped with a warning and discovery continues with its
    /// siblings; a native id seen twice means the upstream hierarchy has a
    /// cycle (or the input list repeats an id) and fails the run.
    fn discover(&mut self, ids: &[String]) -> Result<()> {
        for asset_id in ids {
            if self.visited.contains(asset_id) {
                return Err(ExportError::CyclicHierarchy {
                    native_id: asset_id.clone(),
                });
            }

            let mut description = match self.api.describe_asset(asset_id) {
                Ok(description) => description,
                Err(err @ (ExportError::UpstreamCall { .. } | ExportError::Http(_))) => {
                    warn!(asset = %asset_id, error = %err, "failed to describe asset, skipping");
                    continue;
                }
                Err(err) => return Err(err),
            };
            self.visited.insert(asset_id.clone());

            let native_id = required_str(&description, "assetId")?.to_string();
            let name = required_str(&description, "assetName")?.to_string();
            info!(asset = %name, "discovered asset");
            self.visited.insert(native_id.clone());
            self.registry
                .register(EntityCategory::Asset, None, &native_id, &name)?;
            merge_tags(self.api, &native_id, &mut description)?;

            let child_ids = self.embed_hierarchy_children(&native_id, &mut description)?;
            self.descriptions.push(description);
            self.discover(&child_ids)?;
        }
        Ok(())
    }

    /// List each hierarchy's children, embed the sorted summaries into the
    /// description (the projection rules consume them), and return the
    /// child ids for recursion.
    fn embed_hierarchy_children(
        &mut self,
        asset_id: &str,
        description: &mut Value,
    ) -> Result<Vec<String>> {
        let mut child_ids = Vec::new();
        let Some(hierarchies) = description
            .get_mut("assetHierarchies")
            .and_then(Value::as_array_mut)
        else {
            return Ok(child_ids);
        };

        for hierarchy in hierarchies {
            let hierarchy_id = required_str(hierarchy, "id")?.to_string();
            let listing = self.api.list_child_assets(asset_id, &hierarchy_id)?;
            let mut children = asset_summaries(&listing)?;
            children.sort_by(|a, b| a.name.cmp(&b.name));
            child_ids.extend(children.iter().map(|child| child.id.clone()));

            let Some(fields) = hierarchy.as_object_mut() else {
                return Err(ExportError::malformed("asset hierarchy is not an object"));
            };
            fields.insert("children".to_string(), serde_json::to_value(&children)?);
        }
        Ok(child_ids)
    }
}

fn asset_summaries(listing: &Value) -> Result<Vec<AssetSummary>> {
    let raw = listing
        .get("assetSummaries")
        .cloned()
        .ok_or_else(|| ExportError::malformed("asset listing without assetSummaries"))?;
    Ok(serde_json::from_value(raw)?)
}

/// Rewrite rules for asset description trees. Purely lookups: everything an
/// asset references was registered during model export or asset discovery.
struct AssetRules<'a> {
    registry: &'a LogicalIdRegistry,
}

impl RewriteRules for AssetRules<'_> {
    fn rewrite(&mut self, field: &str, value: &Value, ctx: &RuleContext<'_>) -> Result<Value> {
        match (field, value) {
            ("modelId", Value::String(model_id)) => {
                let model = self.registry.lookup(EntityCategory::Model, None, model_id)?;
                Ok(json!({"Ref": model}))
            }
            ("tags", Value::Object(tags)) => Ok(tag_list(tags)),
            ("assetProperties", Value::Array(properties)) => self.asset_properties(properties, ctx),
            ("assetHierarchies", Value::Array(hierarchies)) => self.asset_hierarchies(hierarchies),
            _ => Ok(value.clone()),
        }
    }
}

impl AssetRules<'_> {
    /// Asset property entries collapse to their model property's logical id
    /// plus notification state and alias where present. The owning model
    /// comes from the enclosing asset description.
    fn asset_properties(&self, properties: &[Value], ctx: &RuleContext<'_>) -> Result<Value> {
        let model_id = ctx
            .parent
            .ok_or_else(|| ExportError::malformed("asset properties without an enclosing asset"))
            .and_then(|parent| required_str(parent, "modelId"))?;

        let mut sorted: Vec<&Value> = properties.iter().collect();
        sorted.sort_by_key(|property| {
            property
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        });

        let mut out = Vec::with_capacity(sorted.len());
        for property in sorted {
            let id = required_str(property, "id")?;
            let logical_id =
                self.registry
                    .lookup(EntityCategory::ModelProperty, Some(model_id), id)?;

            let mut doc = serde_json::Map::new();
            doc.insert("LogicalId".to_string(), Value::String(logical_id));
            let state = property
                .pointer("/notification/state")
                .and_then(Value::as_str);
            if state == Some("ENABLED") {
                doc.insert(
                    "NotificationState".to_string(),
                    Value::String("ENABLED".to_string()),
                );
            }
            if let Some(alias) = property.get("alias") {
                doc.insert("Alias".to_string(), alias.clone());
            }
            out.push(Value::Object(doc));
        }
        Ok(Value::Array(out))
    }

    /// Flatten each hierarchy into one `{ChildAssetId, LogicalId}` pair per
    /// child, referencing the child asset and the model hierarchy's logical
    /// id. Children were embedded (sorted by name) during discovery. A child
    /// that never registered was skipped as unreachable during discovery;
    /// its dangling reference is dropped rather than failing the asset.
    fn asset_hierarchies(&self, hierarchies: &[Value]) -> Result<Value> {
        let mut out = Vec::new();
        for hierarchy in hierarchies {
            let hierarchy_id = required_str(hierarchy, "id")?;
            let logical_id =
                self.registry
                    .lookup(EntityCategory::ModelHierarchy, None, hierarchy_id)?;

            let Some(children) = hierarchy.get("children").and_then(Value::as_array) else {
                continue;
            };
            for child in children {
                let child_id = required_str(child, "id")?;
                let child_ref = match self.registry.lookup(EntityCategory::Asset, None, child_id) {
                    Ok(child_ref) => child_ref,
                    Err(ExportError::UnresolvedReference { .. }) => {
                        warn!(child = %child_id, "dropping reference to undiscovered child asset");
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                out.push(json!({
                    "ChildAssetId": {"Ref": child_ref},
                    "LogicalId": logical_id,
                }));
            }
        }
        Ok(Value::Array(out))
    }
}
