use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::client::SourceApi;
use crate::error::{ExportError, Result};
use crate::models::{ModelSummary, ProjectedResource};
use crate::project::{RewriteRules, RuleContext, project};
use crate::registry::{EntityCategory, LogicalIdRegistry};
use crate::shape::ShapeFilter;
use crate::template::MODEL_RESOURCE_TYPE;

use super::{merge_tags, required_str, tag_list};

/// Project every asset model into a template resource. All models register
/// before any is projected: hierarchies may point at models that appear
/// later in the listing.
pub(crate) fn export_models(
    api: &dyn SourceApi,
    registry: &mut LogicalIdRegistry,
) -> Result<Vec<ProjectedResource>> {
    debug!("scanning models");
    let summaries = list_all_models(api)?;
    for summary in &summaries {
        registry.register(EntityCategory::Model, None, &summary.id, &summary.name)?;
    }

    let filter = ShapeFilter::for_models();
    let mut resources = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        info!(model = %summary.name, "discovered model");
        let mut description = api.describe_model(&summary.id)?;
        merge_tags(api, &summary.id, &mut description)?;

        let mut rules = ModelRules {
            registry: &mut *registry,
        };
        let properties = project(&description, &mut rules, Some(&filter), Some(&summary.id))?;
        let name = registry.lookup(EntityCategory::Model, None, &summary.id)?;
        resources.push(ProjectedResource {
            name,
            resource_type: MODEL_RESOURCE_TYPE,
            properties,
        });
    }
    Ok(resources)
}

fn list_all_models(api: &dyn SourceApi) -> Result<Vec<ModelSummary>> {
    let mut summaries = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = api.list_models(cursor.as_deref())?;
        let raw = page
            .get("modelSummaries")
            .cloned()
            .ok_or_else(|| ExportError::malformed("model listing without modelSummaries"))?;
        summaries.extend(serde_json::from_value::<Vec<ModelSummary>>(raw)?);
        match page.get("nextToken").and_then(Value::as_str) {
            Some(token) => cursor = Some(token.to_string()),
            None => break,
        }
    }
    Ok(summaries)
}

/// Rewrite rules for model description trees. Registers properties and
/// hierarchies as they are encountered; references to sibling properties
/// become markers for the resolution pass.
pub(crate) struct ModelRules<'a> {
    pub(crate) registry: &'a mut LogicalIdRegistry,
}

impl RewriteRules for ModelRules<'_> {
    fn rewrite(&mut self, field: &str, value: &Value, ctx: &RuleContext<'_>) -> Result<Value> {
        match (field, value) {
            ("type", Value::Object(variant)) => Ok(property_type(variant)),
            ("value", Value::Object(fields)) => Ok(variable_value(fields)),
            ("tags", Value::Object(tags)) => Ok(tag_list(tags)),
            ("modelProperties", Value::Array(properties)) => self.model_properties(properties, ctx),
            ("modelHierarchies", Value::Array(hierarchies)) => {
                self.model_hierarchies(hierarchies, ctx)
            }
            _ => Ok(value.clone()),
        }
    }
}

impl ModelRules<'_> {
    fn model_properties(&mut self, properties: &[Value], ctx: &RuleContext<'_>) -> Result<Value> {
        let scope = ctx
            .scope
            .ok_or_else(|| ExportError::malformed("model properties outside a model scope"))?;

        let mut out = Vec::with_capacity(properties.len());
        for property in sorted_by_name(properties) {
            let Value::Object(fields) = property else {
                return Err(ExportError::malformed("model property is not an object"));
            };
            let id = required_str(property, "id")?;
            let name = required_str(property, "name")?;
            let logical_id =
                self.registry
                    .register(EntityCategory::ModelProperty, Some(scope), id, name)?;

            let mut fields = fields.clone();
            fields.insert("LogicalId".to_string(), Value::String(logical_id));
            out.push(Value::Object(fields));
        }
        Ok(Value::Array(out))
    }

    fn model_hierarchies(&mut self, hierarchies: &[Value], ctx: &RuleContext<'_>) -> Result<Value> {
        let scope = ctx
            .scope
            .ok_or_else(|| ExportError::malformed("model hierarchies outside a model scope"))?;

        let mut out = Vec::with_capacity(hierarchies.len());
        for hierarchy in sorted_by_name(hierarchies) {
            let Value::Object(fields) = hierarchy else {
                return Err(ExportError::malformed("model hierarchy is not an object"));
            };
            let id = required_str(hierarchy, "id")?;
            let name = required_str(hierarchy, "name")?;
            let child_id = required_str(hierarchy, "childModelId")?;

            // Every model registered before projection started, so child
            // references resolve inline.
            let child = self.registry.lookup(EntityCategory::Model, None, child_id)?;
            let logical_id =
                self.registry
                    .register(EntityCategory::ModelHierarchy, Some(scope), id, name)?;

            let mut fields = fields.clone();
            fields.insert("childModelId".to_string(), json!({"Ref": child}));
            fields.insert("LogicalId".to_string(), Value::String(logical_id));
            out.push(Value::Object(fields));
        }
        Ok(Value::Array(out))
    }
}

/// Map a property `type` variant object onto the template's tagged shape.
fn property_type(variant: &Map<String, Value>) -> Value {
    if variant.contains_key("measurement") {
        return json!({"TypeName": "Measurement"});
    }
    if let Some(transform) = variant.get("transform") {
        return json!({"TypeName": "Transform", "Transform": transform});
    }
    if let Some(attribute) = variant.get("attribute") {
        return json!({"TypeName": "Attribute", "Attribute": attribute});
    }
    if let Some(metric) = variant.get("metric") {
        return json!({"TypeName": "Metric", "Metric": metric});
    }
    Value::Object(variant.clone())
}

/// Expression-variable values hold native property (and optionally
/// hierarchy) ids; they become reference markers resolved in pass 2.
fn variable_value(fields: &Map<String, Value>) -> Value {
    match (fields.get("propertyId"), fields.get("hierarchyId")) {
        (Some(property), Some(hierarchy)) => {
            json!({"PropertyLogicalId": property, "HierarchyLogicalId": hierarchy})
        }
        (Some(property), None) => json!({"PropertyLogicalId": property}),
        _ => Value::Object(fields.clone()),
    }
}

fn sorted_by_name(items: &[Value]) -> Vec<&Value> {
    let mut sorted: Vec<&Value> = items.iter().collect();
    sorted.sort_by_key(|item| {
        item.get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    });
    sorted
}
