use serde_json::{Map, Value};

use crate::error::{ExportError, Result};
use crate::project::{RewriteRules, RuleContext, project};
use crate::registry::{EntityCategory, LogicalIdRegistry};

pub const ASSET_LOGICAL_ID: &str = "AssetLogicalId";
pub const HIERARCHY_LOGICAL_ID: &str = "HierarchyLogicalId";
pub const PROPERTY_LOGICAL_ID: &str = "PropertyLogicalId";

/// Second pass over a projected document: every reference-marker-shaped
/// value has its native-id payload replaced with the registered synthetic
/// id. Resolution is eager and total; the first marker that fails a lookup
/// aborts with `UnresolvedReference`.
pub fn resolve(document: &Value, registry: &LogicalIdRegistry) -> Result<Value> {
    let mut rules = ResolveRules { registry };
    project(document, &mut rules, None, None)
}

struct ResolveRules<'a> {
    registry: &'a LogicalIdRegistry,
}

impl RewriteRules for ResolveRules<'_> {
    fn rewrite(&mut self, _field: &str, value: &Value, _ctx: &RuleContext<'_>) -> Result<Value> {
        let Value::Object(fields) = value else {
            return Ok(value.clone());
        };
        if !is_marker(fields) {
            return Ok(value.clone());
        }

        let mut out = Map::new();
        for (field, native) in fields {
            let native = native
                .as_str()
                .ok_or_else(|| ExportError::malformed(format!("non-string reference in {field}")))?;
            let category = marker_category(field)
                .ok_or_else(|| ExportError::malformed(format!("unknown reference field {field}")))?;
            let synthetic = self.registry.lookup(category, None, native)?;
            out.insert(field.clone(), Value::String(synthetic));
        }
        Ok(Value::Object(out))
    }
}

/// A marker is a non-empty object whose every field is one of the logical-id
/// reference fields carrying a string native id.
fn is_marker(fields: &Map<String, Value>) -> bool {
    !fields.is_empty()
        && fields
            .iter()
            .all(|(field, value)| marker_category(field).is_some() && value.is_string())
}

fn marker_category(field: &str) -> Option<EntityCategory> {
    match field {
        ASSET_LOGICAL_ID => Some(EntityCategory::Asset),
        HIERARCHY_LOGICAL_ID => Some(EntityCategory::ModelHierarchy),
        PROPERTY_LOGICAL_ID => Some(EntityCategory::ModelProperty),
        _ => None,
    }
}
