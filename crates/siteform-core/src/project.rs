use serde_json::{Map, Value};

use crate::error::Result;
use crate::shape::ShapeFilter;

/// Traversal context handed to rewrite rules: the enclosing object (if any)
/// and the caller-supplied scope, typically the native id of the entity
/// currently being projected.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub parent: Option<&'a Value>,
    pub scope: Option<&'a str>,
}

/// Per-field rewrite hook invoked before recursing into the replacement.
/// Rules carry all entity-specific behavior; the projector itself knows
/// nothing about particular resource types.
pub trait RewriteRules {
    fn rewrite(&mut self, field: &str, value: &Value, ctx: &RuleContext<'_>) -> Result<Value>;
}

/// Identity rules: every field passes through unchanged.
#[derive(Debug, Default)]
pub struct NoRules;

impl RewriteRules for NoRules {
    fn rewrite(&mut self, _field: &str, value: &Value, _ctx: &RuleContext<'_>) -> Result<Value> {
        Ok(value.clone())
    }
}

/// Canonical field naming: first character upper-cased, remainder unchanged.
#[must_use]
pub fn canonical_field(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Recursive schema-driven projection of a source tree.
///
/// Object fields are canonicalized and tested against the allow-set; a
/// rejected field is dropped without recursing into its value. Admitted
/// fields are rewritten by `rules` (receiving the original field name and
/// the enclosing object as parent), then the replacement is projected with
/// the same filter and scope. Array elements are projected independently;
/// scalars pass through. Passing `None` for the filter admits every field,
/// which is how the second resolution pass reuses this traversal.
pub fn project(
    node: &Value,
    rules: &mut dyn RewriteRules,
    filter: Option<&ShapeFilter>,
    scope: Option<&str>,
) -> Result<Value> {
    match node {
        Value::Object(fields) => {
            let mut out = Map::new();
            for (field, value) in fields {
                let canonical = canonical_field(field);
                if let Some(filter) = filter {
                    if !filter.admits(&canonical) {
                        continue;
                    }
                }
                let ctx = RuleContext {
                    parent: Some(node),
                    scope,
                };
                let replacement = rules.rewrite(field, value, &ctx)?;
                out.insert(canonical, project(&replacement, rules, filter, scope)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(project(item, rules, filter, scope)?);
            }
            Ok(Value::Array(out))
        }
        scalar => Ok(scalar.clone()),
    }
}
