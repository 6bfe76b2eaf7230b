use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use uuid::Uuid;

use crate::error::{ExportError, Result};

/// Classes of referenceable entities. Each category owns an identifier
/// namespace; `ModelProperty` and `ModelHierarchy` are additionally scoped
/// per owning model, so two models may carry a property of the same name
/// without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    Model,
    ModelProperty,
    ModelHierarchy,
    Asset,
    Dashboard,
}

impl EntityCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::ModelProperty => "model-property",
            Self::ModelHierarchy => "model-hierarchy",
            Self::Asset => "asset",
            Self::Dashboard => "dashboard",
        }
    }

    /// Many properties across models share a display name, so this
    /// category's naming policy appends a random suffix.
    const fn randomized(self) -> bool {
        matches!(self, Self::ModelProperty)
    }

    const fn name_suffix(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Dashboard => "dashboard",
            Self::ModelProperty | Self::ModelHierarchy | Self::Asset => "",
        }
    }
}

impl Display for EntityCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type NamespaceKey = (EntityCategory, Option<String>, String);

/// Run-scoped mapping from native identifiers to synthetic ones.
///
/// Created at export start, written during the projection pass, read-only
/// during resolution, discarded with the run. Besides the namespaced
/// entries, an unscoped index by native id is kept for the resolution pass:
/// native ids are globally unique in the source system, while scoping only
/// partitions the display-name space.
#[derive(Debug, Default)]
pub struct LogicalIdRegistry {
    entries: HashMap<NamespaceKey, String>,
    by_native: HashMap<(EntityCategory, String), String>,
    claimed: HashMap<NamespaceKey, String>,
}

impl LogicalIdRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a synthetic id to `native_id` within the category namespace.
    ///
    /// Registering a native id that is already present returns its existing
    /// synthetic id. Two distinct native ids sanitizing to the same
    /// synthetic name in a non-randomized namespace fail with
    /// `NamingCollision`.
    pub fn register(
        &mut self,
        category: EntityCategory,
        scope: Option<&str>,
        native_id: &str,
        display_name: &str,
    ) -> Result<String> {
        let key = (category, scope.map(str::to_string), native_id.to_string());
        if let Some(existing) = self.entries.get(&key) {
            return Ok(existing.clone());
        }

        let mut base = sanitize_name(display_name);
        if base.is_empty() {
            base = "unnamed".to_string();
        }
        let synthetic = if category.randomized() {
            format!("{base}{}", random_suffix())
        } else {
            format!("{base}{}", category.name_suffix())
        };

        let claim = (category, scope.map(str::to_string), synthetic.clone());
        if let Some(holder) = self.claimed.get(&claim) {
            if holder != native_id {
                return Err(ExportError::NamingCollision { name: synthetic });
            }
        }
        self.claimed.insert(claim, native_id.to_string());
        self.by_native
            .insert((category, native_id.to_string()), synthetic.clone());
        self.entries.insert(key, synthetic.clone());
        Ok(synthetic)
    }

    /// Resolve a native id to its synthetic id. With a scope the lookup is
    /// confined to that namespace; without one the unscoped index is
    /// consulted. A miss is an `UnresolvedReference`.
    pub fn lookup(
        &self,
        category: EntityCategory,
        scope: Option<&str>,
        native_id: &str,
    ) -> Result<String> {
        let found = match scope {
            Some(scope) => self
                .entries
                .get(&(category, Some(scope.to_string()), native_id.to_string())),
            None => self.by_native.get(&(category, native_id.to_string())),
        };
        found.cloned().ok_or_else(|| ExportError::UnresolvedReference {
            category: category.as_str().to_string(),
            native_id: native_id.to_string(),
        })
    }
}

/// Strip every character that is not an ASCII letter or digit and lower-case
/// the remainder, yielding an identifier safe for the target format.
#[must_use]
pub fn sanitize_name(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn random_suffix() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..8].to_string()
}
