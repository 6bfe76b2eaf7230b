use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::{ExportError, Result};

pub const FORMAT_VERSION: &str = "2024-09-01";

pub const MODEL_RESOURCE_TYPE: &str = "SiteForm::AssetModel";
pub const ASSET_RESOURCE_TYPE: &str = "SiteForm::Asset";
pub const DASHBOARD_RESOURCE_TYPE: &str = "SiteForm::Dashboard";

/// Formation-template document: the export run's single output. Resource
/// names are document-unique; insertion order is preserved into the
/// serialized file.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateDocument {
    #[serde(rename = "FormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Resources")]
    pub resources: Map<String, Value>,
}

impl TemplateDocument {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: description.into(),
            resources: Map::new(),
        }
    }

    /// Add one resource entry. A duplicate name is a `NamingCollision`:
    /// resources silently overwriting each other would drop entities from
    /// the document.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        resource_type: &str,
        properties: Value,
    ) -> Result<()> {
        let name = name.into();
        if self.resources.contains_key(&name) {
            return Err(ExportError::NamingCollision { name });
        }
        self.resources.insert(
            name,
            json!({"Type": resource_type, "Properties": properties}),
        );
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the document as `<name>.json` under `dir`, creating the
    /// directory if needed. Returns the written path.
    pub fn write_to(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.json"));
        fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn duplicate_resource_names_are_rejected() {
        let mut template = TemplateDocument::new("test");
        template
            .insert("boiler1", ASSET_RESOURCE_TYPE, json!({}))
            .expect("insert");
        let err = template
            .insert("boiler1", ASSET_RESOURCE_TYPE, json!({}))
            .expect_err("must reject duplicate");
        assert!(matches!(err, ExportError::NamingCollision { ref name } if name == "boiler1"));
    }

    #[test]
    fn write_to_creates_the_directory_and_file() {
        let dir = tempdir().expect("tempdir");
        let out = dir.path().join("nested");

        let mut template = TemplateDocument::new("SiteForm export");
        template
            .insert(
                "boilerlinemodel",
                MODEL_RESOURCE_TYPE,
                json!({"ModelName": "Boiler Line"}),
            )
            .expect("insert");

        let path = template.write_to(&out, "site-models").expect("write");
        assert_eq!(path, out.join("site-models.json"));

        let raw = std::fs::read_to_string(&path).expect("read back");
        let parsed: Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(
            parsed.get("FormatVersion").and_then(Value::as_str),
            Some(FORMAT_VERSION)
        );
        assert_eq!(
            parsed
                .pointer("/Resources/boilerlinemodel/Type")
                .and_then(Value::as_str),
            Some(MODEL_RESOURCE_TYPE)
        );
    }
}
