use std::collections::HashSet;

// Field tables for the template shapes a projected resource may contain.
// Names are canonical (first character upper-cased), matching the casing the
// projector applies to source fields.

pub const ASSET_MODEL: &[&str] = &[
    "ModelName",
    "ModelDescription",
    "ModelProperties",
    "ModelHierarchies",
    "ModelCompositeModels",
    "Tags",
];

pub const MODEL_PROPERTY: &[&str] = &["DataType", "DataTypeSpec", "LogicalId", "Name", "Type", "Unit"];

pub const COMPOSITE_MODEL: &[&str] = &["CompositeModelProperties", "Description", "Name", "Type"];

pub const PROPERTY_TYPE: &[&str] = &["Attribute", "Metric", "Transform", "TypeName"];

pub const ATTRIBUTE: &[&str] = &["DefaultValue"];

pub const METRIC: &[&str] = &["Expression", "Variables", "Window"];

pub const METRIC_WINDOW: &[&str] = &["Tumbling"];

pub const TUMBLING_WINDOW: &[&str] = &["Interval"];

pub const TRANSFORM: &[&str] = &["Expression", "Variables"];

pub const EXPRESSION_VARIABLE: &[&str] = &["Name", "Value"];

pub const VARIABLE_VALUE: &[&str] = &["HierarchyLogicalId", "PropertyLogicalId"];

pub const MODEL_HIERARCHY: &[&str] = &["ChildModelId", "LogicalId", "Name"];

pub const ASSET: &[&str] = &[
    "AssetName",
    "ModelId",
    "AssetProperties",
    "AssetHierarchies",
    "Tags",
];

pub const ASSET_PROPERTY: &[&str] = &["Alias", "LogicalId", "NotificationState"];

pub const ASSET_HIERARCHY: &[&str] = &["ChildAssetId", "LogicalId"];

pub const DASHBOARD: &[&str] = &["DashboardName", "DashboardDescription", "DashboardDefinition"];

pub const DASHBOARD_DEFINITION: &[&str] = &["Widgets"];

pub const DASHBOARD_WIDGET: &[&str] = &["Type", "Title", "Metrics"];

pub const DASHBOARD_METRIC: &[&str] = &["Label", "Value"];

pub const REFERENCE_MARKER: &[&str] = &["AssetLogicalId", "HierarchyLogicalId", "PropertyLogicalId"];

pub const TAG: &[&str] = &["Key", "Value"];

pub const REF: &[&str] = &["Ref"];

/// Union allow-set over the shape fragments of one resource type.
///
/// Membership is by field name only and is not scoped by nesting depth: a
/// name admitted by any fragment is admitted at every level of that
/// resource's subtree. Fragment field names are chosen so that no two
/// unrelated shapes of the same resource type share a name by accident.
#[derive(Debug, Clone)]
pub struct ShapeFilter {
    fields: HashSet<&'static str>,
}

impl ShapeFilter {
    pub fn union(fragments: &[&[&'static str]]) -> Self {
        let mut fields = HashSet::new();
        for fragment in fragments {
            fields.extend(fragment.iter().copied());
        }
        Self { fields }
    }

    pub fn for_models() -> Self {
        Self::union(&[
            ASSET_MODEL,
            MODEL_PROPERTY,
            COMPOSITE_MODEL,
            PROPERTY_TYPE,
            ATTRIBUTE,
            METRIC,
            METRIC_WINDOW,
            TUMBLING_WINDOW,
            TRANSFORM,
            EXPRESSION_VARIABLE,
            VARIABLE_VALUE,
            MODEL_HIERARCHY,
            TAG,
            REF,
        ])
    }

    pub fn for_assets() -> Self {
        Self::union(&[ASSET, ASSET_PROPERTY, ASSET_HIERARCHY, TAG, REF])
    }

    pub fn for_dashboards() -> Self {
        Self::union(&[
            DASHBOARD,
            DASHBOARD_DEFINITION,
            DASHBOARD_WIDGET,
            DASHBOARD_METRIC,
            REFERENCE_MARKER,
            TAG,
            REF,
        ])
    }

    #[must_use]
    pub fn admits(&self, canonical_field: &str) -> bool {
        self.fields.contains(canonical_field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
