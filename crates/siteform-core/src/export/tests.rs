use std::collections::HashMap;

use serde_json::{Value, json};

use super::models::ModelRules;
use crate::client::SourceApi;
use crate::error::{ExportError, Result};
use crate::export::{ExportOptions, Exporter};
use crate::project::project;
use crate::registry::{EntityCategory, LogicalIdRegistry};
use crate::resolve::resolve;
use crate::shape::ShapeFilter;
use crate::template::TemplateDocument;

struct FakeApi {
    model_pages: Vec<Value>,
    models: HashMap<String, Value>,
    tags: HashMap<String, Value>,
    top_level: Value,
    assets: HashMap<String, Value>,
    children: HashMap<(String, String), Value>,
    portals: Value,
    projects: HashMap<String, Value>,
    dashboards: HashMap<String, Value>,
    dashboard_docs: HashMap<String, Value>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            model_pages: vec![json!({"modelSummaries": []})],
            models: HashMap::new(),
            tags: HashMap::new(),
            top_level: json!({"assetSummaries": []}),
            assets: HashMap::new(),
            children: HashMap::new(),
            portals: json!({"portalSummaries": []}),
            projects: HashMap::new(),
            dashboards: HashMap::new(),
            dashboard_docs: HashMap::new(),
        }
    }
}

impl SourceApi for FakeApi {
    fn list_models(&self, cursor: Option<&str>) -> Result<Value> {
        let index = cursor.map_or(0, |c| c.parse::<usize>().expect("numeric cursor"));
        self.model_pages
            .get(index)
            .cloned()
            .ok_or_else(|| ExportError::upstream("list_models", "page out of range"))
    }

    fn describe_model(&self, model_id: &str) -> Result<Value> {
        self.models
            .get(model_id)
            .cloned()
            .ok_or_else(|| ExportError::upstream("describe_model", format!("no model {model_id}")))
    }

    fn list_tags(&self, resource_id: &str) -> Result<Value> {
        Ok(self
            .tags
            .get(resource_id)
            .cloned()
            .unwrap_or_else(|| json!({"tags": {}})))
    }

    fn list_top_level_assets(&self) -> Result<Value> {
        Ok(self.top_level.clone())
    }

    fn describe_asset(&self, asset_id: &str) -> Result<Value> {
        self.assets
            .get(asset_id)
            .cloned()
            .ok_or_else(|| ExportError::upstream("describe_asset", format!("no asset {asset_id}")))
    }

    fn list_child_assets(&self, asset_id: &str, hierarchy_id: &str) -> Result<Value> {
        Ok(self
            .children
            .get(&(asset_id.to_string(), hierarchy_id.to_string()))
            .cloned()
            .unwrap_or_else(|| json!({"assetSummaries": []})))
    }

    fn list_portals(&self) -> Result<Value> {
        Ok(self.portals.clone())
    }

    fn list_projects(&self, portal_id: &str) -> Result<Value> {
        Ok(self
            .projects
            .get(portal_id)
            .cloned()
            .unwrap_or_else(|| json!({"projectSummaries": []})))
    }

    fn list_dashboards(&self, project_id: &str) -> Result<Value> {
        Ok(self
            .dashboards
            .get(project_id)
            .cloned()
            .unwrap_or_else(|| json!({"dashboardSummaries": []})))
    }

    fn describe_dashboard(&self, dashboard_id: &str) -> Result<Value> {
        self.dashboard_docs
            .get(dashboard_id)
            .cloned()
            .ok_or_else(|| {
                ExportError::upstream("describe_dashboard", format!("no dashboard {dashboard_id}"))
            })
    }
}

/// Two models across two listing pages, two assets, one dashboard. The
/// boiler-line metric references a property of the boiler-unit model, which
/// registers only after the line model has been projected.
fn fixture() -> FakeApi {
    let mut api = FakeApi::new();

    api.model_pages = vec![
        json!({
            "modelSummaries": [{"id": "m-1", "name": "Boiler Line"}],
            "nextToken": "1"
        }),
        json!({
            "modelSummaries": [{"id": "m-2", "name": "Boiler Unit"}]
        }),
    ];

    api.models.insert(
        "m-1".to_string(),
        json!({
            "modelId": "m-1",
            "modelName": "Boiler Line",
            "modelDescription": "Line of boilers",
            "modelStatus": {"state": "ACTIVE"},
            "modelProperties": [
                {
                    "id": "p-rate",
                    "name": "Rate",
                    "dataType": "DOUBLE",
                    "unit": "u/h",
                    "type": {
                        "metric": {
                            "expression": "sum(pressure)",
                            "variables": [
                                {
                                    "name": "pressure",
                                    "value": {"propertyId": "p-pressure", "hierarchyId": "h-units"}
                                }
                            ],
                            "window": {"tumbling": {"interval": "1h"}}
                        }
                    }
                },
                {"id": "p-temp", "name": "Temperature", "type": {"measurement": {}}}
            ],
            "modelHierarchies": [
                {"id": "h-units", "name": "Units", "childModelId": "m-2"}
            ]
        }),
    );
    api.models.insert(
        "m-2".to_string(),
        json!({
            "modelId": "m-2",
            "modelName": "Boiler Unit",
            "modelProperties": [
                {
                    "id": "p-pressure",
                    "name": "Pressure",
                    "type": {"attribute": {"defaultValue": "42"}}
                }
            ],
            "modelHierarchies": []
        }),
    );
    api.tags.insert(
        "m-1".to_string(),
        json!({"tags": {"team": "ops", "env": "prod"}}),
    );

    api.top_level = json!({"assetSummaries": [{"id": "a-1", "name": "Plant A"}]});
    api.assets.insert(
        "a-1".to_string(),
        json!({
            "assetId": "a-1",
            "assetName": "Plant A",
            "modelId": "m-1",
            "assetProperties": [
                {"id": "p-temp", "name": "Temperature", "notification": {"state": "DISABLED"}}
            ],
            "assetHierarchies": [{"id": "h-units", "name": "Units"}]
        }),
    );
    api.assets.insert(
        "a-2".to_string(),
        json!({
            "assetId": "a-2",
            "assetName": "Unit 1",
            "modelId": "m-2",
            "assetProperties": [
                {
                    "id": "p-pressure",
                    "name": "Pressure",
                    "alias": "/plant/unit1/pressure",
                    "notification": {"state": "ENABLED"}
                }
            ],
            "assetHierarchies": []
        }),
    );
    api.children.insert(
        ("a-1".to_string(), "h-units".to_string()),
        json!({"assetSummaries": [{"id": "a-2", "name": "Unit 1"}]}),
    );

    api.portals = json!({"portalSummaries": [{"id": "po-1", "name": "Main"}]});
    api.projects.insert(
        "po-1".to_string(),
        json!({"projectSummaries": [{"id": "pr-1", "name": "Ops"}]}),
    );
    api.dashboards.insert(
        "pr-1".to_string(),
        json!({"dashboardSummaries": [{"id": "d-1", "name": "Unit Overview"}]}),
    );
    api.dashboard_docs.insert(
        "d-1".to_string(),
        json!({
            "dashboardId": "d-1",
            "dashboardName": "Unit Overview",
            "dashboardDescription": "Pressure at a glance",
            "projectId": "pr-1",
            "dashboardDefinition":
                "{\"widgets\":[{\"type\":\"line\",\"title\":\"Pressure\",\"metrics\":[{\"label\":\"pressure\",\"assetId\":\"a-2\",\"propertyId\":\"p-pressure\"}]}]}"
        }),
    );

    api
}

fn resource_properties<'t>(template: &'t TemplateDocument, name: &str) -> &'t Value {
    template
        .resources
        .get(name)
        .and_then(|resource| resource.get("Properties"))
        .unwrap_or_else(|| panic!("missing resource {name}"))
}

#[test]
fn full_export_resolves_every_reference() {
    let api = fixture();
    let options = ExportOptions {
        assets: Some(vec!["a-1".to_string()]),
        dashboards: true,
    };
    let template = Exporter::new(&api).export(&options).expect("export");
    assert_eq!(template.len(), 5);

    // The boiler-unit property's logical id is the anchor every reference
    // must resolve to.
    let unit = resource_properties(&template, "boilerunitmodel");
    let pressure_id = unit
        .pointer("/ModelProperties/0/LogicalId")
        .and_then(Value::as_str)
        .expect("pressure logical id");
    assert!(pressure_id.starts_with("pressure"));
    assert_eq!(pressure_id.len(), "pressure".len() + 8);

    let line = resource_properties(&template, "boilerlinemodel");
    assert_eq!(
        line.get("ModelDescription").and_then(Value::as_str),
        Some("Line of boilers")
    );
    assert!(line.get("ModelStatus").is_none());
    assert!(line.get("ModelId").is_none());
    assert_eq!(
        line.get("Tags"),
        Some(&json!([
            {"Key": "env", "Value": "prod"},
            {"Key": "team", "Value": "ops"}
        ]))
    );
    assert_eq!(
        line.pointer("/ModelHierarchies/0/ChildModelId"),
        Some(&json!({"Ref": "boilerunitmodel"}))
    );
    assert_eq!(
        line.pointer("/ModelHierarchies/0/LogicalId")
            .and_then(Value::as_str),
        Some("units")
    );

    // Forward reference: the metric variable was projected before
    // "p-pressure" registered, and resolved in the second pass.
    assert_eq!(
        line.pointer("/ModelProperties/0/Type/Metric/Variables/0/Value"),
        Some(&json!({
            "PropertyLogicalId": pressure_id,
            "HierarchyLogicalId": "units"
        }))
    );

    let plant = resource_properties(&template, "planta");
    assert_eq!(plant.get("ModelId"), Some(&json!({"Ref": "boilerlinemodel"})));
    assert_eq!(
        plant.get("AssetHierarchies"),
        Some(&json!([
            {"ChildAssetId": {"Ref": "unit1"}, "LogicalId": "units"}
        ]))
    );

    let unit_asset = resource_properties(&template, "unit1");
    assert_eq!(
        unit_asset.pointer("/AssetProperties/0/LogicalId").and_then(Value::as_str),
        Some(pressure_id)
    );
    assert_eq!(
        unit_asset
            .pointer("/AssetProperties/0/NotificationState")
            .and_then(Value::as_str),
        Some("ENABLED")
    );
    assert_eq!(
        unit_asset.pointer("/AssetProperties/0/Alias").and_then(Value::as_str),
        Some("/plant/unit1/pressure")
    );
    // Plant A's temperature property is disabled and unaliased.
    let plant_property = plant.pointer("/AssetProperties/0").expect("plant property");
    assert!(plant_property.get("NotificationState").is_none());
    assert!(plant_property.get("Alias").is_none());

    let dashboard = resource_properties(&template, "unitoverviewdashboard");
    assert_eq!(
        dashboard.pointer("/DashboardDefinition/Widgets/0/Metrics/0/Value"),
        Some(&json!({
            "AssetLogicalId": "unit1",
            "PropertyLogicalId": pressure_id
        }))
    );

    // No native identifier survives into the document.
    let raw = template.to_json().expect("serialize");
    for native in ["m-1", "m-2", "p-pressure", "p-temp", "p-rate", "h-units", "a-1", "a-2", "d-1"] {
        assert!(!raw.contains(&format!("\"{native}\"")), "native id {native} leaked");
    }
}

#[test]
fn top_level_assets_are_used_when_the_id_list_is_empty() {
    let api = fixture();
    let options = ExportOptions {
        assets: Some(Vec::new()),
        dashboards: false,
    };
    let template = Exporter::new(&api).export(&options).expect("export");
    assert!(template.resources.contains_key("planta"));
    assert!(template.resources.contains_key("unit1"));
}

#[test]
fn models_only_export_contains_no_assets() {
    let api = fixture();
    let template = Exporter::new(&api)
        .export(&ExportOptions::default())
        .expect("export");
    assert_eq!(template.len(), 2);
    assert!(template.resources.contains_key("boilerlinemodel"));
    assert!(template.resources.contains_key("boilerunitmodel"));
}

#[test]
fn dashboards_without_assets_fail_resolution() {
    let api = fixture();
    let options = ExportOptions {
        assets: None,
        dashboards: true,
    };
    let err = Exporter::new(&api).export(&options).expect_err("must fail");
    assert!(matches!(err, ExportError::UnresolvedReference { .. }));
}

#[test]
fn cyclic_asset_hierarchies_are_detected() {
    let mut api = fixture();
    // Unit 1 points back at Plant A.
    api.assets.insert(
        "a-2".to_string(),
        json!({
            "assetId": "a-2",
            "assetName": "Unit 1",
            "modelId": "m-2",
            "assetProperties": [],
            "assetHierarchies": [{"id": "h-units", "name": "Units"}]
        }),
    );
    api.children.insert(
        ("a-2".to_string(), "h-units".to_string()),
        json!({"assetSummaries": [{"id": "a-1", "name": "Plant A"}]}),
    );

    let options = ExportOptions {
        assets: Some(vec!["a-1".to_string()]),
        dashboards: false,
    };
    let err = Exporter::new(&api).export(&options).expect_err("must fail");
    assert!(matches!(
        err,
        ExportError::CyclicHierarchy { ref native_id } if native_id == "a-1"
    ));
}

#[test]
fn unreachable_child_assets_are_skipped() {
    let mut api = fixture();
    // A ghost child that cannot be described, listed before the real one.
    api.children.insert(
        ("a-1".to_string(), "h-units".to_string()),
        json!({"assetSummaries": [
            {"id": "a-ghost", "name": "Decommissioned"},
            {"id": "a-2", "name": "Unit 1"}
        ]}),
    );

    let options = ExportOptions {
        assets: Some(vec!["a-1".to_string()]),
        dashboards: false,
    };
    let template = Exporter::new(&api).export(&options).expect("export");
    assert!(template.resources.contains_key("planta"));
    assert!(template.resources.contains_key("unit1"));
    assert!(!template.resources.contains_key("decommissioned"));

    // The surviving hierarchy entry references only the reachable child.
    let plant = resource_properties(&template, "planta");
    assert_eq!(
        plant.get("AssetHierarchies"),
        Some(&json!([
            {"ChildAssetId": {"Ref": "unit1"}, "LogicalId": "units"}
        ]))
    );
}

#[test]
fn entity_projects_to_the_target_shape() {
    let filter = ShapeFilter::union(&[&["Name", "Type", "Attribute", "TypeName", "DefaultValue"]]);
    let mut registry = LogicalIdRegistry::new();
    let mut rules = ModelRules {
        registry: &mut registry,
    };
    let entity = json!({"name": "Boiler #1", "type": {"attribute": {"defaultValue": "42"}}});
    let out = project(&entity, &mut rules, Some(&filter), Some("m-1")).expect("project");
    assert_eq!(
        out,
        json!({
            "Name": "Boiler #1",
            "Type": {"TypeName": "Attribute", "Attribute": {"DefaultValue": "42"}}
        })
    );
}

#[test]
fn forward_references_resolve_after_registration() {
    let filter = ShapeFilter::for_models();
    let mut registry = LogicalIdRegistry::new();

    // Pass 1 sees the reference before its target exists.
    let variable = json!({"name": "t", "value": {"propertyId": "p-123"}});
    let projected = {
        let mut rules = ModelRules {
            registry: &mut registry,
        };
        project(&variable, &mut rules, Some(&filter), Some("m-9")).expect("project")
    };
    assert_eq!(
        projected.get("Value"),
        Some(&json!({"PropertyLogicalId": "p-123"}))
    );

    let synthetic = registry
        .register(EntityCategory::ModelProperty, Some("m-9"), "p-123", "Temp")
        .expect("register");
    let resolved = resolve(&projected, &registry).expect("resolve");
    assert_eq!(
        resolved.get("Value"),
        Some(&json!({"PropertyLogicalId": synthetic}))
    );
}
