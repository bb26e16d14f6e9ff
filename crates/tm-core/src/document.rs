//! Desired-model documents.
//!
//! The CLI reads the logical model of one tenant from a YAML or JSON file.
//! Relationships reference classifications by name, which keeps hand-written
//! documents readable:
//!
//! ```yaml
//! tenant_id: 7b21599b-3518-401e-a70a-5fe28d4000e3
//! classifications:
//!   - name: Orders
//!   - name: Items
//! relationships:
//!   - from: Orders
//!     to: Items
//!     cardinality: many-to-many
//! ```

use crate::error::{CoreError, CoreResult};
use crate::model::{Classification, Relationship, RelationshipType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// Logical model of a single tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredModel {
    pub tenant_id: Uuid,

    #[serde(default)]
    pub classifications: Vec<ClassificationSpec>,

    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,

    /// File the document was loaded from, for error messages
    #[serde(skip)]
    pub source: Option<String>,
}

/// One classification entry of a [`DesiredModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationSpec {
    pub name: String,

    /// Stable id from the classification store, if known
    #[serde(default)]
    pub id: Option<Uuid>,
}

/// One relationship entry of a [`DesiredModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipSpec {
    /// Name of the source classification
    pub from: String,

    /// Name of the target classification
    pub to: String,

    /// `one-to-one`, `one-to-many`, `many-to-one` or `many-to-many`
    #[serde(alias = "type")]
    pub cardinality: String,

    #[serde(default)]
    pub id: Option<Uuid>,
}

impl DesiredModel {
    /// Load a model from a `.json`, `.yml` or `.yaml` file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let is_json = path.extension().is_some_and(|e| e == "json");
        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        let mut model: Self = parsed.map_err(|details| CoreError::ModelParseError {
            path: path.display().to_string(),
            details,
        })?;
        model.source = Some(path.display().to_string());
        Ok(model)
    }

    /// Resolve the document into engine inputs.
    ///
    /// Relationships naming an unknown classification keep a nil endpoint so
    /// reconciliation skips them like any other dangling reference.
    pub fn into_parts(self) -> CoreResult<(Vec<Classification>, Vec<Relationship>)> {
        let tenant_id = self.tenant_id;
        let source = self
            .source
            .unwrap_or_else(|| format!("<model of tenant {}>", tenant_id));
        let classifications: Vec<Classification> = self
            .classifications
            .into_iter()
            .map(|spec| Classification {
                id: spec.id.unwrap_or_else(Uuid::new_v4),
                tenant_id,
                name: spec.name,
            })
            .collect();

        let ids_by_name: HashMap<&str, Uuid> = classifications
            .iter()
            .map(|c| (c.name.as_str(), c.id))
            .collect();
        let resolve = |name: &str| match ids_by_name.get(name) {
            Some(id) => *id,
            None => {
                log::warn!("Relationship references unknown classification '{}'", name);
                Uuid::nil()
            }
        };

        let mut relationships = Vec::with_capacity(self.relationships.len());
        for spec in self.relationships {
            let kind: RelationshipType =
                spec.cardinality
                    .parse()
                    .map_err(|e: String| CoreError::ModelParseError {
                        path: source.clone(),
                        details: format!("relationship {} -> {}: {}", spec.from, spec.to, e),
                    })?;
            let mut rel = Relationship::new(tenant_id, resolve(&spec.from), resolve(&spec.to), kind);
            if let Some(id) = spec.id {
                rel.id = id;
            }
            relationships.push(rel);
        }

        Ok((classifications, relationships))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cardinality;

    const YAML: &str = r#"
tenant_id: 7b21599b-3518-401e-a70a-5fe28d4000e3
classifications:
  - name: Orders
  - name: Items
    id: 00000000-0000-0000-0000-000000000002
relationships:
  - from: Items
    to: Orders
    cardinality: many-to-one
  - from: Orders
    to: Missing
    type: one-to-one
"#;

    #[test]
    fn test_into_parts_resolves_names() {
        let model: DesiredModel = serde_yaml::from_str(YAML).unwrap();
        let (classes, rels) = model.into_parts().unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[1].id.to_string(), "00000000-0000-0000-0000-000000000002");

        let orders = classes[0].id;
        let items = classes[1].id;
        assert_eq!(rels[0].cardinality, Cardinality::OneToMany);
        assert_eq!(rels[0].from_classification, orders);
        assert_eq!(rels[0].to_classification, items);
    }

    #[test]
    fn test_into_parts_marks_unknown_endpoint_nil() {
        let model: DesiredModel = serde_yaml::from_str(YAML).unwrap();
        let (_, rels) = model.into_parts().unwrap();
        assert!(rels[1].to_classification.is_nil());
    }

    #[test]
    fn test_into_parts_rejects_unknown_cardinality() {
        let yaml = r#"
tenant_id: 7b21599b-3518-401e-a70a-5fe28d4000e3
classifications: [{name: A}, {name: B}]
relationships: [{from: A, to: B, cardinality: sideways}]
"#;
        let model: DesiredModel = serde_yaml::from_str(yaml).unwrap();
        let err = model.into_parts().unwrap_err();
        assert!(matches!(err, CoreError::ModelParseError { .. }));
        assert!(err.to_string().contains("sideways"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sideways.yml");
        std::fs::write(&path, yaml).unwrap();
        let err = DesiredModel::load(&path).unwrap().into_parts().unwrap_err();
        assert!(err.to_string().starts_with("[E006]"));
        assert!(err.to_string().contains("sideways.yml"));
    }

    #[test]
    fn test_load_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("model.yml");
        std::fs::write(&yaml_path, YAML).unwrap();
        assert_eq!(DesiredModel::load(&yaml_path).unwrap().classifications.len(), 2);

        let json_path = dir.path().join("model.json");
        std::fs::write(
            &json_path,
            r#"{"tenant_id":"7b21599b-3518-401e-a70a-5fe28d4000e3","classifications":[{"name":"Robot Specs"}]}"#,
        )
        .unwrap();
        let model = DesiredModel::load(&json_path).unwrap();
        assert_eq!(model.classifications[0].name, "Robot Specs");
        assert!(model.relationships.is_empty());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "tenant_id: not-a-uuid\n").unwrap();
        assert!(matches!(
            DesiredModel::load(&path),
            Err(CoreError::ModelParseError { .. })
        ));
    }
}
