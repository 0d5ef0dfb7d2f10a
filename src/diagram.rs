use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::ModelConfig;
use crate::ir::Point;

/// A node as seen by the layout: identity, measured size and hints.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub shape_hint: Option<String>,
    pub is_group: bool,
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub id: String,
    pub from: String,
    pub to: String,
    pub constraint_hint: Option<bool>,
    pub from_spot: Option<String>,
    pub to_spot: Option<String>,
    pub weight_hint: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    /// Node and link keys; unknown keys are ignored.
    Parts(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionParts {
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

/// Everything one layout pass writes back, applied in a single commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryUpdate {
    pub centers: BTreeMap<String, Point>,
    pub polylines: BTreeMap<String, Vec<Point>>,
}

/// The live diagram the adapter lays out.
pub trait Diagram {
    fn selection(&self, selection: &Selection) -> SelectionParts;
    fn find_node(&self, id: &str) -> Option<NodeRecord>;
    fn find_link(&self, id: &str) -> Option<LinkRecord>;
    fn commit(&mut self, update: GeometryUpdate);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(deserialize_with = "deserialize_key")]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_group: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Point>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkData {
    #[serde(
        default,
        deserialize_with = "deserialize_optional_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub key: Option<String>,
    #[serde(deserialize_with = "deserialize_key")]
    pub from: String,
    #[serde(deserialize_with = "deserialize_key")]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_spot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_spot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLinksModel {
    #[serde(default)]
    pub node_data_array: Vec<NodeData>,
    #[serde(default)]
    pub link_data_array: Vec<LinkData>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyRepr {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl From<KeyRepr> for String {
    fn from(key: KeyRepr) -> Self {
        match key {
            KeyRepr::Text(text) => text,
            KeyRepr::Integer(value) => value.to_string(),
            KeyRepr::Number(value) => value.to_string(),
        }
    }
}

fn deserialize_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    KeyRepr::deserialize(deserializer).map(String::from)
}

fn deserialize_optional_key<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<KeyRepr>::deserialize(deserializer)?.map(String::from))
}

/// An in-memory node/link model in the `nodeDataArray`/`linkDataArray`
/// shape, measured through a [`ModelConfig`].
#[derive(Debug, Clone, Default)]
pub struct ModelDiagram {
    model: GraphLinksModel,
    sizes: ModelConfig,
    commits: usize,
}

impl ModelDiagram {
    pub fn new(mut model: GraphLinksModel, sizes: ModelConfig) -> Self {
        ensure_unique_link_keys(&mut model.link_data_array);
        Self {
            model,
            sizes,
            commits: 0,
        }
    }

    pub fn from_json(json: &str, sizes: ModelConfig) -> serde_json::Result<Self> {
        let model: GraphLinksModel = serde_json::from_str(json)?;
        tracing::debug!(
            nodes = model.node_data_array.len(),
            links = model.link_data_array.len(),
            "model loaded"
        );
        Ok(Self::new(model, sizes))
    }

    pub fn model(&self) -> &GraphLinksModel {
        &self.model
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.model)
    }

    /// Number of commits received so far.
    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn node_center(&self, key: &str) -> Option<Point> {
        self.node_data(key).and_then(|node| node.center)
    }

    pub fn link_points(&self, key: &str) -> Option<&[Point]> {
        self.link_data(key).and_then(|link| link.points.as_deref())
    }

    fn node_data(&self, key: &str) -> Option<&NodeData> {
        self.model.node_data_array.iter().find(|node| node.key == key)
    }

    fn link_data(&self, key: &str) -> Option<&LinkData> {
        self.model
            .link_data_array
            .iter()
            .find(|link| link.key.as_deref() == Some(key))
    }

    fn node_record(&self, node: &NodeData) -> NodeRecord {
        let measured = self.sizes.size_for(node.category.as_deref());
        NodeRecord {
            id: node.key.clone(),
            width: Some(node.width.unwrap_or(measured.width)),
            height: Some(node.height.unwrap_or(measured.height)),
            shape_hint: node.shape.clone(),
            is_group: node.is_group,
            group: node.group.clone(),
        }
    }
}

fn link_record(link: &LinkData) -> LinkRecord {
    LinkRecord {
        id: link.key.clone().unwrap_or_default(),
        from: link.from.clone(),
        to: link.to.clone(),
        constraint_hint: link.constraint,
        from_spot: link.from_spot.clone(),
        to_spot: link.to_spot.clone(),
        weight_hint: link.weight,
    }
}

/// Link keys are how engine output finds its way back to a link, so every
/// link gets one and no two share it.
fn ensure_unique_link_keys(links: &mut [LinkData]) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut counter = 0usize;
    for link in links.iter_mut() {
        let unique = match link.key.take() {
            Some(key) if !seen.contains(&key) => key,
            existing => {
                let base = existing.unwrap_or_else(|| "link".to_string());
                loop {
                    counter += 1;
                    let candidate = format!("{base}-{counter}");
                    if !seen.contains(&candidate) {
                        break candidate;
                    }
                }
            }
        };
        seen.insert(unique.clone());
        link.key = Some(unique);
    }
}

impl Diagram for ModelDiagram {
    fn selection(&self, selection: &Selection) -> SelectionParts {
        match selection {
            Selection::All => SelectionParts {
                nodes: self
                    .model
                    .node_data_array
                    .iter()
                    .map(|node| self.node_record(node))
                    .collect(),
                links: self.model.link_data_array.iter().map(link_record).collect(),
            },
            Selection::Parts(keys) => {
                let mut parts = SelectionParts::default();
                for key in keys {
                    if let Some(node) = self.find_node(key) {
                        parts.nodes.push(node);
                    } else if let Some(link) = self.find_link(key) {
                        parts.links.push(link);
                    }
                }
                parts
            }
        }
    }

    fn find_node(&self, id: &str) -> Option<NodeRecord> {
        self.node_data(id).map(|node| self.node_record(node))
    }

    fn find_link(&self, id: &str) -> Option<LinkRecord> {
        self.link_data(id).map(link_record)
    }

    fn commit(&mut self, update: GeometryUpdate) {
        for node in &mut self.model.node_data_array {
            if let Some(center) = update.centers.get(&node.key) {
                node.center = Some(*center);
            }
        }
        for link in &mut self.model.link_data_array {
            let Some(key) = link.key.as_deref() else {
                continue;
            };
            if let Some(points) = update.polylines.get(key) {
                link.points = Some(points.clone());
            }
        }
        self.commits += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "nodeDataArray": [
            {"key": "n0", "color": "red"},
            {"key": "n1", "category": "wide"},
            {"key": 7, "width": 40, "height": 60, "shape": "circle"}
        ],
        "linkDataArray": [
            {"key": 0, "from": "n0", "to": "n1"},
            {"key": 0, "from": "n1", "to": 7},
            {"from": "n0", "to": 7, "fromSpot": "Bottom", "weight": 2}
        ]
    }"#;

    fn diagram() -> ModelDiagram {
        ModelDiagram::from_json(MODEL, ModelConfig::default()).unwrap()
    }

    #[test]
    fn numeric_keys_become_strings() {
        let diagram = diagram();
        let node = diagram.find_node("7").unwrap();
        assert_eq!(node.width, Some(40.0));
        assert_eq!(node.shape_hint.as_deref(), Some("circle"));
        assert_eq!(diagram.find_link("0").unwrap().to, "n1");
    }

    #[test]
    fn duplicate_and_missing_link_keys_are_made_unique() {
        let diagram = diagram();
        let keys: Vec<_> = diagram
            .model()
            .link_data_array
            .iter()
            .map(|link| link.key.clone().unwrap())
            .collect();
        assert_eq!(keys, vec!["0", "0-1", "link-2"]);
    }

    #[test]
    fn categories_resolve_sizes() {
        let diagram = diagram();
        assert_eq!(diagram.find_node("n0").unwrap().width, Some(75.0));
        assert_eq!(diagram.find_node("n1").unwrap().width, Some(175.0));
    }

    #[test]
    fn partial_selection_only_yields_named_parts() {
        let diagram = diagram();
        let parts = diagram.selection(&Selection::Parts(vec![
            "n0".to_string(),
            "link-2".to_string(),
            "missing".to_string(),
        ]));
        assert_eq!(parts.nodes.len(), 1);
        assert_eq!(parts.links.len(), 1);
        assert_eq!(parts.links[0].weight_hint, Some(2.0));
    }

    #[test]
    fn commit_writes_geometry_and_keeps_extra_fields() {
        let mut diagram = diagram();
        let mut update = GeometryUpdate::default();
        update.centers.insert("n0".to_string(), Point::new(10.0, 20.0));
        update
            .polylines
            .insert("0".to_string(), vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        diagram.commit(update);
        assert_eq!(diagram.node_center("n0"), Some(Point::new(10.0, 20.0)));
        assert_eq!(diagram.link_points("0").unwrap().len(), 2);
        assert_eq!(diagram.commits(), 1);
        let json = diagram.to_json().unwrap();
        assert!(json.contains("\"color\": \"red\""));
    }
}
