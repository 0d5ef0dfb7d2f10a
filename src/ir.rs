use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::decoration::{EdgeDecoration, Spot, VertexDecoration};
use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankDirection {
    #[default]
    TopToBottom,
    BottomToTop,
    LeftToRight,
    RightToLeft,
}

impl RankDirection {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "tb" | "td" | "top-to-bottom" | "toptobottom" => Some(Self::TopToBottom),
            "bt" | "bottom-to-top" | "bottomtotop" => Some(Self::BottomToTop),
            "lr" | "left-to-right" | "lefttoright" => Some(Self::LeftToRight),
            "rl" | "right-to-left" | "righttoleft" => Some(Self::RightToLeft),
            _ => None,
        }
    }

    /// The `rankdir` value understood by dot.
    pub fn as_dot(self) -> &'static str {
        match self {
            Self::TopToBottom => "TB",
            Self::BottomToTop => "BT",
            Self::LeftToRight => "LR",
            Self::RightToLeft => "RL",
        }
    }
}

impl fmt::Display for RankDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_dot())
    }
}

impl FromStr for RankDirection {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| ConfigurationError::UnknownDirection {
            token: s.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: String,
    pub decoration: VertexDecoration,
    pub center: Option<Point>,
}

impl Vertex {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            decoration: VertexDecoration::default(),
            center: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub from_spot: Spot,
    pub to_spot: Spot,
    pub decoration: EdgeDecoration,
    pub points: Option<Vec<Point>>,
}

impl Edge {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            from_spot: Spot::Default,
            to_spot: Spot::Default,
            decoration: EdgeDecoration::default(),
            points: None,
        }
    }
}

/// The per-pass vertex/edge network. Rebuilt from the selection on every pass.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub vertices: BTreeMap<String, Vertex>,
    pub edges: Vec<Edge>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn add_vertex(&mut self, vertex: Vertex) {
        self.vertices.insert(vertex.id.clone(), vertex);
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn find_vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    pub fn find_vertex_mut(&mut self, id: &str) -> Option<&mut Vertex> {
        self.vertices.get_mut(id)
    }

    pub fn find_edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn find_edge_mut(&mut self, id: &str) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|edge| edge.id == id)
    }

    pub fn connects_known_vertices(&self, edge: &Edge) -> bool {
        self.vertices.contains_key(&edge.from) && self.vertices.contains_key(&edge.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_tokens_round_trip_through_dot_names() {
        for dir in [
            RankDirection::TopToBottom,
            RankDirection::BottomToTop,
            RankDirection::LeftToRight,
            RankDirection::RightToLeft,
        ] {
            assert_eq!(RankDirection::from_token(dir.as_dot()), Some(dir));
        }
        assert_eq!(
            RankDirection::from_token("left-to-right"),
            Some(RankDirection::LeftToRight)
        );
    }

    #[test]
    fn unknown_direction_is_a_configuration_error() {
        let err = "diagonal".parse::<RankDirection>().unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownDirection {
                token: "diagonal".to_string()
            }
        );
    }

    #[test]
    fn network_tracks_edges_between_known_vertices() {
        let mut network = Network::new();
        network.add_vertex(Vertex::new("A"));
        network.add_vertex(Vertex::new("B"));
        let inside = Edge::new("e1", "A", "B");
        let dangling = Edge::new("e2", "A", "Z");
        assert!(network.connects_known_vertices(&inside));
        assert!(!network.connects_known_vertices(&dangling));
        network.add_edge(inside);
        assert!(network.find_edge("e1").is_some());
        assert!(network.find_edge("e2").is_none());
    }
}
