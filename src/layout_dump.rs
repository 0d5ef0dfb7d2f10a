use crate::config::LayoutOptions;
use crate::diagram::{Diagram, ModelDiagram, Selection};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub direction: String,
    pub routing: bool,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub shape: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub points: Vec<[f64; 2]>,
}

impl LayoutDump {
    pub fn from_diagram(diagram: &ModelDiagram, options: &LayoutOptions) -> Self {
        let parts = diagram.selection(&Selection::All);
        let nodes = parts
            .nodes
            .into_iter()
            .map(|node| {
                let center = diagram.node_center(&node.id);
                NodeDump {
                    x: center.map(|p| p.x),
                    y: center.map(|p| p.y),
                    width: node.width,
                    height: node.height,
                    shape: node.shape_hint,
                    id: node.id,
                }
            })
            .collect();

        let edges = parts
            .links
            .into_iter()
            .map(|link| EdgeDump {
                points: diagram
                    .link_points(&link.id)
                    .unwrap_or_default()
                    .iter()
                    .map(|p| [p.x, p.y])
                    .collect(),
                id: link.id,
                from: link.from,
                to: link.to,
            })
            .collect();

        LayoutDump {
            direction: options.direction.to_string(),
            routing: options.routing,
            nodes,
            edges,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    diagram: &ModelDiagram,
    options: &LayoutOptions,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_diagram(diagram, options);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
