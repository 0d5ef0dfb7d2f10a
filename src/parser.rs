use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::{PIXELS_PER_INCH, POINTS_PER_INCH};
use crate::error::EngineResultError;
use crate::ir::{Network, Point};

type ParseResult<T> = std::result::Result<T, EngineResultError>;

const UNIT_SCALE: f64 = PIXELS_PER_INCH / POINTS_PER_INCH;

#[derive(Debug, Deserialize)]
struct EngineOutput {
    bb: Option<String>,
    #[serde(default)]
    objects: Vec<EngineObject>,
    #[serde(default)]
    edges: Vec<EngineEdge>,
}

#[derive(Debug, Deserialize)]
struct EngineObject {
    name: String,
    pos: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EngineEdge {
    id: Option<String>,
    pos: Option<String>,
}

/// Geometry read from one engine result, already in host pixels with a
/// top-left origin. Nothing is written anywhere until [`ParsedLayout::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLayout {
    pub total_height: f64,
    pub centers: BTreeMap<String, Point>,
    pub polylines: BTreeMap<String, Vec<Point>>,
}

impl ParsedLayout {
    pub fn apply(&self, network: &mut Network) {
        for (id, center) in &self.centers {
            if let Some(vertex) = network.find_vertex_mut(id) {
                vertex.center = Some(*center);
            }
        }
        for (id, points) in &self.polylines {
            if let Some(edge) = network.find_edge_mut(id) {
                edge.points = Some(points.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultParser {
    pub routing: bool,
}

impl Default for ResultParser {
    fn default() -> Self {
        Self { routing: true }
    }
}

impl ResultParser {
    pub fn new(routing: bool) -> Self {
        Self { routing }
    }

    /// Reads a `json0` document. Every placement must name an element of
    /// `network` and every vertex must be placed, otherwise the whole result
    /// is rejected.
    pub fn parse(&self, text: &str, network: &Network) -> ParseResult<ParsedLayout> {
        let output: EngineOutput = serde_json::from_str(text)?;
        let bb = output.bb.ok_or(EngineResultError::MissingBoundingBox)?;
        let total_height = parse_total_height(&bb)?;

        let mut centers = BTreeMap::new();
        for object in &output.objects {
            if network.find_vertex(&object.name).is_none() {
                return Err(EngineResultError::UnmatchedNode {
                    name: object.name.clone(),
                });
            }
            let pos = object
                .pos
                .as_deref()
                .ok_or_else(|| EngineResultError::MissingPlacement {
                    id: object.name.clone(),
                })?;
            centers.insert(object.name.clone(), parse_position(pos, total_height)?);
        }
        if let Some(id) = network.vertices.keys().find(|id| !centers.contains_key(*id)) {
            return Err(EngineResultError::MissingPlacement { id: id.clone() });
        }

        let mut polylines = BTreeMap::new();
        if self.routing {
            for edge in &output.edges {
                let id = edge.id.clone().unwrap_or_default();
                if network.find_edge(&id).is_none() {
                    return Err(EngineResultError::UnmatchedEdge { id });
                }
                let pos = edge
                    .pos
                    .as_deref()
                    .ok_or_else(|| EngineResultError::MissingPlacement { id: id.clone() })?;
                polylines.insert(id, parse_edge_points(pos, total_height)?);
            }
            let unrouted = network
                .edges
                .iter()
                .filter(|edge| network.connects_known_vertices(edge))
                .find(|edge| !polylines.contains_key(&edge.id));
            if let Some(edge) = unrouted {
                return Err(EngineResultError::MissingPlacement {
                    id: edge.id.clone(),
                });
            }
        }

        Ok(ParsedLayout {
            total_height,
            centers,
            polylines,
        })
    }
}

/// The bounding box is `llx,lly,urx,ury`; its last field is the height.
pub fn parse_total_height(bb: &str) -> ParseResult<f64> {
    let last = bb.rsplit(',').next().unwrap_or_default();
    last.trim()
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite())
        .ok_or_else(|| EngineResultError::InvalidBoundingBox { bb: bb.to_string() })
}

/// Converts an engine `"x,y"` position (points, bottom-left origin) into a
/// host point (pixels, top-left origin).
///
/// y is flipped against the bounding-box height and shifted down one point.
pub fn parse_position(pos: &str, total_height: f64) -> ParseResult<Point> {
    let invalid = || EngineResultError::InvalidPosition {
        pos: pos.to_string(),
    };
    let (raw_x, raw_y) = pos.split_once(',').ok_or_else(invalid)?;
    let x: f64 = raw_x.trim().parse().map_err(|_| invalid())?;
    // A trailing `!` marks pinned nodes in dot output.
    let y: f64 = raw_y
        .trim()
        .trim_end_matches('!')
        .parse()
        .map_err(|_| invalid())?;
    if !(x.is_finite() && y.is_finite()) {
        return Err(invalid());
    }
    Ok(Point::new(
        x * UNIT_SCALE,
        (total_height - y + 1.0) * UNIT_SCALE,
    ))
}

/// Inverse of [`parse_position`].
pub fn to_engine_position(point: Point, total_height: f64) -> Point {
    Point::new(
        point.x / UNIT_SCALE,
        total_height + 1.0 - point.y / UNIT_SCALE,
    )
}

/// Spline control points, with dot's optional `s,x,y` start and `e,x,y` end
/// markers folded in as the first and last points.
pub fn parse_edge_points(pos: &str, total_height: f64) -> ParseResult<Vec<Point>> {
    let mut start = None;
    let mut end = None;
    let mut points = Vec::new();
    for token in pos.split_whitespace() {
        if let Some(rest) = token.strip_prefix("s,") {
            start = Some(parse_position(rest, total_height)?);
        } else if let Some(rest) = token.strip_prefix("e,") {
            end = Some(parse_position(rest, total_height)?);
        } else {
            points.push(parse_position(token, total_height)?);
        }
    }
    if points.is_empty() {
        return Err(EngineResultError::InvalidPosition {
            pos: pos.to_string(),
        });
    }
    let mut all = Vec::with_capacity(points.len() + 2);
    all.extend(start);
    all.extend(points);
    all.extend(end);
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, Vertex};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn network() -> Network {
        let mut network = Network::new();
        network.add_vertex(Vertex::new("A"));
        network.add_vertex(Vertex::new("B"));
        network.add_edge(Edge::new("ab", "A", "B"));
        network
    }

    const RESULT: &str = r#"{
        "name": "%3", "directed": true, "strict": false,
        "bb": "0,0,62,108",
        "objects": [
            {"_gvid": 0, "name": "A", "pos": "27,90", "width": "0.75", "height": "0.5"},
            {"_gvid": 1, "name": "B", "pos": "27,18"}
        ],
        "edges": [
            {"_gvid": 0, "tail": 0, "head": 1, "id": "ab", "pos": "27,71.697 27,63.983 27,54.712 27,46.112"}
        ]
    }"#;

    #[test]
    fn positions_flip_and_scale() {
        let p = parse_position("27,90", 108.0).unwrap();
        assert!(close(p.x, 36.0));
        assert!(close(p.y, (108.0 - 90.0 + 1.0) * 96.0 / 72.0));
    }

    #[test]
    fn position_inverse_round_trips() {
        for h in [1.0, 72.5, 108.0, 4000.0] {
            for (x, y) in [(0.0, 0.0), (10.5, 300.25), (999.0, 1.0)] {
                let engine = to_engine_position(Point::new(x, y), h);
                let back = parse_position(&format!("{},{}", engine.x, engine.y), h).unwrap();
                assert!((back.x - x).abs() < 1e-6 && (back.y - y).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn malformed_positions_are_rejected() {
        for bad in ["", "12", "a,b", "1,", ",2", "NaN,1"] {
            assert!(parse_position(bad, 10.0).is_err(), "accepted {bad:?}");
        }
        assert!(parse_position("3,4!", 10.0).is_ok());
    }

    #[test]
    fn bounding_box_height_is_last_field() {
        assert_eq!(parse_total_height("0,0,62,108").unwrap(), 108.0);
        assert!(parse_total_height("0,0,62,").is_err());
    }

    #[test]
    fn parses_nodes_and_edges() {
        let parsed = ResultParser::new(true).parse(RESULT, &network()).unwrap();
        assert_eq!(parsed.total_height, 108.0);
        assert!(close(parsed.centers["A"].y, 19.0 * 96.0 / 72.0));
        assert_eq!(parsed.polylines["ab"].len(), 4);
    }

    #[test]
    fn routing_off_ignores_edges() {
        let parsed = ResultParser::new(false).parse(RESULT, &network()).unwrap();
        assert!(parsed.polylines.is_empty());
    }

    #[test]
    fn edge_markers_become_endpoints() {
        let points = parse_edge_points("e,10,0 s,0,10 1,9 2,8 3,7 4,6", 10.0).unwrap();
        assert_eq!(points.len(), 6);
        assert!(close(points[0].x, 0.0));
        assert!(close(points[5].x, 10.0 * 96.0 / 72.0));
    }

    #[test]
    fn unknown_identifiers_fail() {
        let mut net = network();
        net.vertices.remove("B");
        let err = ResultParser::default().parse(RESULT, &net).unwrap_err();
        assert!(matches!(err, EngineResultError::UnmatchedNode { .. }));

        let mut net = network();
        net.edges.clear();
        let err = ResultParser::default().parse(RESULT, &net).unwrap_err();
        assert!(matches!(err, EngineResultError::UnmatchedEdge { .. }));
    }

    #[test]
    fn missing_bounding_box_fails() {
        let err = ResultParser::default()
            .parse(r#"{"objects": []}"#, &Network::new())
            .unwrap_err();
        assert!(matches!(err, EngineResultError::MissingBoundingBox));
    }

    #[test]
    fn unplaced_vertex_fails() {
        let mut net = network();
        net.add_vertex(Vertex::new("C"));
        let err = ResultParser::default().parse(RESULT, &net).unwrap_err();
        assert!(matches!(err, EngineResultError::MissingPlacement { .. }));
    }

    #[test]
    fn apply_writes_into_network() {
        let mut net = network();
        let parsed = ResultParser::default().parse(RESULT, &net).unwrap();
        parsed.apply(&mut net);
        assert!(net.find_vertex("A").unwrap().center.is_some());
        assert_eq!(net.find_edge("ab").unwrap().points.as_ref().unwrap().len(), 4);
    }
}
