use std::fmt::Write;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{LayoutOptions, PIXELS_PER_INCH};
use crate::decoration::{EdgeDecorator, NoopDecorator, SpotPortDecorator, VertexDecorator};
use crate::error::{ConfigurationError, Result};
use crate::ir::{Edge, Network, Vertex};

static BARE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Compiles a [`Network`] into dot source.
///
/// Decorators run immediately before each statement is written, so they see
/// (and may change) the element exactly as it will be described.
pub struct DescriptionGenerator {
    vertex_decorator: Box<dyn VertexDecorator>,
    edge_decorator: Box<dyn EdgeDecorator>,
}

impl Default for DescriptionGenerator {
    fn default() -> Self {
        Self::new(Box::new(NoopDecorator), Box::new(SpotPortDecorator))
    }
}

impl DescriptionGenerator {
    pub fn new(
        vertex_decorator: Box<dyn VertexDecorator>,
        edge_decorator: Box<dyn EdgeDecorator>,
    ) -> Self {
        Self {
            vertex_decorator,
            edge_decorator,
        }
    }

    pub fn set_vertex_decorator(&mut self, decorator: Box<dyn VertexDecorator>) {
        self.vertex_decorator = decorator;
    }

    pub fn set_edge_decorator(&mut self, decorator: Box<dyn EdgeDecorator>) {
        self.edge_decorator = decorator;
    }

    pub fn generate(&self, network: &mut Network, options: &LayoutOptions) -> Result<String> {
        let mut out = String::from("digraph {\n");
        push_graph_attributes(&mut out, options);
        out.push_str("  node [shape=\"box\" fixedsize=true label=\"\"]\n");
        out.push_str("  edge [arrowhead=\"none\"]\n");

        for vertex in network.vertices.values_mut() {
            self.vertex_decorator.decorate_vertex(vertex, options)?;
            push_vertex(&mut out, vertex)?;
        }

        let Network { vertices, edges } = network;
        for edge in edges.iter_mut() {
            if !(vertices.contains_key(&edge.from) && vertices.contains_key(&edge.to)) {
                continue;
            }
            self.edge_decorator.decorate_edge(edge, options)?;
            push_edge(&mut out, edge)?;
        }

        out.push('}');
        Ok(out)
    }
}

fn push_graph_attributes(out: &mut String, options: &LayoutOptions) {
    let _ = write!(
        out,
        "  graph [rankdir=\"{}\" ranksep={} nodesep={}",
        options.direction.as_dot(),
        options.layer_spacing / PIXELS_PER_INCH,
        options.node_spacing / PIXELS_PER_INCH,
    );
    if let Some(limit) = options.iteration_limit.limit() {
        let _ = write!(out, " nslimit={limit} nslimit1={limit}");
    }
    out.push_str("]\n");
}

fn push_vertex(out: &mut String, vertex: &Vertex) -> Result<()> {
    let deco = &vertex.decoration;
    let (Some(width), Some(height)) = (deco.width(), deco.height()) else {
        return Err(ConfigurationError::UnresolvedSize {
            id: vertex.id.clone(),
        }
        .into());
    };
    let _ = write!(
        out,
        "  {} [width={} height={}",
        quote_id(&vertex.id)?,
        width / PIXELS_PER_INCH,
        height / PIXELS_PER_INCH,
    );
    if !deco.has_default_shape() {
        let _ = write!(out, " shape={}", quote_id(deco.shape())?);
    }
    out.push_str("]\n");
    Ok(())
}

fn push_edge(out: &mut String, edge: &Edge) -> Result<()> {
    let deco = &edge.decoration;
    let _ = write!(
        out,
        "  {} -> {} [id={}",
        quote_id(&edge.from)?,
        quote_id(&edge.to)?,
        quote_id(&edge.id)?,
    );
    if !deco.is_constraint() {
        out.push_str(" constraint=false");
    }
    if deco.tail_port() != Default::default() {
        let _ = write!(out, " tailport=\"{}\"", deco.tail_port());
    }
    if deco.head_port() != Default::default() {
        let _ = write!(out, " headport=\"{}\"", deco.head_port());
    }
    if deco.weight() != 1 {
        let _ = write!(out, " weight={}", deco.weight());
    }
    out.push_str("]\n");
    Ok(())
}

/// Quotes an identifier for dot. Plain identifiers pass through unquoted so
/// the common case stays readable.
///
/// Inside a dot string only `\"` is unescaped; other backslashes and raw
/// newlines are kept as written. Engine output names elements by the lexed
/// string, so an identifier that would not lex back to itself is rejected.
pub fn quote_id(id: &str) -> std::result::Result<String, ConfigurationError> {
    if BARE_ID_RE.is_match(id) && !is_keyword(id) {
        return Ok(id.to_string());
    }
    let body = id.replace('"', "\\\"");
    if lex_quoted(&body).as_deref() != Some(id) {
        return Err(ConfigurationError::UnquotableIdentifier { id: id.to_string() });
    }
    Ok(format!("\"{body}\""))
}

/// What dot reads from the body of a quoted string, or `None` when the body
/// would end the string early.
fn lex_quoted(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => return None,
            '\\' => match chars.peek() {
                // The closing quote would be swallowed.
                None => return None,
                Some('"') => {
                    chars.next();
                    out.push('"');
                }
                Some('\\') => {
                    chars.next();
                    out.push_str("\\\\");
                }
                // Line continuation.
                Some('\n') => {
                    chars.next();
                }
                Some(_) => out.push('\\'),
            },
            _ => out.push(ch),
        }
    }
    Some(out)
}

fn is_keyword(id: &str) -> bool {
    matches!(
        id.to_ascii_lowercase().as_str(),
        "node" | "edge" | "graph" | "digraph" | "subgraph" | "strict"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IterationLimit;
    use crate::decoration::CompassPort;
    use crate::ir::RankDirection;

    fn sized_vertex(id: &str, width: f64, height: f64) -> Vertex {
        let mut vertex = Vertex::new(id);
        vertex.decoration.set_width(width).unwrap();
        vertex.decoration.set_height(height).unwrap();
        vertex
    }

    fn chain() -> Network {
        let mut network = Network::new();
        network.add_vertex(sized_vertex("A", 96.0, 48.0));
        network.add_vertex(sized_vertex("B", 75.0, 25.0));
        network.add_vertex(sized_vertex("C", 75.0, 25.0));
        network.add_edge(Edge::new("ab", "A", "B"));
        network.add_edge(Edge::new("bc", "B", "C"));
        network
    }

    #[test]
    fn header_converts_spacing_to_inches() {
        let mut options = LayoutOptions::default();
        options.direction = RankDirection::LeftToRight;
        options.layer_spacing = 48.0;
        options.node_spacing = 24.0;
        let dot = DescriptionGenerator::default()
            .generate(&mut chain(), &options)
            .unwrap();
        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.ends_with('}'));
        assert!(dot.contains("graph [rankdir=\"LR\" ranksep=0.5 nodesep=0.25]"));
        assert!(!dot.contains("nslimit"));
    }

    #[test]
    fn iteration_cap_is_emitted_only_when_set() {
        let mut options = LayoutOptions::default();
        options.iteration_limit = IterationLimit::Limited(5.0);
        let dot = DescriptionGenerator::default()
            .generate(&mut chain(), &options)
            .unwrap();
        assert!(dot.contains("nslimit=5 nslimit1=5"));
    }

    #[test]
    fn vertex_sizes_are_inches_and_default_shape_is_omitted() {
        let mut network = chain();
        network
            .find_vertex_mut("C")
            .unwrap()
            .decoration
            .set_shape("ellipse");
        let dot = DescriptionGenerator::default()
            .generate(&mut network, &LayoutOptions::default())
            .unwrap();
        assert!(dot.contains("  A [width=1 height=0.5]\n"));
        assert!(dot.contains("  C [width=0.78125 height=0.2604166666666667 shape=ellipse]\n"));
    }

    #[test]
    fn default_edge_attributes_are_omitted() {
        let dot = DescriptionGenerator::default()
            .generate(&mut chain(), &LayoutOptions::default())
            .unwrap();
        assert!(dot.contains("  A -> B [id=ab]\n"));
        assert!(dot.contains("  B -> C [id=bc]\n"));
    }

    #[test]
    fn non_default_edge_attributes_are_emitted() {
        let mut network = chain();
        let edge = network.find_edge_mut("ab").unwrap();
        edge.decoration.set_constraint(false);
        edge.decoration.set_weight(3.0).unwrap();
        edge.decoration.set_head_port(CompassPort::Unconstrained);
        let dot = DescriptionGenerator::default()
            .generate(&mut network, &LayoutOptions::default())
            .unwrap();
        assert!(dot.contains("  A -> B [id=ab constraint=false headport=\"_\" weight=3]\n"));
    }

    #[test]
    fn link_spots_become_ports_only_when_enabled() {
        let mut network = chain();
        let edge = network.find_edge_mut("ab").unwrap();
        edge.from_spot = crate::decoration::Spot::Bottom;
        edge.to_spot = crate::decoration::Spot::TopLeft;

        let generator = DescriptionGenerator::default();
        let dot = generator
            .generate(&mut network.clone(), &LayoutOptions::default())
            .unwrap();
        assert!(!dot.contains("tailport"));

        let mut options = LayoutOptions::default();
        options.uses_link_spots = true;
        let dot = generator.generate(&mut network, &options).unwrap();
        assert!(dot.contains("[id=ab tailport=\"s\" headport=\"nw\"]"));
    }

    #[test]
    fn unresolved_size_is_fatal() {
        let mut network = chain();
        network.add_vertex(Vertex::new("D"));
        let err = DescriptionGenerator::default()
            .generate(&mut network, &LayoutOptions::default())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn vertex_decorator_can_resolve_sizes() {
        let mut network = Network::new();
        network.add_vertex(Vertex::new("lonely"));
        let generator = DescriptionGenerator::new(
            Box::new(
                |vertex: &mut Vertex, _: &LayoutOptions| -> std::result::Result<(), ConfigurationError> {
                vertex.decoration.set_width(48.0)?;
                vertex.decoration.set_height(48.0)?;
                vertex.decoration.set_shape("circle");
                Ok(())
            }),
            Box::new(SpotPortDecorator),
        );
        let dot = generator
            .generate(&mut network, &LayoutOptions::default())
            .unwrap();
        assert!(dot.contains("lonely [width=0.5 height=0.5 shape=circle]"));
    }

    #[test]
    fn awkward_identifiers_are_quoted() {
        assert_eq!(quote_id("n1").unwrap(), "n1");
        assert_eq!(quote_id("42").unwrap(), "\"42\"");
        assert_eq!(quote_id("node").unwrap(), "\"node\"");
        assert_eq!(quote_id("say \"hi\"").unwrap(), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn backslashes_and_newlines_are_written_as_is() {
        assert_eq!(quote_id("a\\b").unwrap(), "\"a\\b\"");
        assert_eq!(quote_id("a\\\\b").unwrap(), "\"a\\\\b\"");
        assert_eq!(quote_id("x\ny").unwrap(), "\"x\ny\"");
        for id in ["a\\b", "x\ny", "say \"hi\"", "C:\\tmp\\n"] {
            let quoted = quote_id(id).unwrap();
            let body = &quoted[1..quoted.len() - 1];
            assert_eq!(lex_quoted(body).as_deref(), Some(id));
        }
    }

    #[test]
    fn identifiers_that_cannot_round_trip_are_rejected() {
        for id in ["trailing\\", "a\\\"b", "joined\\\nline"] {
            assert_eq!(
                quote_id(id).unwrap_err(),
                ConfigurationError::UnquotableIdentifier { id: id.to_string() }
            );
        }

        let mut network = Network::new();
        network.add_vertex(sized_vertex("dir\\", 75.0, 25.0));
        let err = DescriptionGenerator::default()
            .generate(&mut network, &LayoutOptions::default())
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
