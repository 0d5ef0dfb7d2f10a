use crate::config::{IterationLimit, LayoutOptions, OUTPUT_FORMAT, validate_spacing};
use crate::decoration::{EdgeDecorator, Spot, VertexDecorator};
use crate::description::DescriptionGenerator;
use crate::diagram::{Diagram, GeometryUpdate, NodeRecord, Selection};
use crate::engine::LayoutEngine;
use crate::error::{ConfigurationError, Result, UnsupportedStructureError};
use crate::ir::{Edge, Network, RankDirection, Vertex};
use crate::parser::ResultParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutOutcome {
    /// The selection had no nodes; nothing was touched.
    Empty,
    /// Nothing changed since the last committed pass; the engine was not
    /// called and the diagram was left alone.
    Settled,
    Committed { vertices: usize, edges: usize },
}

/// Lays out a [`Diagram`] with an external dot engine.
///
/// Each pass builds a fresh [`Network`] from the selection, describes it,
/// runs the engine once, parses the result completely and only then commits
/// every center and polyline to the diagram in one go. A pass over an
/// unchanged description on a clean adapter is a no-op.
pub struct GraphLayoutAdapter<E> {
    engine: E,
    options: LayoutOptions,
    generator: DescriptionGenerator,
    network: Option<Network>,
    dirty: bool,
    settled: Option<String>,
}

impl<E: LayoutEngine> GraphLayoutAdapter<E> {
    pub fn new(engine: E, options: LayoutOptions) -> std::result::Result<Self, ConfigurationError> {
        if !engine.is_loaded() {
            return Err(ConfigurationError::EngineNotLoaded);
        }
        options.validate()?;
        Ok(Self {
            engine,
            options,
            generator: DescriptionGenerator::default(),
            network: None,
            dirty: true,
            settled: None,
        })
    }

    pub fn with_vertex_decorator(mut self, decorator: impl VertexDecorator + 'static) -> Self {
        self.generator.set_vertex_decorator(Box::new(decorator));
        self.dirty = true;
        self
    }

    pub fn with_edge_decorator(mut self, decorator: impl EdgeDecorator + 'static) -> Self {
        self.generator.set_edge_decorator(Box::new(decorator));
        self.dirty = true;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forces the next pass to call the engine and commit even if nothing
    /// changed.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Supplies the network for the next pass instead of building one from
    /// the selection. It is consumed by that pass.
    pub fn set_network(&mut self, network: Network) {
        self.network = Some(network);
    }

    pub fn direction(&self) -> RankDirection {
        self.options.direction
    }

    pub fn set_direction(&mut self, direction: RankDirection) {
        if self.options.direction != direction {
            self.options.direction = direction;
            self.mark_dirty("direction");
        }
    }

    pub fn layer_spacing(&self) -> f64 {
        self.options.layer_spacing
    }

    pub fn set_layer_spacing(&mut self, pixels: f64) -> std::result::Result<(), ConfigurationError> {
        if self.options.layer_spacing == pixels {
            return Ok(());
        }
        validate_spacing("layer spacing", pixels)?;
        self.options.layer_spacing = pixels;
        self.mark_dirty("layer spacing");
        Ok(())
    }

    pub fn node_spacing(&self) -> f64 {
        self.options.node_spacing
    }

    pub fn set_node_spacing(&mut self, pixels: f64) -> std::result::Result<(), ConfigurationError> {
        if self.options.node_spacing == pixels {
            return Ok(());
        }
        validate_spacing("node spacing", pixels)?;
        self.options.node_spacing = pixels;
        self.mark_dirty("node spacing");
        Ok(())
    }

    pub fn uses_link_spots(&self) -> bool {
        self.options.uses_link_spots
    }

    pub fn set_uses_link_spots(&mut self, uses_link_spots: bool) {
        if self.options.uses_link_spots != uses_link_spots {
            self.options.uses_link_spots = uses_link_spots;
            self.mark_dirty("uses link spots");
        }
    }

    pub fn iteration_limit(&self) -> IterationLimit {
        self.options.iteration_limit
    }

    pub fn set_iteration_limit(
        &mut self,
        limit: IterationLimit,
    ) -> std::result::Result<(), ConfigurationError> {
        if self.options.iteration_limit == limit {
            return Ok(());
        }
        limit.validate()?;
        self.options.iteration_limit = limit;
        self.mark_dirty("iteration limit");
        Ok(())
    }

    pub fn is_routing(&self) -> bool {
        self.options.routing
    }

    pub fn set_routing(&mut self, routing: bool) {
        if self.options.routing != routing {
            self.options.routing = routing;
            self.mark_dirty("routing");
        }
    }

    pub fn set_options(&mut self, options: LayoutOptions) -> std::result::Result<(), ConfigurationError> {
        if self.options == options {
            return Ok(());
        }
        options.validate()?;
        self.options = options;
        self.mark_dirty("options");
        Ok(())
    }

    fn mark_dirty(&mut self, what: &str) {
        tracing::trace!(changed = what, "layout invalidated");
        self.dirty = true;
    }

    pub fn compute_layout<D: Diagram + ?Sized>(
        &mut self,
        diagram: &mut D,
        selection: &Selection,
    ) -> Result<LayoutOutcome> {
        let span = tracing::debug_span!("dot_layout", direction = %self.options.direction);
        let _guard = span.enter();

        let mut network = match self.network.take() {
            Some(network) => network,
            None => build_network(&*diagram, selection)?,
        };
        if network.is_empty() {
            tracing::debug!("nothing to lay out");
            return Ok(LayoutOutcome::Empty);
        }

        let description = self.generator.generate(&mut network, &self.options)?;
        tracing::debug!(
            vertices = network.vertices.len(),
            edges = network.edges.len(),
            bytes = description.len(),
            "description generated"
        );

        if !self.dirty && self.settled.as_deref() == Some(description.as_str()) {
            tracing::debug!("layout already settled");
            return Ok(LayoutOutcome::Settled);
        }

        let output = self.engine.compute(&description, OUTPUT_FORMAT)?;

        let parsed = ResultParser::new(self.options.routing).parse(&output, &network)?;
        parsed.apply(&mut network);

        let update = geometry_update(&network, self.options.routing);
        let outcome = LayoutOutcome::Committed {
            vertices: update.centers.len(),
            edges: update.polylines.len(),
        };
        diagram.commit(update);
        tracing::info!(?outcome, "layout committed");

        self.settled = Some(description);
        self.dirty = false;
        Ok(outcome)
    }
}

/// Builds the per-pass network from the selection. Groups, and nodes
/// inside groups, are rejected before anything else happens.
pub fn build_network<D: Diagram + ?Sized>(diagram: &D, selection: &Selection) -> Result<Network> {
    let parts = diagram.selection(selection);
    let mut network = Network::new();

    for node in &parts.nodes {
        reject_grouped(node)?;
        let mut vertex = Vertex::new(node.id.clone());
        if let Some(width) = node.width {
            vertex.decoration.set_width(width)?;
        }
        if let Some(height) = node.height {
            vertex.decoration.set_height(height)?;
        }
        if let Some(shape) = &node.shape_hint {
            vertex.decoration.set_shape(shape.clone());
        }
        network.add_vertex(vertex);
    }

    for link in &parts.links {
        let mut outside = [&link.from, &link.to]
            .into_iter()
            .filter(|id| network.find_vertex(id).is_none())
            .peekable();
        if outside.peek().is_some() {
            for id in outside {
                if let Some(node) = diagram.find_node(id) {
                    reject_grouped(&node)?;
                }
            }
            tracing::debug!(link = %link.id, "skipping link with an endpoint outside the selection");
            continue;
        }

        let mut edge = Edge::new(link.id.clone(), link.from.clone(), link.to.clone());
        edge.from_spot = link.from_spot.as_deref().map(Spot::parse).unwrap_or_default();
        edge.to_spot = link.to_spot.as_deref().map(Spot::parse).unwrap_or_default();
        if let Some(constraint) = link.constraint_hint {
            edge.decoration.set_constraint(constraint);
        }
        if let Some(weight) = link.weight_hint {
            edge.decoration.set_weight(weight)?;
        }
        network.add_edge(edge);
    }

    Ok(network)
}

fn reject_grouped(node: &NodeRecord) -> std::result::Result<(), UnsupportedStructureError> {
    if node.is_group {
        return Err(UnsupportedStructureError::Group {
            id: node.id.clone(),
        });
    }
    if let Some(group) = &node.group {
        return Err(UnsupportedStructureError::GroupMember {
            id: node.id.clone(),
            group: group.clone(),
        });
    }
    Ok(())
}

fn geometry_update(network: &Network, routing: bool) -> GeometryUpdate {
    let mut update = GeometryUpdate::default();
    for vertex in network.vertices.values() {
        if let Some(center) = vertex.center {
            update.centers.insert(vertex.id.clone(), center);
        }
    }
    if routing {
        for edge in &network.edges {
            if let Some(points) = &edge.points {
                update.polylines.insert(edge.id.clone(), points.clone());
            }
        }
    }
    update
}
