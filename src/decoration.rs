use std::fmt;
use std::str::FromStr;

use crate::config::LayoutOptions;
use crate::error::ConfigurationError;
use crate::ir::{Edge, Vertex};

pub const DEFAULT_SHAPE: &str = "box";

/// One of the ten attachment points dot accepts for `tailport`/`headport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompassPort {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    #[default]
    Center,
    Unconstrained,
}

impl CompassPort {
    pub const ALL: [CompassPort; 10] = [
        CompassPort::North,
        CompassPort::NorthEast,
        CompassPort::East,
        CompassPort::SouthEast,
        CompassPort::South,
        CompassPort::SouthWest,
        CompassPort::West,
        CompassPort::NorthWest,
        CompassPort::Center,
        CompassPort::Unconstrained,
    ];

    pub fn as_dot(self) -> &'static str {
        match self {
            CompassPort::North => "n",
            CompassPort::NorthEast => "ne",
            CompassPort::East => "e",
            CompassPort::SouthEast => "se",
            CompassPort::South => "s",
            CompassPort::SouthWest => "sw",
            CompassPort::West => "w",
            CompassPort::NorthWest => "nw",
            CompassPort::Center => "c",
            CompassPort::Unconstrained => "_",
        }
    }
}

impl fmt::Display for CompassPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_dot())
    }
}

impl FromStr for CompassPort {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let port = match s.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => CompassPort::North,
            "ne" | "northeast" => CompassPort::NorthEast,
            "e" | "east" => CompassPort::East,
            "se" | "southeast" => CompassPort::SouthEast,
            "s" | "south" => CompassPort::South,
            "sw" | "southwest" => CompassPort::SouthWest,
            "w" | "west" => CompassPort::West,
            "nw" | "northwest" => CompassPort::NorthWest,
            "c" | "center" => CompassPort::Center,
            "_" | "unconstrained" => CompassPort::Unconstrained,
            _ => {
                return Err(ConfigurationError::UnknownPort {
                    token: s.to_string(),
                });
            }
        };
        Ok(port)
    }
}

/// Where a link prefers to attach to a node, as declared by the diagram.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Spot {
    #[default]
    Default,
    None,
    Center,
    Top,
    TopCenter,
    TopSide,
    TopRight,
    Right,
    RightCenter,
    RightSide,
    BottomRight,
    Bottom,
    BottomCenter,
    BottomSide,
    BottomLeft,
    Left,
    LeftCenter,
    LeftSide,
    TopLeft,
    Fraction { x: f64, y: f64 },
    Other(String),
}

impl Spot {
    /// Accepts spot names in any case with optional separators
    /// (`TopRight`, `top-right`, `top_right`) or a fractional `"x y"` pair.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let mut numbers = trimmed.split_whitespace().map(str::parse::<f64>);
        if let (Some(Ok(x)), Some(Ok(y))) = (numbers.next(), numbers.next()) {
            return Spot::Fraction { x, y };
        }
        let name: String = trimmed
            .chars()
            .filter(|ch| !matches!(ch, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match name.as_str() {
            "" | "default" => Spot::Default,
            "none" => Spot::None,
            "center" => Spot::Center,
            "top" => Spot::Top,
            "topcenter" => Spot::TopCenter,
            "topside" => Spot::TopSide,
            "topright" => Spot::TopRight,
            "right" => Spot::Right,
            "rightcenter" => Spot::RightCenter,
            "rightside" => Spot::RightSide,
            "bottomright" => Spot::BottomRight,
            "bottom" => Spot::Bottom,
            "bottomcenter" => Spot::BottomCenter,
            "bottomside" => Spot::BottomSide,
            "bottomleft" => Spot::BottomLeft,
            "left" => Spot::Left,
            "leftcenter" => Spot::LeftCenter,
            "leftside" => Spot::LeftSide,
            "topleft" => Spot::TopLeft,
            _ => Spot::Other(trimmed.to_string()),
        }
    }

    pub fn to_port(&self) -> CompassPort {
        match self {
            Spot::Top | Spot::TopCenter | Spot::TopSide => CompassPort::North,
            Spot::TopRight => CompassPort::NorthEast,
            Spot::Right | Spot::RightCenter | Spot::RightSide => CompassPort::East,
            Spot::BottomRight => CompassPort::SouthEast,
            Spot::Bottom | Spot::BottomCenter | Spot::BottomSide => CompassPort::South,
            Spot::BottomLeft => CompassPort::SouthWest,
            Spot::Left | Spot::LeftCenter | Spot::LeftSide => CompassPort::West,
            Spot::TopLeft => CompassPort::NorthWest,
            Spot::Center | Spot::Default => CompassPort::Center,
            Spot::Fraction { x, y } => fraction_to_port(*x, *y),
            Spot::None | Spot::Other(_) => CompassPort::Unconstrained,
        }
    }
}

// Fractional spots only map when they coincide with a named spot.
const FRACTION_PORTS: [(f64, f64, CompassPort); 9] = [
    (0.5, 0.0, CompassPort::North),
    (1.0, 0.0, CompassPort::NorthEast),
    (1.0, 0.5, CompassPort::East),
    (1.0, 1.0, CompassPort::SouthEast),
    (0.5, 1.0, CompassPort::South),
    (0.0, 1.0, CompassPort::SouthWest),
    (0.0, 0.5, CompassPort::West),
    (0.0, 0.0, CompassPort::NorthWest),
    (0.5, 0.5, CompassPort::Center),
];

fn fraction_to_port(x: f64, y: f64) -> CompassPort {
    FRACTION_PORTS
        .iter()
        .find(|(fx, fy, _)| *fx == x && *fy == y)
        .map(|(_, _, port)| *port)
        .unwrap_or(CompassPort::Unconstrained)
}

/// Per-vertex layout attributes. Sizes are pixels and must be resolved
/// before a description is generated.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexDecoration {
    width: Option<f64>,
    height: Option<f64>,
    shape: String,
}

impl Default for VertexDecoration {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            shape: DEFAULT_SHAPE.to_string(),
        }
    }
}

impl VertexDecoration {
    pub fn width(&self) -> Option<f64> {
        self.width
    }

    pub fn height(&self) -> Option<f64> {
        self.height
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn set_width(&mut self, width: f64) -> Result<bool, ConfigurationError> {
        if self.width == Some(width) {
            return Ok(false);
        }
        self.width = Some(validate_size("width", width)?);
        Ok(true)
    }

    pub fn set_height(&mut self, height: f64) -> Result<bool, ConfigurationError> {
        if self.height == Some(height) {
            return Ok(false);
        }
        self.height = Some(validate_size("height", height)?);
        Ok(true)
    }

    /// The shape name is passed through to the engine unchecked.
    pub fn set_shape(&mut self, shape: impl Into<String>) -> bool {
        let shape = shape.into();
        if self.shape == shape {
            return false;
        }
        self.shape = shape;
        true
    }

    pub fn has_default_shape(&self) -> bool {
        self.shape == DEFAULT_SHAPE
    }
}

fn validate_size(name: &'static str, value: f64) -> Result<f64, ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigurationError::InvalidSize { name, value })
    }
}

/// Per-edge layout attributes: ranking participation, ports and weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDecoration {
    is_constraint: bool,
    tail_port: CompassPort,
    head_port: CompassPort,
    weight: u32,
}

impl Default for EdgeDecoration {
    fn default() -> Self {
        Self {
            is_constraint: true,
            tail_port: CompassPort::Center,
            head_port: CompassPort::Center,
            weight: 1,
        }
    }
}

impl EdgeDecoration {
    pub fn is_constraint(&self) -> bool {
        self.is_constraint
    }

    pub fn tail_port(&self) -> CompassPort {
        self.tail_port
    }

    pub fn head_port(&self) -> CompassPort {
        self.head_port
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn set_constraint(&mut self, is_constraint: bool) -> bool {
        if self.is_constraint == is_constraint {
            return false;
        }
        self.is_constraint = is_constraint;
        true
    }

    pub fn set_tail_port(&mut self, port: CompassPort) -> bool {
        if self.tail_port == port {
            return false;
        }
        self.tail_port = port;
        true
    }

    pub fn set_head_port(&mut self, port: CompassPort) -> bool {
        if self.head_port == port {
            return false;
        }
        self.head_port = port;
        true
    }

    /// Weights arrive as plain numbers from diagram data, so fractional and
    /// negative values are rejected here rather than truncated.
    pub fn set_weight(&mut self, weight: f64) -> Result<bool, ConfigurationError> {
        if f64::from(self.weight) == weight {
            return Ok(false);
        }
        if !weight.is_finite() || weight < 0.0 || weight.fract() != 0.0 || weight > f64::from(u32::MAX)
        {
            return Err(ConfigurationError::InvalidWeight { value: weight });
        }
        self.weight = weight as u32;
        Ok(true)
    }
}

/// Hook run on every vertex right before its statement is emitted.
pub trait VertexDecorator {
    fn decorate_vertex(
        &self,
        vertex: &mut Vertex,
        options: &LayoutOptions,
    ) -> Result<(), ConfigurationError>;
}

/// Hook run on every edge right before its statement is emitted.
pub trait EdgeDecorator {
    fn decorate_edge(&self, edge: &mut Edge, options: &LayoutOptions)
    -> Result<(), ConfigurationError>;
}

impl<F> VertexDecorator for F
where
    F: Fn(&mut Vertex, &LayoutOptions) -> Result<(), ConfigurationError>,
{
    fn decorate_vertex(
        &self,
        vertex: &mut Vertex,
        options: &LayoutOptions,
    ) -> Result<(), ConfigurationError> {
        self(vertex, options)
    }
}

impl<F> EdgeDecorator for F
where
    F: Fn(&mut Edge, &LayoutOptions) -> Result<(), ConfigurationError>,
{
    fn decorate_edge(
        &self,
        edge: &mut Edge,
        options: &LayoutOptions,
    ) -> Result<(), ConfigurationError> {
        self(edge, options)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDecorator;

impl VertexDecorator for NoopDecorator {
    fn decorate_vertex(
        &self,
        _vertex: &mut Vertex,
        _options: &LayoutOptions,
    ) -> Result<(), ConfigurationError> {
        Ok(())
    }
}

impl EdgeDecorator for NoopDecorator {
    fn decorate_edge(
        &self,
        _edge: &mut Edge,
        _options: &LayoutOptions,
    ) -> Result<(), ConfigurationError> {
        Ok(())
    }
}

/// Default edge hook: when link spots are honored, translate the declared
/// endpoint spots into compass ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpotPortDecorator;

impl EdgeDecorator for SpotPortDecorator {
    fn decorate_edge(
        &self,
        edge: &mut Edge,
        options: &LayoutOptions,
    ) -> Result<(), ConfigurationError> {
        if !options.uses_link_spots {
            return Ok(());
        }
        let tail = edge.from_spot.to_port();
        let head = edge.to_spot.to_port();
        edge.decoration.set_tail_port(tail);
        edge.decoration.set_head_port(head);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_accepts_non_negative_integers() {
        let mut deco = EdgeDecoration::default();
        for w in [0.0, 1.0, 2.0, 17.0] {
            deco.set_weight(w).unwrap();
            assert_eq!(f64::from(deco.weight()), w);
        }
    }

    #[test]
    fn weight_rejects_fractions_and_negatives() {
        let mut deco = EdgeDecoration::default();
        for w in [2.5, -1.0, f64::NAN, f64::INFINITY] {
            let err = deco.set_weight(w).unwrap_err();
            assert!(matches!(err, ConfigurationError::InvalidWeight { .. }));
        }
        assert_eq!(deco.weight(), 1);
    }

    #[test]
    fn unchanged_values_report_no_change() {
        let mut deco = EdgeDecoration::default();
        assert!(!deco.set_weight(1.0).unwrap());
        assert!(!deco.set_constraint(true));
        assert!(!deco.set_tail_port(CompassPort::Center));
        assert!(deco.set_head_port(CompassPort::South));
        assert!(!deco.set_head_port(CompassPort::South));

        let mut vertex = VertexDecoration::default();
        assert!(!vertex.set_shape("box"));
        assert!(vertex.set_width(40.0).unwrap());
        assert!(!vertex.set_width(40.0).unwrap());
    }

    #[test]
    fn ports_parse_from_dot_tokens_only() {
        for port in CompassPort::ALL {
            assert_eq!(port.as_dot().parse::<CompassPort>().unwrap(), port);
        }
        assert!("up".parse::<CompassPort>().is_err());
    }

    #[test]
    fn spots_map_to_compass_ports() {
        let cases = [
            ("Top", "n"),
            ("TopCenter", "n"),
            ("TopSide", "n"),
            ("TopRight", "ne"),
            ("right", "e"),
            ("RightSide", "e"),
            ("bottom-right", "se"),
            ("BottomCenter", "s"),
            ("BottomLeft", "sw"),
            ("LeftCenter", "w"),
            ("TopLeft", "nw"),
            ("Center", "c"),
            ("Default", "c"),
            ("0.5 0", "n"),
            ("0.25 0", "_"),
            ("LeftRightSides", "_"),
            ("None", "_"),
        ];
        for (spot, port) in cases {
            assert_eq!(Spot::parse(spot).to_port().as_dot(), port, "spot {spot}");
        }
    }

    #[test]
    fn negative_sizes_are_rejected() {
        let mut deco = VertexDecoration::default();
        assert!(deco.set_height(-3.0).is_err());
        assert_eq!(deco.height(), None);
    }
}
