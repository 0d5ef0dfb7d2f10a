#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod decoration;
pub mod description;
pub mod diagram;
pub mod engine;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, IterationLimit, LayoutOptions, load_config};
pub use decoration::{
    CompassPort, EdgeDecoration, EdgeDecorator, Spot, SpotPortDecorator, VertexDecoration,
    VertexDecorator,
};
pub use description::DescriptionGenerator;
pub use diagram::{Diagram, GeometryUpdate, LinkRecord, ModelDiagram, NodeRecord, Selection};
pub use engine::{GraphvizCommand, LayoutEngine};
pub use error::{
    ConfigurationError, EngineResultError, LayoutError, Result, UnsupportedStructureError,
};
pub use ir::{Edge, Network, Point, RankDirection, Vertex};
pub use layout::{GraphLayoutAdapter, LayoutOutcome, build_network};
pub use parser::{ParsedLayout, ResultParser, parse_position, to_engine_position};
