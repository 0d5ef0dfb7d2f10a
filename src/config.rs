use crate::error::ConfigurationError;
use crate::ir::RankDirection;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const PIXELS_PER_INCH: f64 = 96.0;
pub const POINTS_PER_INCH: f64 = 72.0;
/// dot refuses `ranksep`/`nodesep` below 0.02in; this is that floor in pixels.
pub const MIN_SPACING: f64 = 1.92;
pub const DEFAULT_SPACING: f64 = 25.0;
/// The only output format the result parser understands.
pub const OUTPUT_FORMAT: &str = "json0";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum IterationLimit {
    #[default]
    Unbounded,
    Limited(f64),
}

impl IterationLimit {
    pub fn validate(self) -> Result<(), ConfigurationError> {
        match self {
            IterationLimit::Unbounded => Ok(()),
            IterationLimit::Limited(value) if value.is_finite() && value > 0.0 => Ok(()),
            IterationLimit::Limited(value) => {
                Err(ConfigurationError::InvalidIterationLimit { value })
            }
        }
    }

    pub fn limit(self) -> Option<f64> {
        match self {
            IterationLimit::Unbounded => None,
            IterationLimit::Limited(value) => Some(value),
        }
    }
}

impl fmt::Display for IterationLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IterationLimit::Unbounded => f.write_str("unbounded"),
            IterationLimit::Limited(value) => write!(f, "{value}"),
        }
    }
}

impl std::str::FromStr for IterationLimit {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("unbounded") || trimmed.eq_ignore_ascii_case("infinity") {
            return Ok(IterationLimit::Unbounded);
        }
        let value = trimmed
            .parse::<f64>()
            .map_err(|_| ConfigurationError::UnparsableIterationLimit {
                token: trimmed.to_string(),
            })?;
        let limit = IterationLimit::Limited(value);
        limit.validate()?;
        Ok(limit)
    }
}

/// Everything that shapes the generated description. Changing any field on
/// an adapter invalidates its cached layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub direction: RankDirection,
    pub layer_spacing: f64,
    pub node_spacing: f64,
    pub uses_link_spots: bool,
    pub iteration_limit: IterationLimit,
    pub routing: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: RankDirection::TopToBottom,
            layer_spacing: DEFAULT_SPACING,
            node_spacing: DEFAULT_SPACING,
            uses_link_spots: false,
            iteration_limit: IterationLimit::Unbounded,
            routing: true,
        }
    }
}

impl LayoutOptions {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_spacing("layer spacing", self.layer_spacing)?;
        validate_spacing("node spacing", self.node_spacing)?;
        self.iteration_limit.validate()
    }
}

pub fn validate_spacing(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= MIN_SPACING {
        Ok(())
    } else {
        Err(ConfigurationError::SpacingTooSmall {
            name,
            value,
            min: MIN_SPACING,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct NodeSize {
    pub width: f64,
    pub height: f64,
}

/// How model nodes without explicit sizes are measured.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub default_size: NodeSize,
    pub categories: BTreeMap<String, NodeSize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            "wide".to_string(),
            NodeSize {
                width: 175.0,
                height: 25.0,
            },
        );
        Self {
            default_size: NodeSize {
                width: 75.0,
                height: 25.0,
            },
            categories,
        }
    }
}

impl ModelConfig {
    pub fn size_for(&self, category: Option<&str>) -> NodeSize {
        category
            .and_then(|name| self.categories.get(name))
            .copied()
            .unwrap_or(self.default_size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub program: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "dot".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub layout: LayoutOptions,
    pub model: ModelConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn to_iteration_limit(&self) -> Result<IterationLimit, ConfigurationError> {
        match self {
            NumberOrString::Number(val) => {
                let limit = IterationLimit::Limited(*val);
                limit.validate()?;
                Ok(limit)
            }
            NumberOrString::String(val) => val.parse(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    direction: Option<String>,
    layer_spacing: Option<f64>,
    node_spacing: Option<f64>,
    uses_link_spots: Option<bool>,
    iteration_limit: Option<NumberOrString>,
    routing: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct EngineConfigFile {
    program: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    engine: Option<EngineConfigFile>,
    default_node_size: Option<NodeSize>,
    categories: Option<BTreeMap<String, NodeSize>>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config document and merges it over the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.direction {
            config.layout.direction = v.parse()?;
        }
        if let Some(v) = layout.layer_spacing {
            config.layout.layer_spacing = v;
        }
        if let Some(v) = layout.node_spacing {
            config.layout.node_spacing = v;
        }
        if let Some(v) = layout.uses_link_spots {
            config.layout.uses_link_spots = v;
        }
        if let Some(v) = layout.iteration_limit {
            config.layout.iteration_limit = v.to_iteration_limit()?;
        }
        if let Some(v) = layout.routing {
            config.layout.routing = v;
        }
    }
    if let Some(engine) = parsed.engine {
        if let Some(v) = engine.program {
            config.engine.program = v;
        }
    }
    if let Some(v) = parsed.default_node_size {
        config.model.default_size = v;
    }
    if let Some(categories) = parsed.categories {
        config.model.categories.extend(categories);
    }

    config.layout.validate()?;
    Ok(config)
}
