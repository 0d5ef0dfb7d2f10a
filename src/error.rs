pub type Result<T> = std::result::Result<T, LayoutError>;

/// Everything that can abort a layout pass or reject a configuration change.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    UnsupportedStructure(#[from] UnsupportedStructureError),

    #[error(transparent)]
    EngineResult(#[from] EngineResultError),
}

impl LayoutError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, LayoutError::Configuration(_))
    }

    pub fn is_unsupported_structure(&self) -> bool {
        matches!(self, LayoutError::UnsupportedStructure(_))
    }

    pub fn is_engine_result(&self) -> bool {
        matches!(self, LayoutError::EngineResult(_))
    }
}

/// Raised synchronously on assignment or construction. Values are never clamped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{name} must be at least {min} px, got {value}")]
    SpacingTooSmall {
        name: &'static str,
        value: f64,
        min: f64,
    },

    #[error("iteration limit must be a positive finite number, got {value}")]
    InvalidIterationLimit { value: f64 },

    #[error("iteration limit must be a number or \"unbounded\", got {token:?}")]
    UnparsableIterationLimit { token: String },

    #[error("unknown rank direction: {token}")]
    UnknownDirection { token: String },

    #[error("unknown compass port: {token}")]
    UnknownPort { token: String },

    #[error("edge weight must be a non-negative integer, got {value}")]
    InvalidWeight { value: f64 },

    #[error("{name} must be a finite non-negative number of pixels, got {value}")]
    InvalidSize { name: &'static str, value: f64 },

    #[error("identifier {id:?} cannot be written as a dot string")]
    UnquotableIdentifier { id: String },

    #[error("vertex {id} has no resolved size")]
    UnresolvedSize { id: String },

    #[error("layout engine handle is not loaded")]
    EngineNotLoaded,

    #[error("layout engine unavailable: {message}")]
    EngineUnavailable { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnsupportedStructureError {
    #[error("groups are not supported by the dot layout (node {id})")]
    Group { id: String },

    #[error("node {id} belongs to group {group}; nested subgraphs are not supported")]
    GroupMember { id: String, group: String },
}

/// The engine call failed or returned something that cannot be committed.
#[derive(Debug, thiserror::Error)]
pub enum EngineResultError {
    #[error("layout engine failed: {message}")]
    EngineFailed { message: String },

    #[error("engine output is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("engine output has no bounding box")]
    MissingBoundingBox,

    #[error("engine output has an unreadable bounding box: {bb}")]
    InvalidBoundingBox { bb: String },

    #[error("unparsable position: {pos:?}")]
    InvalidPosition { pos: String },

    #[error("engine output references unknown node {name}")]
    UnmatchedNode { name: String },

    #[error("engine output references unknown edge {id}")]
    UnmatchedEdge { id: String },

    #[error("engine output has no position for {id}")]
    MissingPlacement { id: String },
}
