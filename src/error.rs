use thiserror::Error;

/// Top-level error type for the raycell kernel.
#[derive(Debug, Error)]
pub enum RaycellError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Geometry(#[from] GeometryInconsistency),
}

/// Errors raised while building surfaces, rule trees, or cells.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("unexpected token `{token}` in {context}")]
    UnexpectedToken {
        token: String,
        context: &'static str,
    },

    #[error("unknown surface card `{0}`")]
    UnknownSurfaceCard(String),

    #[error("surface id 0 is not valid")]
    ZeroSurfaceId,

    #[error("surface id {0} is already registered with different geometry")]
    SurfaceIdClash(u32),

    #[error("degenerate surface: {0}")]
    DegenerateSurface(String),

    #[error("empty algebra expression")]
    EmptyExpression,

    #[error("malformed rule tree: {0}")]
    MalformedTree(String),

    #[error("canonical form is {0} and cannot be rendered")]
    UnrepresentableForm(&'static str),

    #[error("duplicate cell id {0}")]
    DuplicateCell(u32),

    #[error("object-surface map has not been built")]
    AdjacencyNotBuilt,
}

/// Errors for references to entities that do not exist.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("unknown surface id {0}")]
    UnknownSurface(u32),

    #[error("unknown cell id {0}")]
    UnknownCell(u32),

    #[error("segment index {index} is out of range [0, {size}]")]
    SegmentIndex { index: usize, size: usize },
}

/// Fatal inconsistencies detected while tracking through a model.
///
/// These indicate a non-conformal cell definition (gaps or overlaps),
/// not a transient condition, and abort the current trace.
#[derive(Debug, Error)]
pub enum GeometryInconsistency {
    #[error("initial point {0} is not inside any cell")]
    InitialPointNotInModel(String),

    #[error("no exit surface from cell {cell}: {detail}")]
    NoExitSurface { cell: u32, detail: String },

    #[error("no cell found across surface {surface}: {detail}")]
    NoNextCell { surface: i32, detail: String },

    #[error("track exceeded {0} cell crossings without reaching the end point")]
    IterationLimit(usize),
}

/// Convenience type alias for results using [`RaycellError`].
pub type Result<T> = std::result::Result<T, RaycellError>;
