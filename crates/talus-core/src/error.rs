//! Error type shared by every component in the crate.

/// Errors raised by the flow director, the hillslope components and the
/// surface/grid adapters.
///
/// All of these are reported before any field is mutated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TalusError {
    /// A rate, threshold or time step was zero, negative or not finite.
    #[error("parameter `{name}` must be positive and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// The grid has no nodes.
    #[error("grid has no nodes")]
    EmptyGrid,

    /// The grid has nodes but not a single link between them.
    #[error("grid has {nodes} nodes but no links")]
    NoLinks { nodes: usize },

    /// A neighbour index points outside the node range.
    #[error("node {node} lists neighbour {neighbor}, but the grid has {nodes} nodes")]
    NeighborOutOfRange { node: usize, neighbor: usize, nodes: usize },

    /// A node lists itself as a neighbour.
    #[error("node {node} is linked to itself")]
    SelfLink { node: usize },

    /// A link length was zero, negative or not finite.
    #[error("link {node} -> {neighbor} has invalid length {length}")]
    InvalidLinkLength { node: usize, neighbor: usize, length: f64 },

    /// Following receivers from `node` never reaches an outlet.
    #[error("receiver graph contains a cycle through node {node}")]
    FlowCycle { node: usize },

    /// Elevation at an active node is NaN or infinite.
    #[error("elevation at node {node} is not finite")]
    NonFiniteElevation { node: usize },

    /// The flow graph was built for an older elevation state.
    #[error(
        "flow graph is stale (built at surface revision {graph_revision:?}, surface is at {surface_revision}); run the flow director first"
    )]
    StaleFlowGraph {
        graph_revision: Option<u64>,
        surface_revision: u64,
    },

    /// A field does not have one value per grid node.
    #[error("field `{name}` has {actual} values, expected {expected}")]
    FieldLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A field the caller asked for is not registered on the surface.
    #[error("field `{name}` is not present on the surface")]
    MissingField { name: String },
}

pub type Result<T> = std::result::Result<T, TalusError>;

/// Check that `value` is strictly positive and finite.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(TalusError::InvalidParameter { name, value })
    }
}
