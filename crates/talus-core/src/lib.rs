//! Flow-routed hillslope evolution on arbitrary node graphs.
//!
//! A step is: [`FlowDirector`] builds the receiver graph for the current
//! surface, then [`TransportLengthDiffuser`] and/or [`ThresholdEroder`]
//! consume it to change elevation. Uplift and boundary handling belong to
//! the caller (see [`scenario`]).
pub mod config;
pub mod error;
pub mod flow;
pub mod grid;
pub mod hillslope;
pub mod scenario;
pub mod surface;

pub use config::{DiffuserParams, ThresholdParams};
pub use error::{Result, TalusError};
pub use flow::{FlowDirector, FlowGraph};
pub use grid::{BoundaryStatus, Connectivity, Edge, GridTopology, NetworkGrid, Neighbor, RasterGrid};
pub use hillslope::{
    DiffusionReport, ThresholdEroder, ThresholdReport, TransportLength, TransportLengthDiffuser,
};
pub use surface::Surface;
