//! Hillslope components that consume a [`FlowGraph`](crate::flow::FlowGraph):
//! transport-length diffusion (mass-conserving) and threshold clipping
//! (not mass-conserving).
pub mod threshold;
pub mod transport_length;

pub use threshold::{ThresholdEroder, ThresholdReport};
pub use transport_length::{DiffusionReport, TransportLength, TransportLengthDiffuser};
