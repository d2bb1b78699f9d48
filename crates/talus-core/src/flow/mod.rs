//! Flow routing: steepest-descent receivers and the ordered flow graph the
//! hillslope components sweep over.
pub mod director;
pub mod graph;

pub use director::FlowDirector;
pub use graph::FlowGraph;
