//! Steepest-descent (single receiver) flow direction.
//!
//! Every core node routes to the neighbour with the largest positive drop
//! per unit link length. Ties go to the first such neighbour in the grid's
//! neighbour order. Nodes with no downhill neighbour, and every non-core
//! node, are their own receiver with zero slope. Closed nodes are never
//! chosen as receivers.
#[cfg(feature = "threading")]
use rayon::prelude::*;

use super::graph::FlowGraph;
use crate::error::{Result, TalusError};
use crate::grid::{validate_topology, GridTopology};
use crate::surface::Surface;

/// Fallback pit length for a node with no links.
const ISOLATED_NODE_LENGTH: f64 = 1.0;

/// Builds a fresh [`FlowGraph`] from the current surface on every run,
/// reusing its buffers.
#[derive(Debug, Default)]
pub struct FlowDirector {
    graph: FlowGraph,
}

/// Routing decision for one node: (receiver, slope, link length).
type Route = (usize, f64, f64);

impl FlowDirector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut FlowGraph {
        &mut self.graph
    }

    pub fn into_graph(self) -> FlowGraph {
        self.graph
    }

    /// Route flow over `grid` for the current elevation of `surface`.
    ///
    /// Read-only on the surface; running it twice on an unchanged surface
    /// produces the same graph.
    pub fn run_one_step<G>(&mut self, grid: &G, surface: &Surface) -> Result<&FlowGraph>
    where
        G: GridTopology + Sync + ?Sized,
    {
        validate_topology(grid)?;
        let n = grid.node_count();
        surface.check_len(n)?;
        let z = surface.elevation();
        for (node, &zi) in z.iter().enumerate() {
            if !zi.is_finite() && !grid.boundary_status(node).is_closed() {
                return Err(TalusError::NonFiniteElevation { node });
            }
        }

        self.graph.reset(n);

        #[cfg(feature = "threading")]
        let routes: Vec<Route> = (0..n).into_par_iter().map(|i| steepest_route(grid, z, i)).collect();
        #[cfg(not(feature = "threading"))]
        let routes: Vec<Route> = (0..n).map(|i| steepest_route(grid, z, i)).collect();

        for (node, &(receiver, slope, length)) in routes.iter().enumerate() {
            self.graph.set_route(node, receiver, slope, length);
        }

        self.graph.rebuild_order()?;
        self.graph.stamp(surface.revision());

        if log::log_enabled!(log::Level::Debug) {
            let core = (0..n).filter(|&i| grid.boundary_status(i).is_core()).count();
            let sinks = (0..n)
                .filter(|&i| grid.boundary_status(i).is_core() && self.graph.is_pit(i))
                .count();
            log::debug!("flow director: {n} nodes, {core} core, {sinks} core sinks");
        }

        Ok(&self.graph)
    }
}

/// Steepest downhill neighbour of `node`, or the node itself.
fn steepest_route<G>(grid: &G, z: &[f64], node: usize) -> Route
where
    G: GridTopology + ?Sized,
{
    let neighbors = grid.neighbors(node);
    let pit_length = neighbors
        .iter()
        .map(|nb| nb.length)
        .fold(f64::INFINITY, f64::min);
    let pit_length = if pit_length.is_finite() { pit_length } else { ISOLATED_NODE_LENGTH };

    if !grid.boundary_status(node).is_core() {
        return (node, 0.0, pit_length);
    }

    let z0 = z[node];
    let mut best: Route = (node, 0.0, pit_length);
    for nb in neighbors {
        if grid.boundary_status(nb.node).is_closed() {
            continue;
        }
        let slope = (z0 - z[nb.node]) / nb.length;
        if slope > best.1 {
            best = (nb.node, slope, nb.length);
        }
    }
    best
}
