//! Grid topology consumed by the flow director and the hillslope components.
//!
//! The core only needs three queries per node: its neighbours (with link
//! lengths), its boundary status, and the node count. `RasterGrid` and
//! `NetworkGrid` are the two adapters shipped with the crate; anything else
//! (hex meshes, Voronoi tessellations) plugs in by implementing
//! [`GridTopology`].
pub mod network;
pub mod raster;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TalusError};

pub use network::NetworkGrid;
pub use raster::{Connectivity, Edge, RasterGrid};

/// Boundary condition of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryStatus {
    /// Interior node; the only kind whose elevation the components change.
    #[default]
    Core,
    /// Open boundary held at a fixed elevation. Acts as an outlet.
    FixedValue,
    /// Open boundary with a prescribed gradient. Acts as an outlet here.
    FixedGradient,
    /// No-flux boundary: never sends or receives flow.
    Closed,
}

impl BoundaryStatus {
    #[inline]
    pub fn is_core(self) -> bool {
        self == BoundaryStatus::Core
    }

    #[inline]
    pub fn is_closed(self) -> bool {
        self == BoundaryStatus::Closed
    }

    /// Open boundaries swallow whatever flux reaches them.
    #[inline]
    pub fn is_open_boundary(self) -> bool {
        matches!(self, BoundaryStatus::FixedValue | BoundaryStatus::FixedGradient)
    }
}

/// One end of a link as seen from the node that owns the neighbour list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub node: usize,
    /// Centre-to-centre distance, same units as the grid spacing.
    pub length: f64,
}

/// Node/link topology of a grid.
///
/// `neighbors` must return the same order on every call; the flow director's
/// tie-break depends on it.
pub trait GridTopology {
    fn node_count(&self) -> usize;

    /// Number of undirected links.
    fn link_count(&self) -> usize;

    fn neighbors(&self, node: usize) -> &[Neighbor];

    fn boundary_status(&self, node: usize) -> BoundaryStatus;

    /// Indices of all core nodes, in ascending order.
    fn core_nodes(&self) -> Vec<usize> {
        (0..self.node_count())
            .filter(|&n| self.boundary_status(n).is_core())
            .collect()
    }
}

/// Reject grids the flow director cannot route over.
pub fn validate_topology<G: GridTopology + ?Sized>(grid: &G) -> Result<()> {
    let nodes = grid.node_count();
    if nodes == 0 {
        return Err(TalusError::EmptyGrid);
    }
    if grid.link_count() == 0 {
        return Err(TalusError::NoLinks { nodes });
    }
    for node in 0..nodes {
        for nb in grid.neighbors(node) {
            if nb.node >= nodes {
                return Err(TalusError::NeighborOutOfRange { node, neighbor: nb.node, nodes });
            }
            if nb.node == node {
                return Err(TalusError::SelfLink { node });
            }
            if !(nb.length.is_finite() && nb.length > 0.0) {
                return Err(TalusError::InvalidLinkLength {
                    node,
                    neighbor: nb.node,
                    length: nb.length,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_passes_validation() {
        let grid = RasterGrid::new(4, 5, 1.0, Connectivity::D4);
        assert!(validate_topology(&grid).is_ok());
    }

    #[test]
    fn isolated_nodes_have_no_links() {
        let grid = NetworkGrid::new(3);
        assert_eq!(validate_topology(&grid), Err(TalusError::NoLinks { nodes: 3 }));
    }

    #[test]
    fn empty_grid_is_rejected() {
        let grid = NetworkGrid::new(0);
        assert_eq!(validate_topology(&grid), Err(TalusError::EmptyGrid));
    }

    /// Two nodes with a hand-written neighbour table.
    struct FixedTopology {
        neighbors: [Vec<Neighbor>; 2],
    }

    impl GridTopology for FixedTopology {
        fn node_count(&self) -> usize {
            2
        }

        fn link_count(&self) -> usize {
            1
        }

        fn neighbors(&self, node: usize) -> &[Neighbor] {
            &self.neighbors[node]
        }

        fn boundary_status(&self, _node: usize) -> BoundaryStatus {
            BoundaryStatus::Core
        }
    }

    fn fixed(from_0: Neighbor) -> FixedTopology {
        FixedTopology { neighbors: [vec![from_0], vec![Neighbor { node: 0, length: 1.0 }]] }
    }

    #[test]
    fn bad_neighbour_tables_are_rejected() {
        assert!(validate_topology(&fixed(Neighbor { node: 1, length: 1.0 })).is_ok());
        assert_eq!(
            validate_topology(&fixed(Neighbor { node: 7, length: 1.0 })),
            Err(TalusError::NeighborOutOfRange { node: 0, neighbor: 7, nodes: 2 })
        );
        assert_eq!(
            validate_topology(&fixed(Neighbor { node: 1, length: 0.0 })),
            Err(TalusError::InvalidLinkLength { node: 0, neighbor: 1, length: 0.0 })
        );
        assert!(matches!(
            validate_topology(&fixed(Neighbor { node: 1, length: f64::NAN })),
            Err(TalusError::InvalidLinkLength { node: 0, .. })
        ));
        assert_eq!(
            validate_topology(&fixed(Neighbor { node: 0, length: 1.0 })),
            Err(TalusError::SelfLink { node: 0 })
        );
    }

    #[test]
    fn status_serializes_kebab_case() {
        let s = serde_json::to_string(&BoundaryStatus::FixedValue).unwrap();
        assert_eq!(s, "\"fixed-value\"");
    }
}
