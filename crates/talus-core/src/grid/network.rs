//! Irregular node graph built from an explicit link list.
use super::{BoundaryStatus, GridTopology, Neighbor};
use crate::error::{Result, TalusError};

/// Nodes joined by explicitly listed links. Neighbour order is link
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct NetworkGrid {
    adjacency: Vec<Vec<Neighbor>>,
    status: Vec<BoundaryStatus>,
    n_links: usize,
}

impl NetworkGrid {
    /// `node_count` unlinked core nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); node_count],
            status: vec![BoundaryStatus::Core; node_count],
            n_links: 0,
        }
    }

    /// Build from `(a, b, length)` triples and a per-node status list.
    pub fn from_links(status: Vec<BoundaryStatus>, links: &[(usize, usize, f64)]) -> Result<Self> {
        let mut grid = Self::new(status.len());
        grid.status = status;
        for &(a, b, length) in links {
            grid.add_link(a, b, length)?;
        }
        Ok(grid)
    }

    /// Add an undirected link between `a` and `b`.
    pub fn add_link(&mut self, a: usize, b: usize, length: f64) -> Result<()> {
        let nodes = self.adjacency.len();
        for (node, neighbor) in [(a, b), (b, a)] {
            if neighbor >= nodes || node >= nodes {
                return Err(TalusError::NeighborOutOfRange { node, neighbor, nodes });
            }
        }
        if a == b {
            return Err(TalusError::SelfLink { node: a });
        }
        if !(length.is_finite() && length > 0.0) {
            return Err(TalusError::InvalidLinkLength { node: a, neighbor: b, length });
        }
        self.adjacency[a].push(Neighbor { node: b, length });
        self.adjacency[b].push(Neighbor { node: a, length });
        self.n_links += 1;
        Ok(())
    }

    pub fn set_status(&mut self, node: usize, status: BoundaryStatus) {
        self.status[node] = status;
    }
}

impl GridTopology for NetworkGrid {
    fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    fn link_count(&self) -> usize {
        self.n_links
    }

    fn neighbors(&self, node: usize) -> &[Neighbor] {
        &self.adjacency[node]
    }

    fn boundary_status(&self, node: usize) -> BoundaryStatus {
        self.status[node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_symmetric() {
        let mut g = NetworkGrid::new(3);
        g.add_link(0, 1, 2.0).unwrap();
        g.add_link(1, 2, 3.0).unwrap();
        assert_eq!(g.link_count(), 2);
        assert_eq!(g.neighbors(1), &[Neighbor { node: 0, length: 2.0 }, Neighbor { node: 2, length: 3.0 }]);
        assert_eq!(g.neighbors(2), &[Neighbor { node: 1, length: 3.0 }]);
    }

    #[test]
    fn bad_links_are_rejected() {
        let mut g = NetworkGrid::new(2);
        assert!(matches!(g.add_link(0, 5, 1.0), Err(TalusError::NeighborOutOfRange { .. })));
        assert!(matches!(g.add_link(0, 1, 0.0), Err(TalusError::InvalidLinkLength { .. })));
        assert_eq!(g.add_link(0, 0, 1.0), Err(TalusError::SelfLink { node: 0 }));
        assert_eq!(g.link_count(), 0);
        assert!(g.neighbors(0).is_empty());
    }
}
