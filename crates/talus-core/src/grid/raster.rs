//! Regular raster grid, row-major, row 0 at the bottom.
use serde::{Deserialize, Serialize};

use super::{BoundaryStatus, GridTopology, Neighbor};

/// Which neighbours a raster node is linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Orthogonal links only.
    #[default]
    D4,
    /// Orthogonal plus diagonal links (length `√2 · spacing`).
    D8,
}

/// Side of a raster grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Right,
    Top,
    Left,
    Bottom,
}

/// Neighbour offsets as (d_row, d_col): E, N, W, S, then NE, NW, SW, SE.
const OFFSETS: [(isize, isize); 8] = [
    (0, 1), (1, 0), (0, -1), (-1, 0),
    (1, 1), (1, -1), (-1, -1), (-1, 1),
];

/// A `rows × cols` raster with uniform `spacing`.
///
/// Perimeter nodes start as [`BoundaryStatus::FixedValue`], interior nodes as
/// [`BoundaryStatus::Core`].
#[derive(Debug, Clone)]
pub struct RasterGrid {
    pub rows: usize,
    pub cols: usize,
    pub spacing: f64,
    pub connectivity: Connectivity,
    status: Vec<BoundaryStatus>,
    /// CSR adjacency: neighbours of node `i` are `links[offsets[i]..offsets[i + 1]]`.
    offsets: Vec<usize>,
    links: Vec<Neighbor>,
}

impl RasterGrid {
    pub fn new(rows: usize, cols: usize, spacing: f64, connectivity: Connectivity) -> Self {
        let n = rows * cols;
        let n_dirs = match connectivity {
            Connectivity::D4 => 4,
            Connectivity::D8 => 8,
        };
        let diag = spacing * std::f64::consts::SQRT_2;

        let mut offsets = Vec::with_capacity(n + 1);
        let mut links = Vec::with_capacity(n * n_dirs);
        offsets.push(0);
        for r in 0..rows {
            for c in 0..cols {
                for (k, &(dr, dc)) in OFFSETS[..n_dirs].iter().enumerate() {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    links.push(Neighbor {
                        node: nr as usize * cols + nc as usize,
                        length: if k < 4 { spacing } else { diag },
                    });
                }
                offsets.push(links.len());
            }
        }

        let mut status = vec![BoundaryStatus::Core; n];
        for r in 0..rows {
            for c in 0..cols {
                if r == 0 || c == 0 || r + 1 == rows || c + 1 == cols {
                    status[r * cols + c] = BoundaryStatus::FixedValue;
                }
            }
        }

        Self { rows, cols, spacing, connectivity, status, offsets, links }
    }

    #[inline]
    pub fn node_at(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    pub fn row_col(&self, node: usize) -> (usize, usize) {
        (node / self.cols, node % self.cols)
    }

    pub fn set_status(&mut self, node: usize, status: BoundaryStatus) {
        self.status[node] = status;
    }

    /// Nodes along one side of the grid, corners included.
    pub fn edge_nodes(&self, edge: Edge) -> Vec<usize> {
        if self.rows == 0 || self.cols == 0 {
            return Vec::new();
        }
        match edge {
            Edge::Right => (0..self.rows).map(|r| self.node_at(r, self.cols - 1)).collect(),
            Edge::Left => (0..self.rows).map(|r| self.node_at(r, 0)).collect(),
            Edge::Top => (0..self.cols).map(|c| self.node_at(self.rows - 1, c)).collect(),
            Edge::Bottom => (0..self.cols).map(|c| self.node_at(0, c)).collect(),
        }
    }

    pub fn set_edge_status(&mut self, edge: Edge, status: BoundaryStatus) {
        for node in self.edge_nodes(edge) {
            self.status[node] = status;
        }
    }

    /// Close the selected sides; the others keep their current status.
    pub fn set_closed_boundaries_at_grid_edges(
        &mut self,
        right: bool,
        top: bool,
        left: bool,
        bottom: bool,
    ) {
        for (edge, close) in [
            (Edge::Right, right),
            (Edge::Top, top),
            (Edge::Left, left),
            (Edge::Bottom, bottom),
        ] {
            if close {
                self.set_edge_status(edge, BoundaryStatus::Closed);
            }
        }
    }

    /// x coordinate (column direction) of a node.
    pub fn x_of_node(&self, node: usize) -> f64 {
        (node % self.cols) as f64 * self.spacing
    }
}

impl GridTopology for RasterGrid {
    fn node_count(&self) -> usize {
        self.rows * self.cols
    }

    fn link_count(&self) -> usize {
        self.links.len() / 2
    }

    #[inline]
    fn neighbors(&self, node: usize) -> &[Neighbor] {
        &self.links[self.offsets[node]..self.offsets[node + 1]]
    }

    #[inline]
    fn boundary_status(&self, node: usize) -> BoundaryStatus {
        self.status[node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_raster_has_no_edges() {
        for (rows, cols) in [(0, 5), (4, 0), (0, 0)] {
            let mut g = RasterGrid::new(rows, cols, 1.0, Connectivity::D8);
            assert_eq!(g.node_count(), 0);
            assert!(g.edge_nodes(Edge::Right).is_empty());
            assert!(g.edge_nodes(Edge::Top).is_empty());
            g.set_closed_boundaries_at_grid_edges(true, true, true, true);
            assert_eq!(crate::grid::validate_topology(&g), Err(crate::error::TalusError::EmptyGrid));
        }
    }

    #[test]
    fn link_counts_match_raster_formula() {
        let g4 = RasterGrid::new(3, 4, 1.0, Connectivity::D4);
        assert_eq!(g4.link_count(), 3 * 3 + 4 * 2);
        let g8 = RasterGrid::new(3, 4, 1.0, Connectivity::D8);
        assert_eq!(g8.link_count(), 3 * 3 + 4 * 2 + 2 * 2 * 3);
    }

    #[test]
    fn interior_node_neighbour_order_is_e_n_w_s() {
        let g = RasterGrid::new(3, 3, 2.0, Connectivity::D4);
        let centre = g.node_at(1, 1);
        let nbrs: Vec<usize> = g.neighbors(centre).iter().map(|n| n.node).collect();
        assert_eq!(nbrs, vec![g.node_at(1, 2), g.node_at(2, 1), g.node_at(1, 0), g.node_at(0, 1)]);
        assert!(g.neighbors(centre).iter().all(|n| n.length == 2.0));
    }

    #[test]
    fn diagonal_links_are_longer() {
        let g = RasterGrid::new(3, 3, 1.0, Connectivity::D8);
        let centre = g.node_at(1, 1);
        let lens: Vec<f64> = g.neighbors(centre).iter().map(|n| n.length).collect();
        assert_eq!(lens.len(), 8);
        assert!((lens[4] - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn perimeter_is_open_and_interior_is_core() {
        let g = RasterGrid::new(4, 5, 1.0, Connectivity::D4);
        assert_eq!(g.core_nodes().len(), 2 * 3);
        assert_eq!(g.boundary_status(0), BoundaryStatus::FixedValue);
        assert_eq!(g.boundary_status(g.node_at(1, 1)), BoundaryStatus::Core);
    }

    #[test]
    fn closing_edges_leaves_other_sides_open() {
        let mut g = RasterGrid::new(4, 4, 1.0, Connectivity::D4);
        g.set_closed_boundaries_at_grid_edges(false, true, false, true);
        assert_eq!(g.boundary_status(g.node_at(3, 2)), BoundaryStatus::Closed);
        assert_eq!(g.boundary_status(g.node_at(0, 1)), BoundaryStatus::Closed);
        assert_eq!(g.boundary_status(g.node_at(1, 0)), BoundaryStatus::FixedValue);
        assert_eq!(g.boundary_status(g.node_at(2, 3)), BoundaryStatus::FixedValue);
    }
}
