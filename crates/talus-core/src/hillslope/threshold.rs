//! Slope-threshold eroder.
//!
//! Any core node whose slope to its receiver exceeds `S_c` is lowered to
//! exactly `z[receiver] + S_c · dx`. Nodes are processed receivers-first so
//! each clip is measured against an already-final receiver elevation; one
//! direct assignment per node, no relaxation loop.
//!
//! Unlike the transport-length diffuser this is a geometric clamp, not a
//! transport law: the material removed is discarded, not routed downstream.
use crate::config::ThresholdParams;
use crate::error::{Result, TalusError};
use crate::flow::FlowGraph;
use crate::grid::GridTopology;
use crate::surface::Surface;

/// Totals for one threshold pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThresholdReport {
    pub clipped_nodes: usize,
    /// Height removed, weighted by receiver link length (per unit width).
    pub removed: f64,
}

#[derive(Debug, Clone)]
pub struct ThresholdEroder {
    params: ThresholdParams,
}

impl ThresholdEroder {
    pub fn new(params: ThresholdParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ThresholdParams {
        &self.params
    }

    /// Clip every over-steep receiver link of `surface`.
    ///
    /// `flow` must have been routed on, or had its slopes refreshed against,
    /// the current surface revision. The slopes of all visited nodes are
    /// rewritten against the clipped elevations, so an immediate second run
    /// changes nothing. Receivers stay downhill after clipping but may no
    /// longer be the steepest, so the routing stamp is left alone and the
    /// diffuser rejects the graph until the flow director runs again.
    pub fn run_one_step<G>(
        &mut self,
        grid: &G,
        surface: &mut Surface,
        flow: &mut FlowGraph,
    ) -> Result<ThresholdReport>
    where
        G: GridTopology + ?Sized,
    {
        let n = grid.node_count();
        surface.check_len(n)?;
        flow.ensure_slopes_current(surface)?;
        for (node, z) in surface.elevation().iter().enumerate() {
            if !z.is_finite() && !grid.boundary_status(node).is_closed() {
                return Err(TalusError::NonFiniteElevation { node });
            }
        }

        let s_c = self.params.critical_slope;
        let mut report = ThresholdReport::default();

        for k in 0..n {
            let node = flow.upstream_order()[k];
            if !grid.boundary_status(node).is_core() {
                continue;
            }
            let receiver = flow.receiver(node);
            if receiver == node {
                continue;
            }
            let dx = flow.link_length(node);
            let z_recv = surface.elevation()[receiver];
            let z = surface.elevation()[node];
            // Compare heights, not slopes, so a clipped node is exactly at
            // the cap on the next pass.
            let z_cap = z_recv + s_c * dx;

            if z > z_cap {
                let z_new = z_cap;
                surface.set_node_elevation(node, z_new);
                flow.set_slope(node, s_c);
                report.clipped_nodes += 1;
                report.removed += (z - z_new) * dx;
                log::trace!("threshold eroder: node {node} clipped {z:.4} -> {z_new:.4}");
            } else {
                flow.set_slope(node, ((z - z_recv) / dx).max(0.0));
            }
        }

        flow.stamp_slopes(surface.revision());
        log::debug!(
            "threshold eroder: clipped {} nodes, removed {:.4e}",
            report.clipped_nodes,
            report.removed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowDirector;
    use crate::grid::{Connectivity, RasterGrid};

    fn eroder(s_c: f64) -> ThresholdEroder {
        ThresholdEroder::new(ThresholdParams { critical_slope: s_c }).unwrap()
    }

    /// 5x5 raster: outer ring 0, inner ring 1, centre 10.
    fn make_peak() -> (RasterGrid, Surface) {
        let grid = RasterGrid::new(5, 5, 1.0, Connectivity::D4);
        let mut z = vec![0.0; 25];
        for r in 1..4 {
            for c in 1..4 {
                z[grid.node_at(r, c)] = 1.0;
            }
        }
        z[grid.node_at(2, 2)] = 10.0;
        (grid, Surface::from_elevation(z))
    }

    #[test]
    fn peak_clips_to_threshold_profile() {
        let (grid, mut surface) = make_peak();
        let mut fd = FlowDirector::new();
        let mut te = eroder(0.6);
        for _ in 0..2 {
            fd.run_one_step(&grid, &surface).unwrap();
            te.run_one_step(&grid, &mut surface, fd.graph_mut()).unwrap();
        }
        let z = surface.elevation();
        assert!((z[grid.node_at(2, 2)] - 1.2).abs() < 1e-12, "centre = {}", z[12]);
        for r in 1..4 {
            for c in 1..4 {
                if (r, c) != (2, 2) {
                    let v = z[grid.node_at(r, c)];
                    assert!((v - 0.6).abs() < 1e-12, "ring node ({r},{c}) = {v}");
                }
            }
        }
        assert_eq!(z[0], 0.0);
    }

    #[test]
    fn second_run_without_director_is_a_no_op() {
        let (grid, mut surface) = make_peak();
        let mut fd = FlowDirector::new();
        let mut te = eroder(0.6);
        fd.run_one_step(&grid, &surface).unwrap();
        let first = te.run_one_step(&grid, &mut surface, fd.graph_mut()).unwrap();
        assert!(first.clipped_nodes > 0);
        let after_first = surface.elevation().to_vec();
        let second = te.run_one_step(&grid, &mut surface, fd.graph_mut()).unwrap();
        assert_eq!(second.clipped_nodes, 0);
        assert_eq!(surface.elevation(), after_first.as_slice());
    }

    #[test]
    fn gentle_slope_unchanged() {
        let grid = RasterGrid::new(6, 6, 1.0, Connectivity::D4);
        let mut surface = Surface::from_elevation((0..36).map(|i| (i % 6) as f64 * 0.1).collect());
        let before = surface.elevation().to_vec();
        let mut fd = FlowDirector::new();
        fd.run_one_step(&grid, &surface).unwrap();
        let report = eroder(0.6).run_one_step(&grid, &mut surface, fd.graph_mut()).unwrap();
        assert_eq!(report.clipped_nodes, 0);
        assert_eq!(surface.elevation(), before.as_slice());
    }

    #[test]
    fn clipping_strips_soil_then_bedrock() {
        let grid = RasterGrid::new(3, 3, 1.0, Connectivity::D4);
        let mut z = vec![0.0; 9];
        z[4] = 3.0;
        let mut surface = Surface::from_elevation(z).with_soil(vec![0.5; 9]).unwrap();
        let mut fd = FlowDirector::new();
        fd.run_one_step(&grid, &surface).unwrap();
        eroder(1.0).run_one_step(&grid, &mut surface, fd.graph_mut()).unwrap();
        assert_eq!(surface.elevation()[4], 1.0);
        assert_eq!(surface.bedrock().unwrap()[4], 1.0);
        assert_eq!(surface.soil_depth().unwrap()[4], 0.0);
    }

    #[test]
    fn stale_graph_is_rejected() {
        let (grid, mut surface) = make_peak();
        let mut fd = FlowDirector::new();
        fd.run_one_step(&grid, &surface).unwrap();
        surface.uplift_node(12, 1.0);
        let err = eroder(0.6).run_one_step(&grid, &mut surface, fd.graph_mut()).unwrap_err();
        assert!(matches!(err, TalusError::StaleFlowGraph { .. }));
    }
}
