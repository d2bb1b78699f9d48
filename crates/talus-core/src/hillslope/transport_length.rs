//! Transport-length hillslope diffusion (Carretier et al., 2016).
//!
//! Each core node detaches `ε = κ·S` and hands its sediment to its receiver.
//! A fraction `dx / L` of the flux leaving a node is redeposited there, with
//! transport length
//!
//! ```text
//!   L = dx / (1 − (S / S_c)²)      for S < S_c
//!   L = ∞                          for S ≥ S_c   (pure bypass)
//! ```
//!
//! Nodes are swept upstream-to-downstream (reverse of the flow graph's
//! receivers-first stack), so a node's incoming flux is complete before its
//! own deposition is computed. Flux is per unit width throughout; multiply
//! by the receiver link length to move between rate and volume.
use crate::config::DiffuserParams;
use crate::error::{require_positive, Result, TalusError};
use crate::flow::FlowGraph;
use crate::grid::GridTopology;
use crate::surface::Surface;

/// Distance sediment travels before redeposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportLength {
    Finite(f64),
    /// Slope at or above critical: nothing is redeposited.
    Bypass,
}

impl TransportLength {
    /// `S ≥ S_c` is an explicit branch rather than a division by ≤ 0.
    pub fn from_slope(slope: f64, critical_slope: f64, dx: f64) -> Self {
        if slope >= critical_slope {
            return TransportLength::Bypass;
        }
        let ratio = slope / critical_slope;
        TransportLength::Finite(dx / (1.0 - ratio * ratio))
    }

    pub fn is_bypass(self) -> bool {
        matches!(self, TransportLength::Bypass)
    }
}

/// Totals for one diffusion step. Volumes are per unit width.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiffusionReport {
    /// Material detached from core nodes.
    pub eroded: f64,
    /// Material redeposited on core nodes.
    pub deposited: f64,
    /// Material delivered to open boundary nodes.
    pub boundary_outflow: f64,
    /// Core nodes on the bypass branch.
    pub bypass_nodes: usize,
    /// Largest absolute elevation change.
    pub max_abs_dz: f64,
}

impl DiffusionReport {
    /// `deposited − eroded + boundary_outflow`; zero up to rounding.
    pub fn mass_balance_residual(&self) -> f64 {
        self.deposited - self.eroded + self.boundary_outflow
    }
}

/// Transport-length hillslope diffuser.
///
/// Per-node output fields from the last step stay readable until the next
/// one: erosion rate, deposition rate, transport length, incoming flux,
/// outgoing flux (after local erosion) and the flux handed downstream.
#[derive(Debug, Clone)]
pub struct TransportLengthDiffuser {
    params: DiffuserParams,
    erosion_rate: Vec<f64>,
    deposition_rate: Vec<f64>,
    transport_length: Vec<Option<TransportLength>>,
    flux_in: Vec<f64>,
    flux_out: Vec<f64>,
    transfer: Vec<f64>,
    delta_z: Vec<f64>,
}

impl TransportLengthDiffuser {
    pub fn new(params: DiffuserParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            erosion_rate: Vec::new(),
            deposition_rate: Vec::new(),
            transport_length: Vec::new(),
            flux_in: Vec::new(),
            flux_out: Vec::new(),
            transfer: Vec::new(),
            delta_z: Vec::new(),
        })
    }

    pub fn params(&self) -> &DiffuserParams {
        &self.params
    }

    pub fn erosion_rate(&self) -> &[f64] {
        &self.erosion_rate
    }

    pub fn deposition_rate(&self) -> &[f64] {
        &self.deposition_rate
    }

    /// Transport length of each core node; `None` for boundary and closed
    /// nodes, which never detach or redeposit.
    pub fn transport_length(&self) -> &[Option<TransportLength>] {
        &self.transport_length
    }

    /// Flux entering each node from upstream.
    pub fn flux_in(&self) -> &[f64] {
        &self.flux_in
    }

    /// Incoming flux plus locally detached material, before redeposition.
    pub fn flux_out(&self) -> &[f64] {
        &self.flux_out
    }

    /// Flux handed to each node's receiver.
    pub fn transfer(&self) -> &[f64] {
        &self.transfer
    }

    /// Elevation change applied to each node in the last step.
    pub fn delta_z(&self) -> &[f64] {
        &self.delta_z
    }

    /// Advance `surface` by `dt`.
    ///
    /// `flow` must have been routed by the flow director on the current
    /// surface revision; a graph whose slopes were only refreshed by the
    /// threshold eroder is rejected. Nothing is written to the surface unless the whole sweep
    /// succeeds.
    pub fn run_one_step<G>(
        &mut self,
        grid: &G,
        surface: &mut Surface,
        flow: &FlowGraph,
        dt: f64,
    ) -> Result<DiffusionReport>
    where
        G: GridTopology + ?Sized,
    {
        let dt = require_positive("dt", dt)?;
        let n = grid.node_count();
        surface.check_len(n)?;
        flow.ensure_current(surface)?;

        self.reset(n);
        let kappa = self.params.erodibility;
        let s_c = self.params.critical_slope;
        let mut report = DiffusionReport::default();

        for &node in flow.upstream_order().iter().rev() {
            let status = grid.boundary_status(node);
            if status.is_closed() {
                continue;
            }
            if status.is_open_boundary() {
                report.boundary_outflow += self.flux_in[node] * dt;
                continue;
            }

            let receiver = flow.receiver(node);
            let has_outlet = receiver != node && !grid.boundary_status(receiver).is_closed();
            let slope = flow.slope(node);
            let dx = flow.link_length(node);

            let erosion = kappa * slope;
            let q_out = self.flux_in[node] + erosion * dx;
            let length = TransportLength::from_slope(slope, s_c, dx);

            let (deposition, handed) = if !has_outlet {
                // Nowhere to go: everything that arrives or detaches stays.
                (q_out / dx, 0.0)
            } else {
                match length {
                    TransportLength::Finite(l) => {
                        let dep = q_out / l;
                        (dep, (q_out - dep * dx).max(0.0))
                    }
                    TransportLength::Bypass => {
                        report.bypass_nodes += 1;
                        (0.0, q_out)
                    }
                }
            };

            self.erosion_rate[node] = erosion;
            self.deposition_rate[node] = deposition;
            self.transport_length[node] = Some(length);
            self.flux_out[node] = q_out;
            self.transfer[node] = handed;
            self.delta_z[node] = dt * (deposition - erosion);
            if has_outlet {
                self.flux_in[receiver] += handed;
            }

            report.eroded += erosion * dx * dt;
            report.deposited += deposition * dx * dt;
        }

        // Validate before mutating.
        let z = surface.elevation();
        for (node, &dz) in self.delta_z.iter().enumerate() {
            if !(z[node] + dz).is_finite() {
                return Err(TalusError::NonFiniteElevation { node });
            }
        }

        for node in 0..n {
            let dz = self.delta_z[node];
            if dz != 0.0 {
                let z_new = surface.elevation()[node] + dz;
                surface.set_node_elevation(node, z_new);
                report.max_abs_dz = report.max_abs_dz.max(dz.abs());
            }
        }

        log::debug!(
            "transport-length diffuser: eroded {:.4e}, deposited {:.4e}, outflow {:.4e}, {} bypass nodes",
            report.eroded,
            report.deposited,
            report.boundary_outflow,
            report.bypass_nodes,
        );

        Ok(report)
    }

    fn reset(&mut self, n: usize) {
        for buf in [
            &mut self.erosion_rate,
            &mut self.deposition_rate,
            &mut self.flux_in,
            &mut self.flux_out,
            &mut self.transfer,
            &mut self.delta_z,
        ] {
            buf.clear();
            buf.resize(n, 0.0);
        }
        self.transport_length.clear();
        self.transport_length.resize(n, None);
    }
}
