//! Scenario runner: builds a raster, an initial surface and the component
//! sequence, then steps it.
//!
//! Per step:
//!   1. Flow director on the current surface.
//!   2. Transport-length diffusion (if configured).
//!   3. Flow director again, then threshold clipping (if configured).
//!   4. Uplift of core nodes.
//!
//! Uplift and boundary setup live here, outside the components.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{DiffuserParams, ThresholdParams};
use crate::error::{require_positive, Result, TalusError};
use crate::flow::FlowDirector;
use crate::grid::{BoundaryStatus, Connectivity, Edge, GridTopology, RasterGrid};
use crate::hillslope::{DiffusionReport, ThresholdEroder, ThresholdReport, TransportLengthDiffuser};
use crate::surface::Surface;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Starting topography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InitialTerrain {
    Flat { elevation: f64 },
    /// Flat west part, then a linear rise of `slope` toward the east.
    Ramp { flat_fraction: f64, slope: f64 },
    /// Centre node at `peak`, other core nodes at `ring`, boundary at 0.
    Peak { peak: f64, ring: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub rows: usize,
    pub cols: usize,
    pub spacing: f64,
    pub connectivity: Connectivity,
    /// Sides closed to flow; the rest stay fixed-value outlets.
    pub closed_edges: Vec<Edge>,
    pub terrain: InitialTerrain,
    /// Uniform random perturbation added to core nodes, in [0, amplitude).
    pub noise_amplitude: f64,
    pub seed: u64,
    /// Rock uplift rate applied to core nodes after each step.
    pub uplift_rate: f64,
    pub dt: f64,
    pub steps: usize,
    pub diffuser: Option<DiffuserParams>,
    pub threshold: Option<ThresholdParams>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::ramp_diffusion()
    }
}

impl ScenarioConfig {
    /// Flat west half, 45° east half, top and bottom closed.
    pub fn ramp_diffusion() -> Self {
        Self {
            rows: 10,
            cols: 40,
            spacing: 1.0,
            connectivity: Connectivity::D4,
            closed_edges: vec![Edge::Top, Edge::Bottom],
            terrain: InitialTerrain::Ramp { flat_fraction: 0.5, slope: 1.0 },
            noise_amplitude: 0.0,
            seed: 42,
            uplift_rate: 0.0,
            dt: 1.0,
            steps: 500,
            diffuser: Some(DiffuserParams { erodibility: 0.001, critical_slope: 1.2 }),
            threshold: None,
        }
    }

    /// 5×5 peak clipped by the threshold eroder.
    pub fn threshold_peak() -> Self {
        Self {
            rows: 5,
            cols: 5,
            spacing: 1.0,
            connectivity: Connectivity::D4,
            closed_edges: Vec::new(),
            terrain: InitialTerrain::Peak { peak: 10.0, ring: 1.0 },
            noise_amplitude: 0.0,
            seed: 42,
            uplift_rate: 0.0,
            dt: 1.0,
            steps: 2,
            diffuser: None,
            threshold: Some(ThresholdParams { critical_slope: 0.6 }),
        }
    }

    /// Uplifting block with noise, both components active.
    pub fn uplift_steady_state() -> Self {
        Self {
            rows: 20,
            cols: 20,
            spacing: 10.0,
            connectivity: Connectivity::D8,
            closed_edges: Vec::new(),
            terrain: InitialTerrain::Flat { elevation: 0.0 },
            noise_amplitude: 0.1,
            seed: 7,
            uplift_rate: 0.001,
            dt: 10.0,
            steps: 1000,
            diffuser: Some(DiffuserParams { erodibility: 0.001, critical_slope: 0.6 }),
            threshold: Some(ThresholdParams { critical_slope: 0.8 }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows < 3 {
            return Err(TalusError::InvalidParameter { name: "rows", value: self.rows as f64 });
        }
        if self.cols < 3 {
            return Err(TalusError::InvalidParameter { name: "cols", value: self.cols as f64 });
        }
        require_positive("spacing", self.spacing)?;
        require_positive("dt", self.dt)?;
        if !(self.noise_amplitude.is_finite() && self.noise_amplitude >= 0.0) {
            return Err(TalusError::InvalidParameter { name: "noise_amplitude", value: self.noise_amplitude });
        }
        if !self.uplift_rate.is_finite() {
            return Err(TalusError::InvalidParameter { name: "uplift_rate", value: self.uplift_rate });
        }
        if let Some(p) = &self.diffuser {
            p.validate()?;
        }
        if let Some(p) = &self.threshold {
            p.validate()?;
        }
        Ok(())
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct StepReport {
    pub diffusion: Option<DiffusionReport>,
    pub threshold: Option<ThresholdReport>,
    /// Uplifted volume per unit width.
    pub uplifted: f64,
}

/// Cumulative results of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub steps: usize,
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub mean_core_elevation: f64,
    pub eroded: f64,
    pub deposited: f64,
    pub boundary_outflow: f64,
    pub clipped_nodes: usize,
    pub threshold_removed: f64,
    pub uplifted: f64,
    /// Elevation along the middle row, west to east.
    pub profile: Vec<f64>,
}

// ── Runner ────────────────────────────────────────────────────────────────────

pub struct Scenario {
    config: ScenarioConfig,
    grid: RasterGrid,
    surface: Surface,
    director: FlowDirector,
    diffuser: Option<TransportLengthDiffuser>,
    eroder: Option<ThresholdEroder>,
    summary: ScenarioSummary,
}

impl Scenario {
    pub fn build(config: ScenarioConfig) -> Result<Self> {
        config.validate()?;
        let mut grid = RasterGrid::new(config.rows, config.cols, config.spacing, config.connectivity);
        for &edge in &config.closed_edges {
            grid.set_edge_status(edge, BoundaryStatus::Closed);
        }
        let surface = initial_surface(&grid, &config.terrain, config.noise_amplitude, config.seed);
        let diffuser = config.diffuser.map(TransportLengthDiffuser::new).transpose()?;
        let eroder = config.threshold.map(ThresholdEroder::new).transpose()?;
        Ok(Self {
            config,
            grid,
            surface,
            director: FlowDirector::new(),
            diffuser,
            eroder,
            summary: ScenarioSummary::default(),
        })
    }

    pub fn grid(&self) -> &RasterGrid {
        &self.grid
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn step(&mut self) -> Result<StepReport> {
        let mut report = StepReport::default();

        if let Some(diffuser) = self.diffuser.as_mut() {
            self.director.run_one_step(&self.grid, &self.surface)?;
            let d = diffuser.run_one_step(&self.grid, &mut self.surface, self.director.graph(), self.config.dt)?;
            self.summary.eroded += d.eroded;
            self.summary.deposited += d.deposited;
            self.summary.boundary_outflow += d.boundary_outflow;
            report.diffusion = Some(d);
        }

        if let Some(eroder) = self.eroder.as_mut() {
            self.director.run_one_step(&self.grid, &self.surface)?;
            let t = eroder.run_one_step(&self.grid, &mut self.surface, self.director.graph_mut())?;
            self.summary.clipped_nodes += t.clipped_nodes;
            self.summary.threshold_removed += t.removed;
            report.threshold = Some(t);
        }

        if self.config.uplift_rate != 0.0 {
            report.uplifted = apply_uplift(&self.grid, &mut self.surface, self.config.uplift_rate, self.config.dt);
            self.summary.uplifted += report.uplifted;
        }

        self.summary.steps += 1;
        Ok(report)
    }

    /// Run the configured number of steps and summarise.
    pub fn run(&mut self) -> Result<ScenarioSummary> {
        for step in 0..self.config.steps {
            self.step()?;
            if (step + 1) % 100 == 0 {
                log::info!("step {}/{}: max elevation {:.4}", step + 1, self.config.steps, self.surface.max_elevation());
            }
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> ScenarioSummary {
        let core = self.grid.core_nodes();
        let mid = self.grid.rows / 2;
        let profile = (0..self.grid.cols)
            .map(|c| self.surface.elevation()[self.grid.node_at(mid, c)])
            .collect();
        ScenarioSummary {
            min_elevation: self.surface.min_elevation(),
            max_elevation: self.surface.max_elevation(),
            mean_core_elevation: self.surface.mean_elevation_over(&core),
            profile,
            ..self.summary.clone()
        }
    }
}

/// Raise every core node by `rate · dt`. Returns the uplifted volume per
/// unit width (grid spacing as the node width).
pub fn apply_uplift(grid: &RasterGrid, surface: &mut Surface, rate: f64, dt: f64) -> f64 {
    let dz = rate * dt;
    let mut volume = 0.0;
    for node in 0..grid.node_count() {
        if grid.boundary_status(node).is_core() {
            surface.uplift_node(node, dz);
            volume += dz * grid.spacing;
        }
    }
    volume
}

fn initial_surface(grid: &RasterGrid, terrain: &InitialTerrain, noise: f64, seed: u64) -> Surface {
    let n = grid.node_count();
    let mut z = vec![0.0; n];
    match *terrain {
        InitialTerrain::Flat { elevation } => z.iter_mut().for_each(|v| *v = elevation),
        InitialTerrain::Ramp { flat_fraction, slope } => {
            let x_break = flat_fraction * (grid.cols - 1) as f64 * grid.spacing;
            for (node, v) in z.iter_mut().enumerate() {
                *v = (grid.x_of_node(node) - x_break).max(0.0) * slope;
            }
        }
        InitialTerrain::Peak { peak, ring } => {
            let (rc, cc) = (grid.rows / 2, grid.cols / 2);
            for (node, v) in z.iter_mut().enumerate() {
                if !grid.boundary_status(node).is_core() {
                    continue;
                }
                let (r, c) = grid.row_col(node);
                *v = if (r, c) == (rc, cc) { peak } else { ring };
            }
        }
    }
    if noise > 0.0 {
        let mut rng = StdRng::seed_from_u64(seed);
        for (node, v) in z.iter_mut().enumerate() {
            if grid.boundary_status(node).is_core() {
                *v += rng.gen::<f64>() * noise;
            }
        }
    }
    Surface::from_elevation(z)
}
