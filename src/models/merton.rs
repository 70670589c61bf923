// src/models/merton.rs
//! Merton Jump-Diffusion Path Simulation
//!
//! # Mathematical Framework
//!
//! Log price evolves over a step of length Δt as
//! ```text
//! ΔX = (r - λm - σ²/2)Δt + σ√Δt Z + N·J
//! m  = exp(μ_J + σ_J²/2) - 1
//! ```
//! with Z ~ N(0,1), N ~ Poisson(λΔt) and J ~ N(μ_J, σ_J). The compensator
//! `λm` keeps the discounted price a martingale under drift `r`.
//!
//! # Jump Aggregation
//!
//! By default all jumps inside a step are collapsed into one scaled draw
//! `N·J`, which has variance `N²σ_J²` instead of `Nσ_J²`. This matches the
//! historical calibration behaviour and is what the calibrator uses.
//! [`JumpAggregation::Exact`] draws the sum of `N` independent jumps instead.
//!
//! # Batching
//!
//! Diffusion shocks, jump counts and jump sizes are each drawn as one
//! `(paths × steps)` matrix, summed along the time axis and exponentiated.

use crate::models::params::ModelParameters;
use crate::rng;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Lowest price a simulated path may take
pub const PRICE_FLOOR: f64 = 1e-8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JumpAggregation {
    /// One jump size scaled by the jump count: `N·J`
    #[default]
    Scaled,
    /// Sum of `N` independent jump sizes: `Nμ_J + σ_J√N·Z`
    Exact,
}

/// Simulated price trajectories, rows = paths, columns = time steps `0..=N`
#[derive(Debug, Clone, PartialEq)]
pub struct PricePath {
    values: Array2<f64>,
}

impl PricePath {
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn num_paths(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_steps(&self) -> usize {
        self.values.ncols() - 1
    }

    pub fn initial_prices(&self) -> ArrayView1<'_, f64> {
        self.values.column(0)
    }

    pub fn terminal_prices(&self) -> ArrayView1<'_, f64> {
        self.values.column(self.values.ncols() - 1)
    }

    /// Per-step log returns `ln(S_{t+1} / S_t)`, shape `(paths, steps)`
    pub fn log_returns(&self) -> Array2<f64> {
        let cols = self.values.ncols();
        let next = self.values.slice(s![.., 1..]);
        let prev = self.values.slice(s![.., ..cols - 1]);
        (&next / &prev).mapv(f64::ln)
    }

    /// Log returns averaged across paths at each step; `None` without paths
    pub fn mean_log_returns(&self) -> Option<Array1<f64>> {
        self.log_returns().mean_axis(Axis(0))
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.values
    }
}

/// Batched simulator for the Merton jump-diffusion model
#[derive(Clone, Copy, Debug)]
pub struct PathSimulator {
    pub s0: f64,
    pub r: f64,
    pub params: ModelParameters,
    pub dt: f64,
    pub aggregation: JumpAggregation,
}

impl PathSimulator {
    pub fn new(s0: f64, r: f64, params: ModelParameters) -> Self {
        PathSimulator {
            s0,
            r,
            params,
            dt: 1.0,
            aggregation: JumpAggregation::Scaled,
        }
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_jump_aggregation(mut self, aggregation: JumpAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Simulate `num_paths` trajectories of `num_steps` steps.
    ///
    /// Never fails: invalid parameters (e.g. NaN volatility) show up as NaN
    /// entries, which the floor leaves untouched so callers can detect them.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        num_steps: usize,
        num_paths: usize,
        rng: &mut R,
    ) -> PricePath {
        let p = &self.params;
        let shape = (num_paths, num_steps);

        let m = p.jump_compensator();
        let drift = (self.r - p.lambda * m - 0.5 * p.sigma * p.sigma) * self.dt;
        let diffusion_scale = p.sigma * self.dt.sqrt();

        let dw: Array2<f64> = Array2::from_shape_fn(shape, |_| rng::get_normal_draw(rng));
        let jump_counts = draw_jump_counts(p.lambda * self.dt, shape, rng);
        let jump_shocks: Array2<f64> = Array2::from_shape_fn(shape, |_| rng::get_normal_draw(rng));

        let jumps = match self.aggregation {
            JumpAggregation::Scaled => {
                let (mu_j, sigma_j) = (p.mu_j, p.sigma_j);
                &jump_counts * &jump_shocks.mapv(|z| mu_j + sigma_j * z)
            }
            JumpAggregation::Exact => {
                let mut jumps = Array2::<f64>::zeros(shape);
                Zip::from(&mut jumps)
                    .and(&jump_counts)
                    .and(&jump_shocks)
                    .for_each(|j, &n, &z| *j = n * p.mu_j + p.sigma_j * n.sqrt() * z);
                jumps
            }
        };

        let mut log_increments = dw.mapv(|z| drift + diffusion_scale * z) + &jumps;
        for mut row in log_increments.rows_mut() {
            let mut cumulative = 0.0;
            for v in row.iter_mut() {
                cumulative += *v;
                *v = cumulative;
            }
        }

        let s0 = self.s0;
        let mut values = Array2::<f64>::zeros((num_paths, num_steps + 1));
        values.column_mut(0).fill(s0);
        values
            .slice_mut(s![.., 1..])
            .assign(&log_increments.mapv(|x| s0 * x.exp()));
        values.mapv_inplace(apply_floor);

        PricePath { values }
    }
}

/// Simulate jump-diffusion paths with explicit parameters and random source
#[allow(clippy::too_many_arguments)]
pub fn simulate_paths<R: Rng + ?Sized>(
    s0: f64,
    r: f64,
    params: &ModelParameters,
    num_steps: usize,
    num_paths: usize,
    dt: f64,
    rng: &mut R,
) -> PricePath {
    PathSimulator::new(s0, r, *params)
        .with_dt(dt)
        .simulate(num_steps, num_paths, rng)
}

// NaN compares false and is kept as NaN
fn apply_floor(v: f64) -> f64 {
    if v < PRICE_FLOOR {
        PRICE_FLOOR
    } else {
        v
    }
}

fn draw_jump_counts<R: Rng + ?Sized>(
    rate: f64,
    shape: (usize, usize),
    rng: &mut R,
) -> Array2<f64> {
    if rate == 0.0 {
        return Array2::zeros(shape);
    }
    match Poisson::new(rate) {
        Ok(poisson) => Array2::from_shape_fn(shape, |_| poisson.sample(rng)),
        Err(_) => Array2::from_elem(shape, f64::NAN),
    }
}
