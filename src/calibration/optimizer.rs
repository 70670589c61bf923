// src/calibration/optimizer.rs
//! Box-constrained global minimisation.
//!
//! # Differential Evolution
//!
//! Storn and Price (1997), `best1bin` variant:
//! ```text
//! b' = x_best + F·(x_r0 - x_r1)          F ~ U[F_lo, F_hi) per generation
//! trial_d = b'_d  if U_d < CR or d = d_fill,  else x_i,d
//! ```
//! The population lives in the unit cube and is mapped onto the bounds for
//! every evaluation. Trial components that leave the cube are redrawn
//! uniformly. The population is initialised by Latin hypercube sampling.
//!
//! Stopping rule: the run converges once the population energies satisfy
//! ```text
//! std(E) <= atol + tol·|mean(E)|
//! ```
//! and fails if `max_generations` is reached first.
//!
//! # Parallel Evaluation
//!
//! All trials of a generation are built first and then evaluated together on
//! a rayon pool. Member `j` of generation `g` receives substream `j` of child
//! factory `g`, so results do not depend on the number of workers.

use crate::error::{JumpError, JumpResult};
use crate::rng::RngFactory;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Box constraints `lower <= x <= upper`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxConstraints {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl BoxConstraints {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> JumpResult<Self> {
        if lower.is_empty() || lower.len() != upper.len() {
            return Err(JumpError::InvalidConfiguration {
                field: "bounds".to_string(),
                reason: "constraints require same non-zero lower/upper dimensions".to_string(),
            });
        }
        for i in 0..lower.len() {
            if !lower[i].is_finite() || !upper[i].is_finite() || lower[i] > upper[i] {
                return Err(JumpError::InvalidConfiguration {
                    field: "bounds".to_string(),
                    reason: format!("invalid bound at index {i}: [{}, {}]", lower[i], upper[i]),
                });
            }
        }
        Ok(Self { lower, upper })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, v)| v.clamp(self.lower[i], self.upper[i]))
            .collect()
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dimension()
            && x
                .iter()
                .enumerate()
                .all(|(i, &v)| v >= self.lower[i] && v <= self.upper[i])
    }

    fn from_unit(&self, u: &[f64]) -> Vec<f64> {
        u.iter()
            .enumerate()
            .map(|(i, &ui)| self.lower[i] + ui * (self.upper[i] - self.lower[i]))
            .collect()
    }

    fn to_unit(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, &xi)| {
                let width = self.upper[i] - self.lower[i];
                if width > 0.0 {
                    (xi - self.lower[i]) / width
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// Why an optimizer run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Population energies met the tolerance
    Converged,
    /// Generation cap reached first
    MaxIterations,
}

/// Outcome of one optimizer run
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisationResult {
    pub x: Vec<f64>,
    pub objective: f64,
    pub generations: usize,
    pub evaluations: usize,
    pub converged: bool,
    pub reason: TerminationReason,
}

/// Global minimiser of a box-constrained, possibly noisy objective.
///
/// The objective receives the candidate vector and a random stream owned by
/// that evaluation; it must not share mutable state between calls.
pub trait GlobalMinimizer: Sync {
    fn minimize<F>(
        &self,
        bounds: &BoxConstraints,
        initial: Option<&[f64]>,
        rng_factory: &RngFactory,
        objective: F,
    ) -> JumpResult<OptimisationResult>
    where
        F: Fn(&[f64], &mut StdRng) -> f64 + Sync;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentialEvolutionOptions {
    /// Population size = multiplier × dimension
    pub population_multiplier: usize,
    pub max_generations: usize,
    /// Relative tolerance on the spread of population energies
    pub tolerance: f64,
    pub absolute_tolerance: f64,
    /// Dithering range for the mutation factor F
    pub mutation: (f64, f64),
    /// Crossover probability CR
    pub recombination: f64,
    /// Worker threads for population evaluation; `None` uses every CPU
    pub workers: Option<usize>,
}

impl Default for DifferentialEvolutionOptions {
    fn default() -> Self {
        Self {
            population_multiplier: 50,
            max_generations: 1000,
            tolerance: 1e-2,
            absolute_tolerance: 0.0,
            mutation: (0.5, 1.0),
            recombination: 0.7,
            workers: None,
        }
    }
}

impl DifferentialEvolutionOptions {
    pub fn validate(&self) -> JumpResult<()> {
        let invalid = |field: &str, reason: &str| JumpError::InvalidConfiguration {
            field: field.to_string(),
            reason: reason.to_string(),
        };
        if self.population_multiplier == 0 {
            return Err(invalid("population_multiplier", "must be greater than 0"));
        }
        if self.max_generations == 0 {
            return Err(invalid("max_generations", "must be greater than 0"));
        }
        if !(self.tolerance >= 0.0) || !(self.absolute_tolerance >= 0.0) {
            return Err(invalid("tolerance", "must be non-negative"));
        }
        let (lo, hi) = self.mutation;
        if !(0.0..=2.0).contains(&lo) || !(0.0..=2.0).contains(&hi) || lo > hi {
            return Err(invalid("mutation", "must satisfy 0 <= lo <= hi <= 2"));
        }
        if !(0.0..=1.0).contains(&self.recombination) {
            return Err(invalid("recombination", "must be in [0, 1]"));
        }
        if self.workers == Some(0) {
            return Err(invalid("workers", "must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DifferentialEvolution {
    pub options: DifferentialEvolutionOptions,
}

impl DifferentialEvolution {
    pub fn new(options: DifferentialEvolutionOptions) -> Self {
        Self { options }
    }

    fn best1bin(
        &self,
        candidate: usize,
        best: usize,
        population: &[Vec<f64>],
        scale: f64,
        rng: &mut StdRng,
    ) -> Vec<f64> {
        let dim = population[candidate].len();
        let mut idxs: Vec<usize> = (0..population.len()).filter(|&k| k != candidate).collect();
        idxs.shuffle(rng);
        let (r0, r1) = (idxs[0], idxs[1]);

        let fill_point = rng.gen_range(0..dim);
        let mut trial = population[candidate].clone();
        for d in 0..dim {
            let p: f64 = rng.gen();
            if p < self.options.recombination || d == fill_point {
                trial[d] = population[best][d] + scale * (population[r0][d] - population[r1][d]);
            }
        }
        for v in trial.iter_mut() {
            if !(0.0..=1.0).contains(v) {
                *v = rng.gen();
            }
        }
        trial
    }
}

impl GlobalMinimizer for DifferentialEvolution {
    fn minimize<F>(
        &self,
        bounds: &BoxConstraints,
        initial: Option<&[f64]>,
        rng_factory: &RngFactory,
        objective: F,
    ) -> JumpResult<OptimisationResult>
    where
        F: Fn(&[f64], &mut StdRng) -> f64 + Sync,
    {
        let opts = &self.options;
        opts.validate()?;
        let dim = bounds.dimension();
        let pop_size = (opts.population_multiplier * dim).max(5);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.workers.unwrap_or_else(num_cpus::get))
            .build()
            .map_err(|e| JumpError::CalibrationError {
                reason: format!("could not build worker pool: {e}"),
            })?;

        let mut control = rng_factory.substream(0);
        let mut population = latin_hypercube(pop_size, dim, &mut control);
        if let Some(x0) = initial {
            if x0.len() != dim {
                return Err(JumpError::InvalidConfiguration {
                    field: "initial".to_string(),
                    reason: format!("expected {dim} coordinates, got {}", x0.len()),
                });
            }
            population[0] = bounds.to_unit(&bounds.clamp(x0));
        }

        let mut energies =
            pool.install(|| evaluate(&population, bounds, &rng_factory.child(0), &objective));
        let mut evaluations = pop_size;
        let mut best = argmin(&energies);
        let mut generations = 0;
        let mut converged = false;

        for generation in 1..=opts.max_generations {
            generations = generation;
            let (lo, hi) = opts.mutation;
            let scale = if hi > lo { control.gen_range(lo..hi) } else { lo };

            let trials: Vec<Vec<f64>> = (0..pop_size)
                .map(|i| self.best1bin(i, best, &population, scale, &mut control))
                .collect();
            let trial_energies = pool.install(|| {
                evaluate(&trials, bounds, &rng_factory.child(generation as u64), &objective)
            });
            evaluations += pop_size;

            for (i, (trial, energy)) in trials.into_iter().zip(trial_energies).enumerate() {
                if energy < energies[i] {
                    population[i] = trial;
                    energies[i] = energy;
                }
            }
            best = argmin(&energies);

            debug!(generation, best = energies[best], "differential evolution generation");

            if population_converged(&energies, opts.tolerance, opts.absolute_tolerance) {
                converged = true;
                break;
            }
        }

        Ok(OptimisationResult {
            x: bounds.from_unit(&population[best]),
            objective: energies[best],
            generations,
            evaluations,
            converged,
            reason: if converged {
                TerminationReason::Converged
            } else {
                TerminationReason::MaxIterations
            },
        })
    }
}

fn latin_hypercube(n: usize, dim: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut population = vec![vec![0.0; dim]; n];
    let mut order: Vec<usize> = (0..n).collect();
    for d in 0..dim {
        order.shuffle(rng);
        for (member, &segment) in population.iter_mut().zip(order.iter()) {
            member[d] = (segment as f64 + rng.gen::<f64>()) / n as f64;
        }
    }
    population
}

fn evaluate<F>(
    members: &[Vec<f64>],
    bounds: &BoxConstraints,
    streams: &RngFactory,
    objective: &F,
) -> Vec<f64>
where
    F: Fn(&[f64], &mut StdRng) -> f64 + Sync,
{
    members
        .par_iter()
        .enumerate()
        .map(|(j, unit)| {
            let mut rng = streams.substream(j as u64);
            let energy = objective(&bounds.from_unit(unit), &mut rng);
            if energy.is_nan() {
                f64::INFINITY
            } else {
                energy
            }
        })
        .collect()
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(idx, _)| idx)
}

fn population_converged(energies: &[f64], tol: f64, atol: f64) -> bool {
    if energies.iter().any(|e| !e.is_finite()) {
        return false;
    }
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let std = (energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n).sqrt();
    std <= atol + tol * mean.abs()
}
