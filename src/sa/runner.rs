//! SA execution loop.

use super::config::SaConfig;
use super::types::SaProblem;
use rand::Rng;

/// Result of one Simulated Annealing pass.
#[derive(Debug, Clone)]
pub struct SaResult<S: Clone> {
    /// The best solution visited during the pass.
    pub best: S,

    /// Cost of the best solution.
    pub best_cost: f64,

    /// Total number of iterations (neighbor evaluations).
    pub iterations: usize,

    /// Final temperature when the pass stopped.
    pub final_temperature: f64,

    /// Number of accepted moves (including improvements).
    pub accepted_moves: usize,

    /// Number of improving moves.
    pub improving_moves: usize,
}

/// Executes the Simulated Annealing algorithm.
pub struct SaRunner;

impl SaRunner {
    /// Runs one pass starting from `start`.
    ///
    /// The returned `best` is never worse than `start`.
    ///
    /// # Panics
    /// Panics if the configuration is invalid.
    pub fn run_from<P: SaProblem, R: Rng>(
        problem: &P,
        start: P::Solution,
        config: &SaConfig,
        rng: &mut R,
    ) -> SaResult<P::Solution> {
        config.validate().expect("invalid SaConfig");

        let mut current = start;
        let mut current_cost = problem.cost(&current);
        let mut best = current.clone();
        let mut best_cost = current_cost;

        let mut temperature = config.initial_temperature;
        let mut total_iterations = 0usize;
        let mut accepted_moves = 0usize;
        let mut improving_moves = 0usize;

        while temperature > config.min_temperature {
            for _ in 0..config.iterations_per_temperature {
                if config.max_iterations > 0 && total_iterations >= config.max_iterations {
                    break;
                }

                let neighbor = problem.neighbor(&current, rng);
                let neighbor_cost = problem.cost(&neighbor);
                let delta = neighbor_cost - current_cost;

                // Metropolis acceptance criterion
                let accept = if delta < 0.0 {
                    improving_moves += 1;
                    true
                } else {
                    let probability = (-delta / temperature).exp();
                    rng.random_range(0.0..1.0) < probability
                };

                if accept {
                    current = neighbor;
                    current_cost = neighbor_cost;
                    accepted_moves += 1;

                    if current_cost < best_cost {
                        best = current.clone();
                        best_cost = current_cost;
                    }
                }

                total_iterations += 1;
            }

            if config.max_iterations > 0 && total_iterations >= config.max_iterations {
                break;
            }

            temperature *= config.alpha;
        }

        SaResult {
            best,
            best_cost,
            iterations: total_iterations,
            final_temperature: temperature,
            accepted_moves,
            improving_moves,
        }
    }
}
