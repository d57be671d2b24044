//! The packing engine contract consumed by the search orchestrator.

use crate::object::ObjectDescriptor;

/// A stochastic placement optimizer.
///
/// The orchestrator only relies on the five operations below; it makes
/// no assumption about acceptance rules, determinism or convergence.
/// Tests drive it with scripted engines.
pub trait PackingEngine {
    /// Renderable copy of the current arrangement.
    type Snapshot;

    /// Establishes initial placements for every replicated instance.
    fn configure(&mut self, objects: &[ObjectDescriptor], deviation: f64);

    /// Runs a bounded number of perturb/evaluate/accept steps in place.
    fn run_annealing(&mut self, iterations: usize);

    /// Compactness of the current arrangement. Lower is better.
    fn energy(&self) -> f64;

    /// A value copy of the current arrangement, unaffected by later moves.
    fn snapshot(&self) -> Self::Snapshot;

    /// Discards the current arrangement for a fresh random one under the
    /// same configuration.
    fn reset(&mut self);
}
