//! Reference packing engine.
//!
//! Every replicated instance carries a position and one of the 24
//! axis-aligned orientations. Overlap is tested on the instances'
//! oriented bounding boxes, and a move that would create an overlap is
//! rejected outright, so every visited arrangement is feasible.
//!
//! Energy is the volume of the whole arrangement's bounding box divided
//! by the summed bounding-box volume of the instances. A perfect packing
//! of boxes scores 1.

use super::config::PackingModelConfig;
use super::types::PackingEngine;
use crate::error::Result;
use crate::geometry::{axis_orientations, rotated_half_extents, Aabb};
use crate::mesh::Mesh;
use crate::object::ObjectDescriptor;
use crate::sa::{SaConfig, SaProblem, SaRunner};
use nalgebra::{Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Relative gap between neighboring grid cells so that rounding in
/// `slot * cell` never turns touching boxes into overlapping ones.
const GRID_SLACK: f64 = 1e-6;

/// Pose of one instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Index into the configured objects.
    pub item: usize,
    /// Index into [`axis_orientations`]; 0 is the identity.
    pub orientation: usize,
    /// Center of the instance's bounding box.
    pub position: Vector3<f64>,
}

/// A complete arrangement of all instances.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub placements: Vec<Placement>,
}

#[derive(Debug)]
struct ItemShape {
    mesh: Arc<Mesh>,
    rotation_allowed: bool,
    /// Half extents for each orientation.
    half_extents: Vec<Vector3<f64>>,
}

/// The annealing problem for one configured object set.
#[derive(Debug)]
pub struct PackingProblem {
    items: Vec<ItemShape>,
    /// Item index of every instance, in configuration order.
    instances: Vec<usize>,
    rotations: Vec<Matrix3<f64>>,
    deviation: f64,
    rotation_probability: f64,
    instance_volume: f64,
    /// Grid pitch for fresh layouts; large enough for any orientation.
    cell: f64,
}

impl PackingProblem {
    pub fn new(objects: &[ObjectDescriptor], deviation: f64, rotation_probability: f64) -> Self {
        let rotations = axis_orientations();

        let items: Vec<ItemShape> = objects
            .iter()
            .map(|object| {
                let half = object.mesh.bounding_box().size() * 0.5;
                ItemShape {
                    mesh: Arc::clone(&object.mesh),
                    rotation_allowed: object.rotation_allowed,
                    half_extents: rotations
                        .iter()
                        .map(|r| rotated_half_extents(r, &half))
                        .collect(),
                }
            })
            .collect();

        let instances: Vec<usize> = objects
            .iter()
            .enumerate()
            .flat_map(|(item, object)| std::iter::repeat(item).take(object.count))
            .collect();

        let instance_volume = instances
            .iter()
            .map(|&item| {
                let h = items[item].half_extents[0];
                8.0 * h.x * h.y * h.z
            })
            .sum();

        let cell = items
            .iter()
            .map(|item| 2.0 * item.half_extents[0].max())
            .fold(0.0, f64::max)
            * (1.0 + GRID_SLACK);

        Self {
            items,
            instances,
            rotations,
            deviation,
            rotation_probability,
            instance_volume,
            cell,
        }
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn bounds_of(&self, placement: &Placement) -> Aabb {
        let half = self.items[placement.item].half_extents[placement.orientation];
        Aabb::from_center(placement.position, half)
    }

    /// Bounding box of the whole arrangement.
    pub fn layout_bounds(&self, layout: &Layout) -> Aabb {
        layout
            .placements
            .iter()
            .fold(Aabb::empty(), |acc, p| acc.union(&self.bounds_of(p)))
    }

    /// True if `candidate` would overlap any instance other than `index`.
    fn collides(&self, layout: &Layout, index: usize, candidate: &Placement) -> bool {
        let bounds = self.bounds_of(candidate);
        layout
            .placements
            .iter()
            .enumerate()
            .any(|(j, other)| j != index && bounds.intersects(&self.bounds_of(other)))
    }

    /// Number of overlapping instance pairs. Always 0 for layouts this
    /// problem produces.
    pub fn overlap_count(&self, layout: &Layout) -> usize {
        let boxes: Vec<Aabb> = layout.placements.iter().map(|p| self.bounds_of(p)).collect();
        let mut count = 0;
        for (i, a) in boxes.iter().enumerate() {
            count += boxes[i + 1..].iter().filter(|b| a.intersects(b)).count();
        }
        count
    }

    /// Merges every instance into one mesh whose bounding box starts at
    /// the origin.
    pub fn render(&self, layout: &Layout) -> Mesh {
        let origin = self.layout_bounds(layout).min;
        let mut mesh = Mesh::default();
        for p in &layout.placements {
            let shape = &self.items[p.item];
            let offset = p.position - origin;
            mesh.extend(shape.mesh.transformed(&self.rotations[p.orientation], &offset));
        }
        mesh
    }
}

impl SaProblem for PackingProblem {
    type Solution = Layout;

    /// Shuffled instances with random orientations on a cubic grid.
    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Layout {
        let n = self.instances.len();
        let mut side = (n as f64).cbrt().ceil() as usize;
        while side * side * side < n {
            side += 1;
        }
        let side = side.max(1);

        let mut order = self.instances.clone();
        order.shuffle(rng);

        let placements = order
            .into_iter()
            .enumerate()
            .map(|(slot, item)| {
                let orientation = if self.items[item].rotation_allowed {
                    rng.random_range(0..self.rotations.len())
                } else {
                    0
                };
                let cell = Vector3::new(
                    (slot % side) as f64,
                    ((slot / side) % side) as f64,
                    (slot / (side * side)) as f64,
                );
                Placement {
                    item,
                    orientation,
                    position: cell * self.cell,
                }
            })
            .collect();

        Layout { placements }
    }

    fn cost(&self, layout: &Layout) -> f64 {
        let volume = self.layout_bounds(layout).volume();
        if self.instance_volume > 0.0 {
            volume / self.instance_volume
        } else {
            volume
        }
    }

    fn neighbor<R: Rng>(&self, layout: &Layout, rng: &mut R) -> Layout {
        if layout.placements.is_empty() {
            return layout.clone();
        }

        let index = rng.random_range(0..layout.placements.len());
        let mut candidate = layout.placements[index];

        if self.items[candidate.item].rotation_allowed
            && rng.random_bool(self.rotation_probability)
        {
            candidate.orientation = rng.random_range(0..self.rotations.len());
        } else {
            let offset = Vector3::new(
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
            );
            candidate.position += offset * self.deviation;
        }

        let mut next = layout.clone();
        if !self.collides(layout, index, &candidate) {
            next.placements[index] = candidate;
        }
        next
    }
}

/// Simulated-annealing packing engine over oriented bounding boxes.
pub struct PackingModel {
    config: PackingModelConfig,
    rng: StdRng,
    problem: Option<PackingProblem>,
    layout: Option<Layout>,
}

impl PackingModel {
    pub fn new(config: PackingModelConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };
        Ok(Self {
            config,
            rng,
            problem: None,
            layout: None,
        })
    }

    pub fn problem(&self) -> Option<&PackingProblem> {
        self.problem.as_ref()
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }
}

impl PackingEngine for PackingModel {
    type Snapshot = Mesh;

    fn configure(&mut self, objects: &[ObjectDescriptor], deviation: f64) {
        let problem = PackingProblem::new(objects, deviation, self.config.rotation_probability);
        log::debug!(
            "configured {} instances, deviation {deviation}",
            problem.instance_count()
        );
        self.layout = Some(problem.initial_solution(&mut self.rng));
        self.problem = Some(problem);
    }

    fn run_annealing(&mut self, iterations: usize) {
        let (Some(problem), Some(layout)) = (self.problem.as_ref(), self.layout.take()) else {
            return;
        };
        let energy = problem.cost(&layout);
        let initial = energy * self.config.initial_temperature_ratio;
        let min = energy * self.config.min_temperature_ratio;
        if iterations == 0 || !(min > 0.0) || !initial.is_finite() {
            self.layout = Some(layout);
            return;
        }

        let sa = SaConfig::spanning(
            initial,
            min,
            iterations,
            self.config.iterations_per_temperature,
        );
        let result = SaRunner::run_from(problem, layout, &sa, &mut self.rng);
        log::debug!(
            "annealing pass: {} iterations, {} accepted, energy {energy} -> {}",
            result.iterations,
            result.accepted_moves,
            result.best_cost
        );
        self.layout = Some(result.best);
    }

    fn energy(&self) -> f64 {
        match (&self.problem, &self.layout) {
            (Some(problem), Some(layout)) => problem.cost(layout),
            _ => f64::INFINITY,
        }
    }

    fn snapshot(&self) -> Mesh {
        match (&self.problem, &self.layout) {
            (Some(problem), Some(layout)) => problem.render(layout),
            _ => Mesh::default(),
        }
    }

    fn reset(&mut self) {
        if let Some(problem) = &self.problem {
            self.layout = Some(problem.initial_solution(&mut self.rng));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(size: Vector3<f64>, count: usize, rotation_allowed: bool) -> ObjectDescriptor {
        let mut mesh = Mesh::cuboid(size);
        mesh.center();
        ObjectDescriptor {
            mesh: Arc::new(mesh),
            count,
            rotation_allowed,
        }
    }

    fn seeded_model(seed: u64) -> PackingModel {
        PackingModel::new(PackingModelConfig::default().with_seed(seed)).unwrap()
    }

    #[test]
    fn test_unconfigured_model_has_infinite_energy() {
        let mut model = seeded_model(1);
        assert_eq!(model.energy(), f64::INFINITY);
        model.run_annealing(100);
        model.reset();
        assert_eq!(model.snapshot().triangle_count(), 0);
    }

    #[test]
    fn test_configure_places_every_instance_without_overlap() {
        let objects = [
            descriptor(Vector3::new(1.0, 2.0, 3.0), 5, true),
            descriptor(Vector3::repeat(1.0), 4, false),
        ];
        let mut model = seeded_model(7);
        model.configure(&objects, 0.1);

        let problem = model.problem().unwrap();
        let layout = model.layout().unwrap();
        assert_eq!(layout.placements.len(), 9);
        assert_eq!(problem.overlap_count(layout), 0);
        assert!(model.energy() >= 1.0 - 1e-9);
        assert!(model.energy().is_finite());
    }

    #[test]
    fn test_annealing_improves_and_stays_feasible() {
        let objects = [descriptor(Vector3::repeat(10.0), 5, true)];
        let mut model = seeded_model(42);
        model.configure(&objects, 2000f64.cbrt() / 32.0);
        let before = model.energy();

        model.run_annealing(20_000);
        let after = model.energy();

        assert!(after <= before, "energy rose from {before} to {after}");
        assert!(after >= 1.0 - 1e-9);
        let problem = model.problem().unwrap();
        assert_eq!(problem.overlap_count(model.layout().unwrap()), 0);
    }

    #[test]
    fn test_fixed_rotation_keeps_identity_orientation() {
        let objects = [descriptor(Vector3::new(1.0, 2.0, 4.0), 6, false)];
        let mut model = PackingModel::new(
            PackingModelConfig::default()
                .with_rotation_probability(1.0)
                .with_seed(3),
        )
        .unwrap();
        model.configure(&objects, 0.2);
        model.run_annealing(5_000);
        model.reset();
        model.run_annealing(5_000);

        assert!(model
            .layout()
            .unwrap()
            .placements
            .iter()
            .all(|p| p.orientation == 0));
    }

    #[test]
    fn test_reset_returns_to_fresh_grid() {
        let objects = [descriptor(Vector3::repeat(2.0), 8, false)];
        let mut model = seeded_model(11);
        model.configure(&objects, 0.5);
        let fresh = model.energy();

        model.run_annealing(10_000);
        model.reset();

        // Identical cubes on the same grid always score the same.
        assert!((model.energy() - fresh).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_is_detached_value() {
        let objects = [descriptor(Vector3::new(1.0, 1.0, 2.0), 3, true)];
        let mut model = seeded_model(5);
        model.configure(&objects, 0.1);

        let snapshot = model.snapshot();
        assert_eq!(snapshot.triangle_count(), 3 * 12);
        assert_eq!(snapshot.bounding_box().min, Vector3::zeros());

        let copy = snapshot.clone();
        model.run_annealing(2_000);
        model.reset();
        assert_eq!(snapshot, copy);
    }

    #[test]
    fn test_snapshot_bounds_match_energy() {
        let objects = [descriptor(Vector3::new(1.0, 2.0, 3.0), 4, true)];
        let mut model = seeded_model(9);
        model.configure(&objects, 0.2);
        model.run_annealing(3_000);

        let volume = model.snapshot().bounding_box().volume();
        let expected = model.energy() * 4.0 * 6.0;
        assert!((volume - expected).abs() < 1e-6 * expected);
    }

    #[test]
    fn test_fresh_grid_has_no_overlap_for_inexact_sizes() {
        for &(side, count) in &[(0.3, 64), (0.7, 125), (7.7, 125), (0.1, 27)] {
            for rotation_allowed in [false, true] {
                let objects = [descriptor(Vector3::repeat(side), count, rotation_allowed)];
                let mut model = seeded_model(1);
                model.configure(&objects, 0.1);

                let overlaps = problem_overlaps(&model);
                assert_eq!(overlaps, 0, "side {side} count {count}: {overlaps} overlapping pairs");

                model.reset();
                assert_eq!(problem_overlaps(&model), 0);
            }
        }
    }

    fn problem_overlaps(model: &PackingModel) -> usize {
        model.problem().unwrap().overlap_count(model.layout().unwrap())
    }

    #[test]
    fn test_rejected_move_leaves_layout_unchanged() {
        // Two unit cubes touching face to face along x. The deviation is
        // below the cube size, so any move of one toward the other overlaps.
        let objects = [descriptor(Vector3::repeat(1.0), 2, false)];
        let problem = PackingProblem::new(&objects, 0.5, 0.0);
        let layout = Layout {
            placements: vec![
                Placement {
                    item: 0,
                    orientation: 0,
                    position: Vector3::zeros(),
                },
                Placement {
                    item: 0,
                    orientation: 0,
                    position: Vector3::new(1.0, 0.0, 0.0),
                },
            ],
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut unchanged = 0;
        for _ in 0..200 {
            let next = problem.neighbor(&layout, &mut rng);
            let moved = (0..2)
                .filter(|&i| next.placements[i] != layout.placements[i])
                .count();
            assert!(moved <= 1);
            assert!(next.placements[0].position.x <= 0.0);
            assert!(next.placements[1].position.x >= 1.0);
            assert_eq!(problem.overlap_count(&next), 0);
            if next == layout {
                unchanged += 1;
            }
        }
        // Roughly half the proposals point toward the other cube.
        assert!(unchanged > 50, "only {unchanged} rejected moves");
    }
}
