//! Search orchestrator behavior against scripted engines.

use pack3d::object::{setup_objects, ObjectDescriptor, ObjectSet, RotationPolicy};
use pack3d::search::{Clock, RestartOutcome, SearchState};
use pack3d::{
    Error, Mesh, PackingEngine, PackingModel, PackingModelConfig, PersistencePolicy,
    PersistenceSink, SearchConfig, SearchOrchestrator, StlSink,
};
use nalgebra::Vector3;
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

// ---- Test doubles ----

/// Manually advanced time shared between the engine and the orchestrator.
#[derive(Clone, Default)]
struct ManualClock(Rc<Cell<Duration>>);

impl ManualClock {
    fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.0.get()
    }
}

/// Returns scripted energies and records when each pass starts.
struct ScriptedEngine {
    energies: Vec<f64>,
    cursor: usize,
    clock: ManualClock,
    pass_duration: Duration,
    pass_starts: Rc<RefCell<Vec<Duration>>>,
    deviations: Vec<f64>,
}

impl ScriptedEngine {
    fn new(energies: Vec<f64>, clock: ManualClock) -> Self {
        Self {
            energies,
            cursor: 0,
            clock,
            pass_duration: Duration::from_secs(1),
            pass_starts: Rc::default(),
            deviations: Vec::new(),
        }
    }
}

impl PackingEngine for ScriptedEngine {
    type Snapshot = f64;

    fn configure(&mut self, _objects: &[ObjectDescriptor], deviation: f64) {
        self.deviations.push(deviation);
    }

    fn run_annealing(&mut self, _iterations: usize) {
        self.pass_starts.borrow_mut().push(self.clock.elapsed());
        self.clock.advance(self.pass_duration);
        self.cursor += 1;
    }

    fn energy(&self) -> f64 {
        self.energies[(self.cursor - 1).min(self.energies.len() - 1)]
    }

    fn snapshot(&self) -> f64 {
        self.energy()
    }

    fn reset(&mut self) {}
}

/// Keeps the "file content" in memory: the last saved snapshot.
#[derive(Default)]
struct MemorySink {
    writes: Vec<(PathBuf, f64)>,
    fail: bool,
}

impl MemorySink {
    fn artifact(&self) -> Option<f64> {
        self.writes.last().map(|(_, e)| *e)
    }
}

impl PersistenceSink<f64> for MemorySink {
    fn save(&mut self, path: &Path, energy: &f64) -> pack3d::Result<()> {
        if self.fail {
            return Err(Error::Persistence {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.writes.push((path.to_path_buf(), *energy));
        Ok(())
    }
}

fn cube_objects(tokens: &[&str], rot: &str, side: f64) -> ObjectSet {
    setup_objects(tokens, RotationPolicy::parse(rot).unwrap(), |_| {
        Ok(Mesh::cuboid(Vector3::repeat(side)))
    })
    .unwrap()
}

fn scripted(
    energies: Vec<f64>,
    restarts: usize,
) -> SearchOrchestrator<ScriptedEngine, MemorySink, ManualClock> {
    let clock = ManualClock::default();
    let engine = ScriptedEngine::new(energies, clock.clone());
    // One second per pass: a budget of n - 1 seconds allows exactly n restarts.
    let config = SearchConfig::default()
        .with_output_path("out.stl")
        .with_time_budget(Duration::from_secs(restarts as u64 - 1));
    SearchOrchestrator::with_clock(engine, MemorySink::default(), config, clock)
}

// ---- Incumbent and writes ----

#[test]
fn test_writes_only_on_strict_improvement() {
    let energies = vec![5.0, 7.0, 5.0, 3.0, 3.0, 4.0, 1.0];
    let mut search = scripted(energies, 7);
    let report = search.run(&cube_objects(&["a.stl"], "", 1.0)).unwrap();

    assert_eq!(report.restarts, 7);
    assert_eq!(report.improvements, 3);
    assert_eq!(report.best_energy, 1.0);
    let written: Vec<f64> = search.sink().writes.iter().map(|(_, e)| *e).collect();
    assert_eq!(written, [5.0, 3.0, 1.0]);
    assert!(search
        .sink()
        .writes
        .iter()
        .all(|(p, _)| p == Path::new("out.stl")));
}

#[test]
fn test_tie_and_regression_leave_artifact_untouched() {
    let mut search = scripted(vec![2.0, 2.0, 9.0], 3);
    let objects = cube_objects(&["a.stl"], "", 1.0);
    search.start(&objects).unwrap();

    search.step().unwrap();
    let after_first = search.sink().artifact();
    assert_eq!(
        search.step().unwrap(),
        Some(RestartOutcome::NotImproved { energy: 2.0 })
    );
    assert_eq!(
        search.step().unwrap(),
        Some(RestartOutcome::NotImproved { energy: 9.0 })
    );
    assert_eq!(search.sink().artifact(), after_first);
    assert_eq!(search.sink().writes.len(), 1);
}

#[test]
fn test_two_mesh_scenario() {
    let objects = cube_objects(&["a.stl", "b.stl"], "1,0", 10.0);
    let flags: Vec<bool> = objects.objects().iter().map(|o| o.rotation_allowed).collect();
    assert_eq!(flags, [true, false]);

    let mut search = scripted(vec![1.7, 2.4], 2);
    search.start(&objects).unwrap();
    assert!((search.engine().deviations[0] - 2000f64.cbrt() / 32.0).abs() < 1e-12);
    assert!((search.engine().deviations[0] - 0.394).abs() < 1e-3);

    search.step().unwrap();
    assert_eq!(search.sink().writes.len(), 1);
    search.step().unwrap();
    assert_eq!(search.sink().writes.len(), 1);
    assert_eq!(search.state(), SearchState::Stopped);
}

#[test]
fn test_deviation_configured_once_across_restarts() {
    let mut search = scripted(vec![4.0, 3.0, 2.0, 1.0], 4);
    search.run(&cube_objects(&["3", "a.stl"], "", 2.0)).unwrap();
    assert_eq!(search.engine().deviations, [8f64.cbrt() / 32.0]);
}

// ---- Deadline ----

#[test]
fn test_no_restart_starts_after_budget() {
    let clock = ManualClock::default();
    let mut engine = ScriptedEngine::new(vec![1.0], clock.clone());
    engine.pass_duration = Duration::from_millis(700);
    let starts = Rc::clone(&engine.pass_starts);
    let budget = Duration::from_secs(5);
    let config = SearchConfig::default().with_time_budget(budget);

    let mut search = SearchOrchestrator::with_clock(engine, MemorySink::default(), config, clock);
    let report = search.run(&cube_objects(&["a.stl"], "", 1.0)).unwrap();

    let starts = starts.borrow();
    assert_eq!(starts.len(), report.restarts);
    assert!(starts.iter().all(|&s| s <= budget), "{starts:?}");
    // The final pass may overrun by at most one pass duration.
    assert!(report.elapsed > budget);
    assert!(report.elapsed <= budget + Duration::from_millis(700));
}

#[test]
fn test_zero_budget_runs_exactly_one_restart() {
    let mut search = scripted(vec![3.0, 1.0], 1);
    let report = search.run(&cube_objects(&["a.stl"], "", 1.0)).unwrap();
    assert_eq!(report.restarts, 1);
    assert_eq!(search.sink().writes.len(), 1);
}

#[test]
fn test_slow_pass_overruns_but_stops() {
    let clock = ManualClock::default();
    let mut engine = ScriptedEngine::new(vec![1.0], clock.clone());
    engine.pass_duration = Duration::from_secs(60);
    let config = SearchConfig::default().with_time_budget(Duration::from_secs(10));

    let mut search = SearchOrchestrator::with_clock(engine, MemorySink::default(), config, clock);
    let report = search.run(&cube_objects(&["a.stl"], "", 1.0)).unwrap();
    assert_eq!(report.restarts, 1);
    assert_eq!(report.elapsed, Duration::from_secs(60));
}

// ---- Failures ----

#[test]
fn test_persistence_failure_aborts_by_default() {
    let objects = cube_objects(&["a.stl"], "", 1.0);
    let mut failing = MemorySink::default();
    failing.fail = true;
    let clock = ManualClock::default();
    let engine = ScriptedEngine::new(vec![2.0, 1.0], clock.clone());
    let mut search = SearchOrchestrator::with_clock(engine, failing, SearchConfig::default(), clock);

    let err = search.run(&objects).unwrap_err();
    assert!(matches!(err, Error::Persistence { .. }));
    assert_eq!(search.state(), SearchState::Stopped);
    assert!(search.best_energy().is_infinite());
    assert_eq!(search.step().unwrap(), None);
}

#[test]
fn test_persistence_failure_can_be_relaxed() {
    let clock = ManualClock::default();
    let engine = ScriptedEngine::new(vec![2.0, 2.0, 1.0], clock.clone());
    let sink = MemorySink {
        fail: true,
        ..MemorySink::default()
    };
    let config = SearchConfig::default()
        .with_time_budget(Duration::from_secs(2))
        .with_persistence_policy(PersistencePolicy::Warn);
    let mut search = SearchOrchestrator::with_clock(engine, sink, config, clock);

    let report = search.run(&cube_objects(&["a.stl"], "", 1.0)).unwrap();
    assert_eq!(report.restarts, 3);
    assert_eq!(report.failed_writes, 3);
    assert_eq!(report.improvements, 0);
    // A failed write is never recorded as the incumbent.
    assert!(report.best_energy.is_infinite());
}

#[test]
fn test_zero_meshes_never_reach_search() {
    let empty: [&str; 0] = [];
    let err = setup_objects(empty, RotationPolicy::default(), |_| {
        Ok(Mesh::cuboid(Vector3::repeat(1.0)))
    })
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

// ---- End to end ----

#[test]
fn test_reference_engine_writes_stl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("packing.stl");

    let objects = setup_objects(
        ["3", "a.stl", "2", "b.stl"],
        RotationPolicy::parse("1,1,1,0").unwrap(),
        |token: &str| {
            let size = if token == "a.stl" {
                Vector3::new(1.0, 2.0, 3.0)
            } else {
                Vector3::repeat(1.5)
            };
            Ok(Mesh::cuboid(size))
        },
    )
    .unwrap();

    let engine = PackingModel::new(PackingModelConfig::default().with_seed(17)).unwrap();
    let config = SearchConfig::default()
        .with_output_path(&path)
        .with_time_budget(Duration::ZERO)
        .with_annealing_iterations(2_000);
    let mut search = SearchOrchestrator::new(engine, StlSink, config);
    let report = search.run(&objects).unwrap();

    // A zero budget stops after the first restart, which always improves.
    assert_eq!(report.restarts, 1);
    assert_eq!(report.improvements, 1);
    assert!(report.best_energy.is_finite());
    assert!(report.best_energy >= 1.0 - 1e-9);

    let written = Mesh::load(&path).unwrap();
    assert_eq!(written.triangle_count(), 5 * 12);
}

// ---- Properties ----

proptest! {
    #[test]
    fn prop_incumbent_is_running_minimum(energies in prop::collection::vec(0.0f64..100.0, 1..40)) {
        let n = energies.len();
        let mut search = scripted(energies.clone(), n);
        let objects = cube_objects(&["a.stl"], "", 1.0);
        search.start(&objects).unwrap();

        let mut minimum = f64::INFINITY;
        let mut previous_best = f64::INFINITY;
        for &e in &energies {
            let writes_before = search.sink().writes.len();
            search.step().unwrap();
            let wrote = search.sink().writes.len() > writes_before;

            prop_assert_eq!(wrote, e < minimum);
            minimum = minimum.min(e);
            prop_assert!(search.best_energy() <= previous_best);
            prop_assert_eq!(search.best_energy(), minimum);
            previous_best = search.best_energy();
        }
        prop_assert_eq!(search.state(), SearchState::Stopped);
    }
}
