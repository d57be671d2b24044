//! pack3d command-line driver.

use anyhow::Context;
use clap::Parser;
use pack3d::search::{ANNEALING_ITERATIONS, DEFAULT_OUTPUT_PATH, DEFAULT_TIME_BUDGET_SECS};
use pack3d::{
    setup_objects, Error, Mesh, PackingEngine, PackingModel, PackingModelConfig,
    PersistenceSink, PersistencePolicy, RotationPolicy, SearchConfig, SearchOrchestrator,
    SearchReport, StlSink,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pack3d")]
#[command(about = "Packs N copies of each mesh into as small of a volume as possible")]
#[command(version)]
struct Cli {
    /// Path to the output STL file
    #[arg(long = "output-path", alias = "output_path", default_value = DEFAULT_OUTPUT_PATH)]
    output_path: PathBuf,

    /// Stop after approximately this many seconds
    #[arg(long = "exec-time", alias = "exec_time", default_value_t = DEFAULT_TIME_BUDGET_SECS)]
    exec_time: u64,

    /// Comma-separated booleans enabling rotation per argument, e.g. 1,0,1
    #[arg(long, default_value = "")]
    rot: String,

    /// Annealing iterations per restart
    #[arg(long, default_value_t = ANNEALING_ITERATIONS)]
    iterations: usize,

    /// Random seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Keep searching when writing an improvement fails
    #[arg(long)]
    keep_going: bool,

    /// Replication counts and mesh paths: N1 mesh1.stl N2 mesh2.stl ...
    args: Vec<String>,
}

fn print_usage() {
    println!("Usage: pack3d --output-path=path/to/output.stl --exec-time=180 --rot=1,0... N1 mesh1.stl N2 mesh2.stl ...");
    println!(" - Packs N copies of each mesh into as small of a volume as possible.");
    println!(" - Runs for approximately exec-time seconds.");
    println!(" - Rotations for each object are disabled/enabled using --rot.");
    println!(" - Results are written to disk (at output-path) whenever a new best is found.");
}

/// Sets up the objects and runs the search. Returns `None` when the
/// arguments do not describe a packing job, before any search work.
fn execute<E, S, L>(
    cli: &Cli,
    load: L,
    engine: E,
    sink: S,
) -> anyhow::Result<Option<SearchReport>>
where
    E: PackingEngine,
    S: PersistenceSink<E::Snapshot>,
    L: FnMut(&str) -> pack3d::Result<Mesh>,
{
    let setup = RotationPolicy::parse(&cli.rot)
        .and_then(|rotation| setup_objects(&cli.args, rotation, load));
    let objects = match setup {
        Ok(objects) => objects,
        Err(Error::Config(reason)) => {
            log::error!("{reason}");
            return Ok(None);
        }
        Err(e) => return Err(e).context("setup failed"),
    };

    let policy = if cli.keep_going {
        PersistencePolicy::Warn
    } else {
        PersistencePolicy::Abort
    };
    let config = SearchConfig::default()
        .with_output_path(cli.output_path.clone())
        .with_time_budget(Duration::from_secs(cli.exec_time))
        .with_annealing_iterations(cli.iterations)
        .with_persistence_policy(policy);

    let report = SearchOrchestrator::new(engine, sink, config)
        .run(&objects)
        .context("search aborted")?;
    Ok(Some(report))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut engine_config = PackingModelConfig::default();
    if let Some(seed) = cli.seed {
        engine_config = engine_config.with_seed(seed);
    }
    let engine = PackingModel::new(engine_config)?;

    let Some(report) = execute(&cli, |path| Mesh::load(path), engine, StlSink)? else {
        print_usage();
        return Ok(());
    };

    log::info!(
        "finished: {} restarts, {} improvements, best energy {:.6} in {:?}",
        report.restarts,
        report.improvements,
        report.best_energy,
        report.elapsed
    );
    Ok(())
}
