mod actor;
mod scenario;
mod tick;
mod utils;
mod world;

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use groundclamp::{ClampableActor, Vec3};
use log::{error, info};

use crate::{
    scenario::{Scenario, ScenarioError},
    tick::Simulation,
};

#[derive(Parser)]
#[command(name = "clampsim")]
#[command(about = "Headless ground clamping simulation", long_about = None)]
struct Cli {
    /// RON scenario file (the built-in demo when omitted)
    #[arg(short, long)]
    scenario: Option<PathBuf>,
    /// Override the scenario's tick count
    #[arg(short, long)]
    ticks: Option<u32>,
    /// Log tick timing every N ticks at debug level (0 disables)
    #[arg(long, default_value = "0")]
    profile_every: u32,
    /// Log a tick summary every N ticks
    #[arg(long, default_value = "30")]
    report_every: u64,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ScenarioError> {
    let scenario = match &cli.scenario {
        Some(path) => {
            info!("Loading scenario {}", path.display());
            Scenario::load(path)?
        }
        None => {
            info!("No scenario given, running the built-in demo");
            Scenario::demo()?
        }
    };

    let terrain = world::build_terrain(&scenario.terrain)?;
    let entities = scenario.actors.iter().map(actor::spawn).collect();
    let mut sim = Simulation::new(scenario.settings.clone(), terrain, entities)
        .with_eye_point(scenario.eye_point.map(Vec3::from))
        .with_max_three_point_speed(scenario.max_three_point_speed)
        .with_profiling(cli.profile_every);

    let ticks = cli.ticks.unwrap_or(scenario.ticks);
    info!(
        "Running {} ticks of {:.4}s with {} actors",
        ticks,
        scenario.dt,
        scenario.actors.len()
    );

    for _ in 0..ticks {
        let report = sim.step(scenario.dt);
        if cli.report_every > 0 && report.tick % cli.report_every == 0 {
            info!(
                "tick {}: {} direct, {} queued, {} reused, {} skipped",
                report.tick, report.direct, report.queued, report.reused, report.skipped
            );
        }
    }

    for entity in sim.entities() {
        let t = entity.actor.transform();
        let up = t.local_up();
        info!(
            "{} ({}): position [{:.3}, {:.3}, {:.3}] up [{:.3}, {:.3}, {:.3}]",
            entity.actor.name(),
            entity.actor.id(),
            t.translation.x,
            t.translation.y,
            t.translation.z,
            up.x,
            up.y,
            up.z
        );
    }
    info!("Finished at t = {:.3}s", sim.time());

    Ok(())
}
