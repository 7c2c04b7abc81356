use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::Result;
use clap::Parser;
use log::info;

use roundabout_sim::simulation::{
    format_duration, Roundabout, Settings, SettingsPoller, StepOutcome, Stepper, TimeFactor,
    Viewport, DEFAULT_CAR_FLOW, DEFAULT_LANES, DEFAULT_RADIUS, DEFAULT_STOP_TIME, TICK_RATE,
};

#[derive(Parser)]
#[command(name = "roundabout_sim")]
#[command(about = "Roundabout traffic simulation with a traffic light")]
struct Cli {
    /// Number of simulation ticks to run (20 ticks per simulated second)
    #[arg(long, default_value = "2400")]
    ticks: u32,

    /// Number of approach lanes
    #[arg(long, default_value_t = i64::from(DEFAULT_LANES))]
    lanes: i64,

    /// Ring radius in meters
    #[arg(long, default_value_t = i64::from(DEFAULT_RADIUS))]
    radius: i64,

    /// Traffic light half period in seconds, 0 keeps it green
    #[arg(long, default_value_t = i64::from(DEFAULT_STOP_TIME))]
    stop_time: i64,

    /// Vehicles generated per minute
    #[arg(long, default_value_t = i64::from(DEFAULT_CAR_FLOW))]
    car_flow: i64,

    /// Width of the simulated drawing surface in pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// Height of the simulated drawing surface in pixels
    #[arg(long, default_value = "600")]
    height: u32,

    /// Run ten times faster than real time
    #[arg(long)]
    fast: bool,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// JSON settings file, polled for changes while running
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print a summary every N ticks, 0 to only print the final state
    #[arg(long, default_value = "1200")]
    report_every: u32,

    /// Draw an ASCII map with every summary
    #[arg(long)]
    map: bool,

    /// Pace the ticks against the wall clock instead of running flat out
    #[arg(long)]
    realtime: bool,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,roundabout_sim=info"),
    )
    .init();

    let cli = Cli::parse();

    if let Err(err) = run_headless(&cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    let settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::new(cli.lanes, cli.radius, cli.stop_time, cli.car_flow),
    };

    println!("Running roundabout simulation in headless mode...");
    println!(
        "Ticks: {} ({} simulated)",
        cli.ticks,
        format_duration(u64::from(cli.ticks / TICK_RATE))
    );
    println!();

    let mut roundabout = match cli.seed {
        Some(seed) => Roundabout::new_with_seed(seed),
        None => Roundabout::new(),
    };
    roundabout.set_viewport(Viewport::new(cli.width, cli.height));
    roundabout.update(&settings);

    let mut stepper = Stepper::new();
    if cli.fast {
        stepper.set_time_factor(TimeFactor::Fast, &mut roundabout);
    }

    // Keep the poller alive for the whole run; dropping it stops the thread
    let (sender, receiver) = mpsc::channel();
    let _poller = cli
        .settings
        .clone()
        .map(|path| SettingsPoller::watch_file(path, sender));

    println!("Initial state:");
    report(&roundabout, cli.map);

    stepper.start();
    let mut spawned = 0;
    for tick in 1..=cli.ticks {
        for changed in receiver.try_iter() {
            roundabout.update(&changed);
        }

        if let StepOutcome::Stepped { spawned: true, .. } = stepper.step(&mut roundabout) {
            spawned += 1;
        }

        if cli.report_every > 0 && tick % cli.report_every == 0 && tick < cli.ticks {
            println!("--- After tick {} ---", tick);
            report(&roundabout, cli.map);
        }

        if cli.realtime {
            std::thread::sleep(stepper.tick_interval());
        }
    }
    stepper.pause();

    println!("=== Final State ===");
    report(&roundabout, cli.map);

    let counts = roundabout.circulation_statistics();
    info!("=== SIMULATION COMPLETE ===");
    info!("Ticks run: {}", stepper.loop_count());
    info!("Vehicles spawned this run: {}", spawned);
    info!("Vehicles generated: {}", roundabout.vehicles_generated());
    info!("Vehicles completed: {}", counts.total());
    info!(
        "Travel times: {} good, {} medium, {} bad",
        counts.good, counts.medium, counts.bad
    );
    info!("Vehicles on the road: {}", roundabout.vehicle_count());
    info!(
        "Average travel time: {} s ({})",
        roundabout.average_vehicle_life_time(),
        roundabout.stats().quality().as_str()
    );

    Ok(())
}

fn report(roundabout: &Roundabout, map: bool) {
    roundabout.print_summary();
    if map {
        roundabout.draw_map();
    }
    println!();
}
