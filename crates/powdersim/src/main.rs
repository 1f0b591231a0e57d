use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use powdersim_core::data::{PT_NUM, XRES, YRES};
use powdersim_core::{DebugStep, LoadMode, Save, Simulation};

mod config;

use config::{DEFAULT_CONFIG_NAME, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// OPS save to load before running
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write the simulation as an OPS save when done
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of ticks to simulate (overrides run.ticks)
    #[arg(long)]
    ticks: Option<u64>,

    /// Random seed (overrides simulation.seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Load and save the pressure and velocity grids
    #[arg(long)]
    include_pressure: bool,

    /// Start paused; ticks then only reconcile the particle maps
    #[arg(long)]
    pause: bool,

    /// Step particle by particle through the first tick
    #[arg(long)]
    debug_step: bool,

    /// Config file to read (extension optional)
    #[arg(long, default_value = DEFAULT_CONFIG_NAME)]
    config: String,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(ticks) = self.ticks {
            config.run.ticks = ticks;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = RunConfig::load_from(&args.config)?;
    args.apply(&mut config);

    if args.print_config {
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default())
            .context("Failed to serialize configuration")?;
        println!("{text}");
        return Ok(());
    }

    let mut sim = Simulation::new(config.simulation.clone());

    if let Some(path) = &args.input {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let save =
            Save::parse(&bytes).with_context(|| format!("Failed to parse {}", path.display()))?;
        log::info!(
            "Loaded {}: {} particles, {}x{} blocks, version {}",
            path.display(),
            save.particles.len(),
            save.block_width,
            save.block_height,
            save.created_version
        );
        if !sim.load_save(0, 0, &save, LoadMode::ReplaceAll, args.include_pressure) {
            log::warn!("Particle store filled up, part of the save was dropped");
        }
    }
    if args.pause {
        sim.paused = true;
    }
    if config.run.stacking_check {
        sim.force_stacking_check();
    }

    let mut ticks = config.run.ticks;
    if args.debug_step && ticks > 0 {
        step_first_tick(&mut sim);
        ticks -= 1;
    }
    run(&mut sim, ticks, config.run.log_every);

    if let Some(path) = &args.output {
        let bytes = sim
            .create_save(0, 0, XRES, YRES, args.include_pressure)
            .build()
            .context("Failed to build save")?;
        fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    }

    Ok(())
}

/// Walk the debug cursor through one whole tick
fn step_first_tick(sim: &mut Simulation) {
    loop {
        let message = sim.particle_debug(DebugStep::Next);
        if message.is_empty() {
            // Nothing to step through; run the tick normally instead
            sim.tick();
            break;
        }
        log::debug!("{message}");
        if sim.debug_current_particle() == 0 {
            break;
        }
    }
    log::info!("Stepped through tick {}", sim.tick_count());
}

fn run(sim: &mut Simulation, ticks: u64, log_every: u64) {
    if sim.paused {
        log::warn!("Simulation is paused, ticks will only reconcile particle maps");
    }

    let pb = ProgressBar::new(ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for t in 1..=ticks {
        sim.update_fields();
        sim.tick();
        pb.inc(1);
        if log_every > 0 && t % log_every == 0 {
            pb.println(element_stats(sim));
        }
    }
    pb.finish_with_message(format!("{} particles", sim.num_parts()));
    log::info!("Ran {} ticks, {} particles live", ticks, sim.num_parts());
}

/// One line with the particle count and the most common elements
fn element_stats(sim: &Simulation) -> String {
    let mut counts: Vec<(u16, u32)> = (1..PT_NUM as u16)
        .map(|t| (t, sim.element_count(t)))
        .filter(|&(_, n)| n > 0)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let total: u32 = counts.iter().map(|&(_, n)| n).sum();

    let top: Vec<String> = counts
        .iter()
        .take(8)
        .map(|&(t, n)| format!("{} {n}", sim.element(t).name))
        .collect();
    format!(
        "tick {}: {} particles [{}]",
        sim.tick_count(),
        total,
        top.join(", ")
    )
}
