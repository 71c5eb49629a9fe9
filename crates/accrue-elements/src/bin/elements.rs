//! Headless Elements runner.
//!
//! Plays the game with a simple greedy strategy for a number of seconds,
//! one-second ticks, then prints a summary.
//!
//! ```text
//! elements [SECONDS] [--load SAVE.json] [--save SAVE.json] [--offline SECONDS]
//! ```
//!
//! Set `RUST_LOG=accrue_core=debug` to watch purchases and resets.

use std::path::PathBuf;

use anyhow::{bail, Context};

use accrue_core::prelude::*;
use accrue_elements::Elements;

/// Buyable purchases attempted per tick, per buyable.
const MAX_PURCHASES_PER_TICK: usize = 100;

struct Args {
    seconds: u64,
    load: Option<PathBuf>,
    save: Option<PathBuf>,
    offline: f64,
}

fn parse_args() -> Result<Args, anyhow::Error> {
    let mut args = Args {
        seconds: 600,
        load: None,
        save: None,
        offline: 0.0,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--load" => args.load = Some(iter.next().context("--load needs a path")?.into()),
            "--save" => args.save = Some(iter.next().context("--save needs a path")?.into()),
            "--offline" => {
                let value = iter.next().context("--offline needs a number of seconds")?;
                args.offline = value
                    .parse()
                    .with_context(|| format!("invalid offline seconds {value:?}"))?;
            }
            other if other.starts_with("--") => bail!("unknown option {other:?}"),
            other => {
                args.seconds = other
                    .parse()
                    .with_context(|| format!("invalid number of seconds {other:?}"))?;
            }
        }
    }
    Ok(args)
}

/// One round of greedy play: buy what is affordable, pick the strongest
/// Lightning mode, and prestige when it at least doubles a layer.
fn play(elements: &Elements) {
    for upgrade in &elements.flame.upgrades {
        upgrade.purchase();
    }
    for buyable in &elements.life.buyables {
        for _ in 0..MAX_PURCHASES_PER_TICK {
            if !buyable.purchase() {
                break;
            }
        }
    }
    let strongest = elements
        .lightning
        .modes
        .iter()
        .rev()
        .find(|mode| mode.visibility() == Visibility::Visible);
    if let Some(mode) = strongest {
        mode.click();
    }

    for (id, button) in elements.reset_buttons() {
        let conversion = button.conversion();
        let held = conversion.gain().value();
        let worth_it = id == "adv" || conversion.actual_gain() >= held.max(BigNum::ONE);
        if worth_it && button.click().is_some() {
            tracing::debug!(layer = id, "prestiged");
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = parse_args()?;
    let mut elements = Elements::build(GameConfig::default())?;

    if let Some(path) = &args.load {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading save {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        elements.game.restore_json(value, |version, _| {
            tracing::warn!(version, "no migration path for save version -- loading as-is");
        })?;
        println!("Loaded {} (tick {})", path.display(), elements.game.tick_count());
    }

    if args.offline > 0.0 {
        let report = elements.game.apply_offline(args.offline)?;
        println!("Offline progress: {:.0}s in {} ticks", report.delta, report.sub_ticks);
    }

    for _ in 0..args.seconds {
        let report = elements.update(1.0)?;
        for milestone in &report.milestones_earned {
            println!("[{:>6.0}s] milestone earned: {milestone}", elements.game.time_played());
        }
        play(&elements);
    }

    println!("After {:.0}s ({} ticks):", elements.game.time_played(), elements.game.tick_count());
    println!(
        "  particles     {} ({}/s)",
        elements.main.particles.display(),
        elements.main.particle_gain.get().format(2)
    );
    for resource in [
        &elements.flame.points,
        &elements.life.points,
        &elements.aqua.points,
        &elements.lightning.points,
        &elements.advancements.points,
    ] {
        println!("  {:<20} {}", resource.name(), resource.display());
    }
    println!("  state hash    {}", elements.game.state_hash());

    if let Some(path) = &args.save {
        let json = elements.game.capture_snapshot().to_json()?;
        std::fs::write(path, json).with_context(|| format!("writing save {}", path.display()))?;
        println!("Saved to {}", path.display());
    }

    Ok(())
}
