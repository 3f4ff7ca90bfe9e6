//! skirmish - grid combat rules engine CLI

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use skirmish::combat::{roll_expression, EffectKind, MonsterTemplate, RngSource};
use skirmish::{Encounter, EngineConfig, Scenario};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Grid combat rules engine
#[derive(Parser, Debug)]
#[command(name = "skirmish", version, about = "Grid combat rules engine")]
struct Args {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Roll a dice expression such as 2d6+3
    Roll {
        expression: String,

        /// Seed for reproducible rolls
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Play out a scenario file
    Run {
        scenario: PathBuf,

        /// Engine configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for reproducible rolls
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the report and combat log as JSON
        #[arg(long)]
        json: bool,
    },

    /// List status effects
    Effects {
        /// Only negative or positive effects
        #[arg(short, long)]
        kind: Option<String>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List powers
    Powers {
        /// Only powers of this class
        #[arg(long)]
        class: Option<String>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List monster templates
    Monsters,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "skirmish=info".into()))
        .with(args.log_json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!args.log_json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();

    match args.command {
        Command::Roll { expression, seed } => roll(&expression, seed),
        Command::Run {
            scenario,
            config,
            seed,
            json,
        } => run(scenario, config, seed, json),
        Command::Effects { kind, config } => effects(kind, config),
        Command::Powers { class, config } => powers(class, config),
        Command::Monsters => monsters(),
    }
}

fn dice(seed: Option<u64>) -> RngSource {
    match seed {
        Some(seed) => RngSource::seeded(seed),
        None => RngSource::from_entropy(),
    }
}

fn roll(expression: &str, seed: Option<u64>) -> Result<()> {
    let mut source = dice(seed);
    let outcome = roll_expression(expression, &mut source)?;

    let rolls: Vec<String> = outcome
        .groups
        .iter()
        .map(|g| format!("{}d{} {:?}", g.count, g.sides, g.rolls))
        .collect();
    println!(
        "{}: {} {:+} = {}",
        expression,
        rolls.join(" "),
        outcome.modifier,
        outcome.total
    );
    Ok(())
}

fn run(path: PathBuf, config: Option<PathBuf>, seed: Option<u64>, json: bool) -> Result<()> {
    let config = EngineConfig::load(config.as_deref())?;
    let (effects, powers) = config.catalogs()?;
    let scenario = Scenario::load(&path, &config, &effects, &powers)?;

    let mut encounter =
        Encounter::with_catalogs(&scenario.name, config, effects, powers).with_dice(dice(seed));
    let report = scenario.run(&mut encounter)?;
    info!(
        "Scenario {} finished: {} step(s), {} rejected",
        scenario.name,
        report.steps.len(),
        report.rejected()
    );

    if json {
        let output = serde_json::json!({
            "report": report,
            "log": encounter.log(),
            "roster": encounter.roster(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for event in encounter.log().entries() {
        println!("{}", event);
    }
    for step in report.steps.iter().filter(|s| s.rejected.is_some()) {
        println!(
            "rejected: {} ({})",
            step.action,
            step.rejected.as_deref().unwrap_or_default()
        );
    }
    println!();
    for combatant in encounter.roster().iter() {
        println!(
            "{:<16} HP {:>3}/{:<3} MP {:>3}/{:<3} {}",
            combatant.name,
            combatant.hp,
            combatant.max_hp,
            combatant.mp,
            combatant.max_mp,
            combatant
                .position
                .map_or_else(|| "off board".to_string(), |p| p.to_string())
        );
    }
    Ok(())
}

fn effects(kind: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let kind = kind
        .map(|k| {
            k.parse::<EffectKind>()
                .map_err(|_| anyhow!("unknown effect kind '{}' (negative or positive)", k))
        })
        .transpose()?;
    let (effects, _) = EngineConfig::load(config.as_deref())?.catalogs()?;

    for effect in effects.iter().filter(|e| kind.map_or(true, |k| e.kind == k)) {
        println!(
            "{:<16} {:<9} {:<12} {}",
            effect.key,
            effect.kind.to_string(),
            effect.duration.to_string(),
            effect.description
        );
    }
    Ok(())
}

fn powers(class: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let (_, powers) = EngineConfig::load(config.as_deref())?.catalogs()?;
    let class = class.map(|c| c.to_lowercase());

    for power in powers
        .iter()
        .filter(|p| class.is_none() || p.class == class)
    {
        println!(
            "{:<20} {:<8} {:<10} range {:<2} {:<6} {}",
            power.id,
            power.class.as_deref().unwrap_or("-"),
            power.tier.to_string(),
            power.range,
            power.damage,
            power.description
        );
    }
    Ok(())
}

fn monsters() -> Result<()> {
    for template in MonsterTemplate::all() {
        let stats = template.stats();
        println!(
            "{:<16} {:<16} L{:<2} HP {:>3} AC {:>2} ATK +{} DMG {:<6} SPD {} XP {}",
            template.to_string(),
            stats.name,
            stats.level,
            stats.hp,
            stats.armor_class,
            stats.attack,
            stats.damage,
            stats.speed,
            stats.xp
        );
    }
    Ok(())
}
