//! Shrike CLI
//!
//! Command-line driver for the Shrike event processing engine.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shrike_core::{ActionDispatcher, ActionFactory, EventProcessor, EventQueue};
use shrike_engine::{
    Engine, EngineConfig, FileContent, FileWatcher, InputSource, SensorSimulator, SocketListener,
    TickSource,
};
use shrike_rules::RuleManager;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "shrike")]
#[command(about = "Shrike - rule-driven event processing engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine until stdin closes or 'q' is entered
    Run {
        /// Rules file (JSON or YAML array of rule objects)
        #[arg(short, long, default_value = "./rules.json")]
        rules: PathBuf,

        /// Log level
        #[arg(short, long, default_value = "info")]
        log_level: String,

        /// Action worker threads
        #[arg(short, long, default_value_t = shrike_core::DEFAULT_WORKERS)]
        workers: usize,

        /// Watch a JSON file as an input source (repeatable)
        #[arg(long)]
        watch_json: Vec<PathBuf>,

        /// Watch a text file as an input source (repeatable)
        #[arg(long)]
        watch_text: Vec<PathBuf>,

        /// Accept newline-delimited JSON events on this TCP port
        #[arg(long)]
        listen: Option<u16>,

        /// Emit a heartbeat event every N seconds
        #[arg(long)]
        heartbeat: Option<u64>,

        /// Emit simulated sensor readings every N milliseconds
        #[arg(long)]
        simulate: Option<u64>,
    },

    /// Validate a rules file without running the engine
    Validate {
        /// Rules file
        #[arg(short, long, default_value = "./rules.json")]
        rules: PathBuf,
    },

    /// List the rules a file loads
    List {
        /// Rules file
        #[arg(short, long, default_value = "./rules.json")]
        rules: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            rules,
            log_level,
            workers,
            watch_json,
            watch_text,
            listen,
            heartbeat,
            simulate,
        } => {
            setup_logging(&log_level)?;
            run_engine(RunOptions {
                rules,
                workers,
                watch_json,
                watch_text,
                listen,
                heartbeat,
                simulate,
            })?;
        }
        Commands::Validate { rules } => {
            setup_logging("info")?;
            validate_rules(rules)?;
        }
        Commands::List { rules } => {
            setup_logging("warn")?;
            list_rules(rules)?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(())
}

struct RunOptions {
    rules: PathBuf,
    workers: usize,
    watch_json: Vec<PathBuf>,
    watch_text: Vec<PathBuf>,
    listen: Option<u16>,
    heartbeat: Option<u64>,
    simulate: Option<u64>,
}

fn run_engine(options: RunOptions) -> Result<()> {
    info!("starting shrike engine");

    let factory = Arc::new(ActionFactory::new());
    factory.register_defaults();

    let rules = Arc::new(RuleManager::new());
    let stats = rules.load_rules(&options.rules)?;
    if stats.loaded == 0 {
        anyhow::bail!(
            "no usable rules in {} ({} skipped)",
            options.rules.display(),
            stats.skipped
        );
    }
    info!(
        loaded = stats.loaded,
        skipped = stats.skipped,
        "rules loaded"
    );

    let queue = Arc::new(EventQueue::new());
    let processor = EventProcessor::new(Arc::clone(&queue));
    let dispatcher = Arc::new(ActionDispatcher::new(factory, options.workers));

    let mut sources: Vec<Box<dyn InputSource>> = Vec::new();
    for path in options.watch_json {
        sources.push(Box::new(FileWatcher::new(path, FileContent::Json)));
    }
    for path in options.watch_text {
        sources.push(Box::new(FileWatcher::new(path, FileContent::Text)));
    }
    if let Some(port) = options.listen {
        sources.push(Box::new(SocketListener::new(port)));
    }
    if let Some(secs) = options.heartbeat {
        sources.push(Box::new(TickSource::new(
            Duration::from_secs(secs),
            "heartbeat",
            "System heartbeat check.",
        )));
    }
    if let Some(millis) = options.simulate {
        sources.push(Box::new(SensorSimulator::new(Duration::from_millis(
            millis,
        ))));
    }

    for source in &mut sources {
        source.start(&processor)?;
    }

    let mut engine = Engine::new(
        queue,
        Arc::clone(&rules),
        dispatcher,
        EngineConfig::default(),
    );
    engine.start();

    info!("engine running; a line of JSON injects an event, 'q' quits");
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let input = line.trim();
        if input == "q" || input == "quit" {
            break;
        }
        if input.is_empty() {
            continue;
        }
        if let Err(error) = processor.process_raw_json("stdin", input) {
            warn!(%error, "input line ignored");
        }
    }

    info!("shutting down");
    for source in &mut sources {
        source.stop();
    }
    engine.shutdown();
    info!("engine stopped");

    Ok(())
}

fn validate_rules(rules_path: PathBuf) -> Result<()> {
    let manager = RuleManager::new();
    let stats = manager.load_rules(&rules_path)?;

    info!(
        loaded = stats.loaded,
        skipped = stats.skipped,
        "validation complete"
    );

    if stats.skipped > 0 {
        anyhow::bail!("{} rules failed to parse", stats.skipped);
    }

    Ok(())
}

fn list_rules(rules_path: PathBuf) -> Result<()> {
    let manager = RuleManager::new();
    manager.load_rules(&rules_path)?;

    let summaries = manager.summaries();
    println!("{} rules in {}:", summaries.len(), rules_path.display());
    for (id, actions) in summaries {
        println!("- {} ({} actions)", id, actions);
    }

    Ok(())
}
