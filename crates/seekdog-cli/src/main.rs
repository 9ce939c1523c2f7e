//! `seekdog-cli` – SeekDog Command Line Interface
//!
//! This binary starts a target search and keeps an operator console open
//! beside it. It:
//!
//! 1. Loads `~/.seekdog/config.toml`, writing the defaults on first run.
//! 2. Probes the model server and reports whether the active model is pulled.
//! 3. Wires the decider, classifier, camera, actuator and round log together
//!    and starts the [`RoundScheduler`].
//! 4. Serves the REPL until the search completes, then prints a summary.
//! 5. Intercepts **Ctrl-C** to shut the search down cleanly.
//!
//! Usage: `seekdog [TARGET]`; the argument overrides the configured target.

mod config;
mod model_server;
mod repl;

use std::sync::Arc;

use colored::Colorize;
use seekdog_hal::{
    Actuator, Camera, DatasetCamera, SimActuator, SimCamera, SimMotionDriver, VelocityActuator,
};
use seekdog_memory::{RoundLog, RoundMemory};
use seekdog_nav::ObstacleMap;
use seekdog_runtime::{
    Collaborators, CompletionReason, KeywordClassifier, LandmarkClassifier, LlmClassifier,
    LlmDecider, LlmDriver, NullPerception, Perception, RoundScheduler, RunSummary,
    SidecarPerception, init_tracing,
};
use tracing::{info, warn};

use crate::config::{ActuatorKind, ClassifierKind, Config};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters, SEEKDOG_LOG_FORMAT=json switches to JSON lines and
    // OTEL_EXPORTER_OTLP_ENDPOINT turns on span export. User-facing output
    // still goes through println!.
    let _telemetry = init_tracing("seekdog");

    print_banner();

    let mut cfg = load_or_create_config();
    if let Some(target) = std::env::args().nth(1) {
        cfg.target = target;
    }

    probe_model_server(&cfg);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    let summary = match runtime.block_on(run_search(&cfg)) {
        Ok(summary) => summary,
        Err(message) => {
            eprintln!("{}: {}", "Search aborted".red(), message);
            std::process::exit(1);
        }
    };
    print_summary(&cfg.target, summary.as_ref());
}

async fn run_search(cfg: &Config) -> Result<Option<RunSummary>, String> {
    let scheduler_config = cfg.scheduler_config().map_err(|e| e.to_string())?;
    let collaborators = build_collaborators(cfg)?;
    let scheduler = Arc::new(RoundScheduler::new(scheduler_config, collaborators));

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let for_ctrlc = scheduler.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the search …".yellow().bold());
        for_ctrlc.shutdown();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use /quit to stop the search");
    }

    println!(
        "  Searching for {} from {}. Type {} for commands.\n",
        cfg.target.bold().green(),
        cfg.start_pose.to_string().bold(),
        "/help".bold().cyan()
    );
    if let Some(every) = cfg.feedback_interval {
        println!("  You will be asked for feedback every {every} round(s).\n");
    }
    info!(target_object = %cfg.target, max_rounds = cfg.max_rounds, "search starting");

    let runner = scheduler.clone();
    let search = tokio::spawn(async move { runner.run().await });
    Ok(repl::run(scheduler, repl::spawn_stdin_reader(), search).await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────────────────────────────────────

fn build_collaborators(cfg: &Config) -> Result<Collaborators, String> {
    let driver = LlmDriver::new(&cfg.model_url, &cfg.active_model);
    let map = ObstacleMap::from_config(&cfg.map);
    println!(
        "  Map: {} blocked cell(s), {} landmark(s)",
        map.blocked_count(),
        map.landmarks().len()
    );

    let (camera, perception): (Box<dyn Camera>, Arc<dyn Perception>) = match &cfg.dataset_dir {
        Some(dir) => {
            let camera = DatasetCamera::open(dir)
                .map_err(|e| format!("cannot open dataset {}: {}", dir.display(), e))?;
            println!("  Replaying {} frame(s) from {}", camera.len(), dir.display());
            (Box::new(camera), Arc::new(SidecarPerception))
        }
        None => (Box::new(SimCamera::new("front")), Arc::new(NullPerception)),
    };

    let classifier: Arc<dyn LandmarkClassifier> = match cfg.classifier {
        ClassifierKind::Keyword => Arc::new(KeywordClassifier::from_map(&map)),
        ClassifierKind::Llm => Arc::new(LlmClassifier::new(driver.clone(), &map)),
    };

    let actuator: Box<dyn Actuator> = match cfg.actuator {
        ActuatorKind::Sim => Box::new(SimActuator::new(cfg.start_pose)),
        ActuatorKind::Velocity => Box::new(VelocityActuator::new(SimMotionDriver::new("base"))),
    };

    let memory = match RoundLog::create_session(&cfg.log_dir) {
        Ok(log) => {
            println!("  Round log: {}", log.dir().display().to_string().bold());
            RoundMemory::with_log(log)
        }
        Err(e) => {
            warn!(error = %e, dir = %cfg.log_dir.display(), "round log unavailable; keeping history in memory only");
            RoundMemory::new()
        }
    };

    Ok(Collaborators {
        decider: Arc::new(LlmDecider::new(driver, perception)),
        classifier,
        camera,
        actuator,
        memory,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Startup helpers
// ─────────────────────────────────────────────────────────────────────────────

fn load_or_create_config() -> Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} {}",
                    "✓ Default config written to".green(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn probe_model_server(cfg: &Config) {
    print!("\n  Probing model server at {} … ", cfg.model_url.dimmed());
    match model_server::fetch_models(&cfg.model_url) {
        Ok(models) if model_server::has_model(&models, &cfg.active_model) => {
            println!("{} ({} ready)", "online".green(), cfg.active_model.bold());
        }
        Ok(models) => {
            println!("{}", "online".yellow());
            println!(
                "  Model {} is not pulled ({} available). Try `{}`.",
                cfg.active_model.yellow(),
                models.len(),
                format!("ollama pull {}", cfg.active_model).bold()
            );
        }
        Err(e) => {
            println!("{}", "offline".red());
            println!("  {}", e.to_string().dimmed());
            println!("  Rounds will fail until the server is reachable.");
        }
    }
    println!();
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║       SeekDog – Target Search        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
}

fn print_summary(target: &str, summary: Option<&RunSummary>) {
    let Some(summary) = summary else {
        return;
    };
    println!();
    let headline = match summary.reason {
        CompletionReason::TargetFound => format!("Found the {}.", target).green(),
        CompletionReason::RoundBudgetReached => "Round budget used up.".yellow(),
        CompletionReason::Exhausted => "Every round failed.".red(),
        CompletionReason::Shutdown => "Search stopped.".yellow(),
    };
    println!("  {}", headline.bold());
    println!(
        "  Rounds: {} ({} failed)   Final pose: {}",
        summary.rounds,
        summary.failures,
        summary.final_pose.to_string().bold()
    );
}
