//! `nars-cli` – interactive front-end for the NARS reasoner.
//!
//! This binary:
//!
//! 1. Loads `~/.nars/config.toml`, writing a default one on first run.
//!    `NARS_*` environment variables override individual settings.
//! 2. Builds a [`Scheduler`][nars_runtime::Scheduler] from that config.
//! 3. Drops the user into an **interactive REPL** that reads Narsese input
//!    and slash-commands (`/step`, `/run`, `/snapshot`, `/help`, ...).
//! 4. Intercepts **Ctrl-C** to request a stop, which takes effect at the
//!    next tick.

mod config;
mod narsese;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); NARS_LOG_FORMAT=json switches to
    // newline-delimited JSON.  OTEL_EXPORTER_OTLP_ENDPOINT enables span
    // export.  User-facing output still goes through println!.
    let _tracing = nars_runtime::init_tracing("nars-cli");

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => write_first_run_config(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    let session = match repl::Session::new(cfg.clone()) {
        Ok(session) => session,
        Err(e) => {
            println!("{}: {}", "Cannot start reasoner".red(), e);
            std::process::exit(1);
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let stop = session.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the reasoner …".yellow().bold());
        stop.request_stop();
        println!("{}", "  ✓ Stop requested; press Enter to exit.".green());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let r = &cfg.reasoner;
    println!(
        "  Memory: {} concepts × {} levels, seed {}",
        r.concept_capacity.to_string().yellow(),
        r.levels.to_string().yellow(),
        r.seed.map_or_else(|| "random".to_string(), |s| s.to_string()).yellow()
    );
    println!();
    println!(
        "  Type Narsese such as {} or {} for a list of commands.\n",
        "<bird --> animal>.".bold(),
        "/help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(session, shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// First run
// ─────────────────────────────────────────────────────────────────────────────

fn write_first_run_config() -> config::Config {
    println!();
    println!("  No configuration found.  Writing defaults.");

    let mut cfg = config::Config::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Config saved to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"    _   _____    ____  _____"#.bold().cyan());
    println!("{}", r#"   / | / /   |  / __ \/ ___/"#.bold().cyan());
    println!("{}", r#"  /  |/ / /| | / /_/ /\__ \ "#.bold().cyan());
    println!("{}", r#" / /|  / ___ |/ _, _/___/ / "#.bold().cyan());
    println!("{}", r#"/_/ |_/_/  |_/_/ |_|/____/  "#.bold().cyan());
    println!();
    println!("  {} {}",
        "NARS".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Non-Axiomatic Reasoning System");
    println!();
}
