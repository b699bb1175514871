//! Input Listeners CLI
//!
//! Prints global keyboard and mouse events as they are dispatched.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use input_listeners::{
    callback, check_permission, Config, KeyboardDispatcher, KeyboardEvent, MouseDispatcher,
    MouseEvent, SourceConfig, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "input-listen")]
#[command(version = VERSION)]
#[command(about = "Dispatch global keyboard and mouse events to callbacks", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for input and print every dispatched event
    Listen {
        /// Input sources to listen to (keyboard, mouse, or all)
        #[arg(long)]
        sources: Option<String>,
    },

    /// Inject each character of TEXT through the keyboard dispatcher
    Trigger {
        text: String,
    },

    /// Check whether a global input hook can be installed
    Check,

    /// Show configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Commands::Listen { sources } => cmd_listen(&config, sources.as_deref()),
        Commands::Trigger { text } => cmd_trigger(&text),
        Commands::Check => {
            cmd_check();
            Ok(())
        }
        Commands::Config => cmd_config(&config, cli.config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Could not load config from {}", path.display())),
        None => Config::load().context("Could not load config"),
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_keyboard_event(event: &KeyboardEvent) {
    match &event.key {
        Some(key) if key.chars().count() == 1 => {
            println!("[{}] key: {key}", event.timestamp().format("%H:%M:%S%.3f"))
        }
        Some(key) => println!(
            "[{}] control key: {key}",
            event.timestamp().format("%H:%M:%S%.3f")
        ),
        None => println!(
            "[{}] unidentified key",
            event.timestamp().format("%H:%M:%S%.3f")
        ),
    }
}

fn print_mouse_event(event: &MouseEvent) {
    println!(
        "[{}] {} click at ({};{})",
        event.timestamp().format("%H:%M:%S%.3f"),
        event.button,
        event.x,
        event.y
    );
}

fn cmd_listen(config: &Config, sources: Option<&str>) -> Result<()> {
    println!("Input Listeners v{VERSION}");
    println!();

    if !check_permission() {
        eprintln!("Error: Input hook permission not granted.");
        eprintln!();
        eprintln!("On macOS:");
        eprintln!("1. Open System Settings > Privacy & Security");
        eprintln!("2. Select 'Input Monitoring'");
        eprintln!("3. Add this application to the allowed list");
        eprintln!("4. Restart the application");
        std::process::exit(1);
    }

    let sources = sources.map(SourceConfig::from_csv).unwrap_or(config.sources);
    if !sources.any_enabled() {
        bail!("At least one source must be enabled (keyboard or mouse)");
    }

    let mut keyboard = KeyboardDispatcher::new();
    let mut mouse = MouseDispatcher::new();

    if sources.keyboard {
        keyboard.add_callback(callback(print_keyboard_event));
        keyboard.start().context("Error starting keyboard listener")?;
    }
    if sources.mouse {
        mouse.add_callback(callback(print_mouse_event));
        mouse.start().context("Error starting mouse listener")?;
    }

    println!(
        "  Keyboard: {}",
        if sources.keyboard { "enabled" } else { "disabled" }
    );
    println!(
        "  Mouse: {}",
        if sources.mouse { "enabled" } else { "disabled" }
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    println!();
    println!("Stopping listeners...");
    keyboard.stop();
    mouse.stop();

    println!();
    if sources.keyboard {
        println!("{}", keyboard.stats().summary("Keyboard"));
    }
    if sources.mouse {
        println!("{}", mouse.stats().summary("Mouse"));
    }

    Ok(())
}

fn cmd_trigger(text: &str) -> Result<()> {
    let keyboard = KeyboardDispatcher::new();
    keyboard.add_callback(callback(print_keyboard_event));

    for c in text.chars() {
        keyboard.trigger(c);
    }

    println!();
    println!("{}", keyboard.stats().summary("Keyboard"));
    Ok(())
}

fn cmd_check() {
    print!("Checking input hook permission... ");
    if check_permission() {
        println!("OK ✓");
    } else {
        println!("FAILED ✗");
    }
}

fn cmd_config(config: &Config, explicit: Option<&Path>) -> Result<()> {
    let path = Config::effective_path(explicit);
    if path.exists() {
        println!("Configuration file: {}", path.display());
    } else {
        println!("Configuration file: {} (not found, using defaults)", path.display());
    }
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
