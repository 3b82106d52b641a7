//! Trend Radar - public attention for a keyword in the terminal
//!
//! A terminal UI application that shows search interest, news headlines,
//! Wikipedia pageviews and Bluesky posts for a topic, with CSV/PDF export
//! and an LLM-written summary.

use std::fs::OpenOptions;
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trendradar::app::App;
use trendradar::cli::{Cli, StartupConfig};
use trendradar::config::{self, Settings};
use trendradar::export;
use trendradar::pipeline::Pipeline;
use trendradar::refresh::{self, RefreshConfig, RefreshHandle, RefreshMessage};
use trendradar::summary::{self, OpenAiGenerator};
use trendradar::ui;

const DEFAULT_FILTER: &str = "trendradar=info";

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Logs to stderr; used in headless mode
fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().compact().with_writer(io::stderr))
        .init();
}

/// Logs to a file so log lines never land on the TUI
///
/// Returns the log path, or `None` if no log file could be opened.
fn init_file_logging() -> Option<PathBuf> {
    let dir = config::log_dir()?;
    std::fs::create_dir_all(&dir).ok()?;
    let path = dir.join("trendradar.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Some(path)
}

/// Runs the pipeline once and prints a digest
async fn run_headless(
    startup: &StartupConfig,
    settings: &Settings,
    pipeline: &Pipeline,
    generator: &OpenAiGenerator,
) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = settings.bluesky_credentials();
    let snapshot = pipeline.run(&startup.topic, credentials.as_ref()).await;

    let summary = if startup.summarize {
        Some(summary::summarize(generator, &snapshot).await)
    } else {
        None
    };

    print!(
        "{}",
        ui::digest(&snapshot, credentials.is_some(), summary.as_deref())
    );

    if let Some(dir) = &startup.export_dir {
        let outcome = export::export_all(dir, &snapshot, summary.as_deref())?;
        for path in &outcome.written {
            println!("wrote {}", path.display());
        }
        for error in &outcome.errors {
            eprintln!("export failed: {}", error);
        }
    }

    Ok(())
}

/// Runs the interactive dashboard until the user quits
async fn run_dashboard(
    startup: &StartupConfig,
    settings: &Settings,
    pipeline: Arc<Pipeline>,
    generator: Arc<OpenAiGenerator>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(
        pipeline,
        generator,
        settings.bluesky_credentials(),
        settings.export_dir(),
    )
    .with_startup_config(startup);

    let interval = match startup.refresh_secs {
        Some(secs) => Some(Duration::from_secs(secs)),
        None => settings.refresh_interval(),
    };
    let mut refresh_handle = RefreshHandle::spawn(RefreshConfig::from_interval(interval));

    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Initial render to show loading state
    terminal.draw(|f| ui::render(f, &app))?;
    app.load().await;

    // Main event loop
    loop {
        terminal.draw(|f| ui::render(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            break;
        }

        while let Some(RefreshMessage::Tick) = refresh::try_recv(&mut refresh_handle) {
            app.refresh_requested = true;
        }

        if app.refresh_requested {
            terminal.draw(|f| ui::render(f, &app))?;
            app.load().await;
        }
        if app.summary_requested {
            terminal.draw(|f| ui::render(f, &app))?;
            app.summarize().await;
        }
        if app.export_requested {
            app.export();
        }
    }

    refresh_handle.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let startup = match StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let settings = Settings::load(startup.config_path.as_deref())?;

    if startup.headless {
        init_stderr_logging();
    } else if init_file_logging().is_none() {
        // Nowhere safe to log while the TUI owns the terminal
        eprintln!("warning: could not open log file, logging disabled");
    }
    info!(topic = %startup.topic, headless = startup.headless, "starting");

    let pipeline = Arc::new(Pipeline::new(&settings)?);
    let generator = Arc::new(OpenAiGenerator::from_settings(&settings)?);
    if !generator.has_key() {
        warn!("no OpenAI key configured, summaries are unavailable");
    }

    if startup.headless {
        run_headless(&startup, &settings, &pipeline, &generator).await
    } else {
        run_dashboard(&startup, &settings, pipeline, generator).await
    }
}
