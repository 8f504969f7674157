mod api;
mod app;
mod config;
mod models;
mod routes;
mod session;
mod ui;
mod validators;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use log::error;
use ratatui::prelude::*;

use crate::app::{App, AppResult};
use crate::config::Config;
use crate::session::SessionStore;
use crate::ui::ui;

/// Terminal client for an email marketing backend
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to config file
    #[clap(short, long, default_value = "~/.config/mailcaster/config.json")]
    config: String,

    /// API base URL override (not persisted)
    #[clap(long)]
    api_url: Option<String>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the signed-in user's email
    Whoami,

    /// Clear the stored session
    Logout,

    /// Persist a new API base URL
    SetServer {
        /// Base URL, e.g. https://api.example.com
        #[clap(short, long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if args.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    // Load configuration
    let config_path = shellexpand::tilde(&args.config).into_owned();
    let mut config = Config::load(&config_path).unwrap_or_else(|_| {
        println!("No config found at {}. Using defaults.", config_path);
        Config::default()
    });

    if let Some(url) = args.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }

    // Handle subcommands
    if let Some(cmd) = args.command {
        match cmd {
            Commands::Whoami => {
                let session = SessionStore::new()?;
                match session.user_email() {
                    Some(email) => println!("{}", email),
                    None => println!("Not signed in."),
                }
                return Ok(());
            }
            Commands::Logout => {
                let session = SessionStore::new()?;
                session.clear()?;
                println!("Session cleared.");
                return Ok(());
            }
            Commands::SetServer { url } => {
                config.api_base_url = url.trim_end_matches('/').to_string();

                if let Err(e) = config.save(&config_path) {
                    println!("Failed to save config: {}", e);
                    return Ok(());
                }

                println!("API base URL set to {}", config.api_base_url);
                return Ok(());
            }
        }
    }

    // Save config in case it was created for the first time
    if let Err(e) = config.save(&config_path) {
        println!("Failed to save config: {}", e);
    }

    let session = SessionStore::new()?;

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    io::stdout()
        .execute(EnterAlternateScreen)
        .context("Failed to enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("Failed to create terminal")?;

    // Create app state
    let mut app = App::new(config, session);

    // Run the application
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    io::stdout()
        .execute(LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;

    // If there was an error, print it
    if let Err(err) = result {
        error!("Error: {:?}", err);
        println!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> AppResult<()> {
    // Mount the entry route before the first draw
    app.init().await?;

    let mut consecutive_errors = 0;
    const MAX_CONSECUTIVE_ERRORS: u32 = 10;

    loop {
        // Draw UI
        if let Err(e) = terminal.draw(|frame| ui(frame, app)) {
            consecutive_errors += 1;
            if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                return Err(app::AppError::Io(e));
            }
            continue;
        }

        // Handle events
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Handle input with error recovery
                    if let Err(e) = app.handle_key_event(key).await {
                        app.show_error(&format!("Error: {}", e));
                        consecutive_errors += 1;

                        // If we have too many consecutive errors, exit
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            return Err(e);
                        }
                    } else {
                        // Reset error counter on successful operation
                        consecutive_errors = 0;
                    }

                    // Check if we should exit
                    if app.should_quit {
                        return Ok(());
                    }
                }
            }
        }

        // Expire stale status messages
        app.tick();
    }
}
