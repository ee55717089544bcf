// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wadesk - WhatsApp multi-session desk.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod session;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wadesk_config::WadeskConfig;

/// Wadesk - WhatsApp multi-session desk.
#[derive(Parser, Debug)]
#[command(name = "wadesk", version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log this workspace's crates at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the engine and the UI gateway.
    Serve,
    /// Manage registered sessions.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Query a running instance.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    /// Register a session for a user, or move it to that user.
    Add {
        /// Session name, used as the bridge session id.
        session: String,
        /// Owning user id.
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Load and validate the configuration, then print a summary.
    Check,
}

fn load_config(path: Option<&PathBuf>) -> WadeskConfig {
    let loaded = match path {
        Some(path) => wadesk_config::load_and_validate_path(path),
        None => wadesk_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            wadesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over `verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose {
        "info,wadesk=debug,wadesk_core=debug,wadesk_engine=debug,wadesk_gateway=debug,\
         wadesk_bridge=debug,wadesk_storage=debug,wadesk_openai=debug,wadesk_transcribe=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Session {
            action: SessionAction::Add { session, user },
        }) => session::run_session_add(&config, &session, &user).await,
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            print_config_summary(&config);
            Ok(())
        }
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        None => {
            println!("wadesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config_summary(config: &WadeskConfig) {
    println!("config OK");
    println!("  server:     {}:{}", config.server.host, config.server.port);
    println!("  auth:       {} token(s)", config.auth.tokens.len());
    println!("  database:   {}", config.storage.database_path);
    println!("  bridge:     {}", config.bridge.base_url);
    println!(
        "  ai:         {} (model {}, timezone {})",
        if config.ai.enabled { "enabled" } else { "disabled" },
        config.ai.model,
        config.ai.timezone
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_session_add() {
        let cli = Cli::parse_from(["wadesk", "session", "add", "shop-1", "--user", "u1"]);
        match cli.command {
            Some(Commands::Session {
                action: SessionAction::Add { session, user },
            }) => {
                assert_eq!(session, "shop-1");
                assert_eq!(user, "u1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_global_flags() {
        let cli = Cli::parse_from(["wadesk", "--config", "/tmp/w.toml", "-v", "serve"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/w.toml")));
        assert!(matches!(cli.command, Some(Commands::Serve)));
    }

    #[test]
    fn session_add_requires_user() {
        assert!(Cli::try_parse_from(["wadesk", "session", "add", "shop-1"]).is_err());
    }
}
