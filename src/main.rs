//! Binary entry point for steam-mcp.
//!
//! Runs the MCP server, or calls a single Steam operation from the command line.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use steam_mcp::mcp::{McpServer, Transport};
use steam_mcp::observability::{self, InitOptions};
use steam_mcp::steam::{
    format_achievement_report, format_guide_content, format_guide_search, format_owned_games,
    format_recent_games,
};
use steam_mcp::{SteamClient, SteamMcpConfig};

/// steam-mcp - Steam achievements and community guides for AI assistants.
#[derive(Parser)]
#[command(name = "steam-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Start MCP server.
    Serve {
        /// Transport type: stdio or http.
        #[arg(short, long, default_value = "stdio", value_parser = ["stdio", "http"])]
        transport: String,

        /// Port for HTTP transport (default: from config, 8099).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show achievements of the configured player for a game.
    Achievements {
        /// Steam AppID of the game.
        app_id: u32,
    },

    /// Search top-rated community guides for a game.
    Guides {
        /// Steam AppID of the game.
        app_id: u32,

        /// Search keywords.
        query: String,
    },

    /// Show a community guide.
    Guide {
        /// Guide ID.
        guide_id: String,

        /// Query selecting relevant sections of large guides.
        #[arg(short, long)]
        query: Option<String>,
    },

    /// List owned games.
    Owned,

    /// List games played in the last two weeks.
    Recent,

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match SteamMcpConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let expose_metrics = matches!(cli.command, Commands::Serve { .. });
    if let Err(e) = observability::init_from_config(
        &config.observability,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: SteamMcpConfig) -> steam_mcp::Result<()> {
    match command {
        Commands::Serve { transport, port } => cmd_serve(&config, &transport, port),
        Commands::Achievements { app_id } => {
            let report = SteamClient::new(&config).game_achievements(app_id)?;
            println!("{}", format_achievement_report(app_id, &report));
            Ok(())
        },
        Commands::Guides { app_id, query } => {
            let guides = SteamClient::new(&config).search_guides(app_id, &query)?;
            println!("{}", format_guide_search(app_id, &query, &guides));
            Ok(())
        },
        Commands::Guide { guide_id, query } => {
            let content = SteamClient::new(&config).fetch_guide(&guide_id, query.as_deref())?;
            println!("{}", format_guide_content(guide_id.trim(), &content));
            Ok(())
        },
        Commands::Owned => {
            let games = SteamClient::new(&config).owned_games()?;
            println!("{}", format_owned_games(&games));
            Ok(())
        },
        Commands::Recent => {
            let games = SteamClient::new(&config).recently_played_games()?;
            println!("{}", format_recent_games(&games));
            Ok(())
        },
        Commands::Config { show } => {
            cmd_config(&config, show);
            Ok(())
        },
    }
}

/// Config command.
fn cmd_config(config: &SteamMcpConfig, show: bool) {
    if show {
        println!("Current Configuration");
        println!("=====================");
        println!();
        println!("{}", config.display_redacted());
    } else {
        println!("Use --show to display configuration");
    }
}

/// Serve command.
fn cmd_serve(config: &SteamMcpConfig, transport: &str, port: Option<u16>) -> steam_mcp::Result<()> {
    let transport_type = match transport {
        "http" => Transport::Http,
        _ => Transport::Stdio,
    };

    let server = McpServer::from_config(config).with_transport(transport_type);
    let server = match port {
        Some(port) => server.with_port(port),
        None => server,
    };

    if !server.tools().client().has_credentials() {
        tracing::warn!(
            "API_KEY or STEAM_ID not set; achievement and library tools will report an error"
        );
    }

    server.start()
}
