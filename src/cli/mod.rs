//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

pub mod model_list;
pub mod say;

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::core::config::Config;
use crate::server;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "A streaming chat relay for the Gemini API")]
#[command(
    long_about = "Chatrelay forwards chat conversations to the Gemini API and republishes \
the token stream to clients as server-sent events.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY    Upstream API credential (required for the server)\n\
  RUST_LOG          Log filter, e.g. chatrelay=debug\n\n\
Configuration:\n\
  Optional TOML file (listen_addr, default_model, provider_base_url,\n\
  relay_base_url) in the platform config directory."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay server (default)
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:3000
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Send a single prompt through a running relay and stream the reply
    Say {
        /// Prompt text
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
        /// Base URL of the relay
        #[arg(short, long)]
        url: Option<String>,
    },
    /// List the supported models
    Models,
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "chatrelay=info".into()),
        )
        .init();

    let args = Args::parse();
    match args.command {
        None => serve(None).await,
        Some(Commands::Serve { listen }) => serve(listen).await,
        Some(Commands::Say { prompt, model, url }) => run_say(prompt, model, url).await,
        Some(Commands::Models) => {
            list_models();
            Ok(())
        }
    }
}

async fn serve(listen: Option<String>) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if listen.is_some() {
        config.listen_addr = listen;
    }
    server::run(&config).await
}
