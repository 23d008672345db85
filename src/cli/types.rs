//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rave")]
#[command(about = "Rave - iterative research agent", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a question until the answer converges
    Ask(AskArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),

    /// List known completion models
    Models,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to research
    pub question: String,

    /// Maximum number of research iterations
    #[arg(short = 'n', long)]
    pub max_iterations: Option<u32>,

    /// Score every requirement must reach, in [0, 1]
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Load configuration from this YAML file instead of .rave/
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,

    /// Load configuration from this YAML file instead of .rave/
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (API keys redacted)
    Show,
    /// Load and validate the configuration
    Validate,
}
