//! Command-line argument parsing for querygate.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Authorization gateway for LLM-generated SQL.
#[derive(Parser, Debug)]
#[command(name = "querygate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config and QUERYGATE_DATABASE)
    #[arg(short = 'd', long, value_name = "PATH", global = true)]
    pub database: Option<PathBuf>,

    /// LLM provider: openai, ollama or mock (overrides config)
    #[arg(long, value_name = "PROVIDER", global = true)]
    pub llm: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate SQL for a question and run it through the gateway
    Ask {
        /// Caller role used for table authorization
        #[arg(short, long)]
        role: String,

        /// Natural-language question
        question: String,
    },

    /// Run an already generated statement through the gateway
    Run {
        /// Caller role used for table authorization
        #[arg(short, long)]
        role: String,

        /// Question the statement answers; drives output shaping
        #[arg(short, long, default_value = "")]
        question: String,

        /// SQL statement, or "-" to read it from stdin
        sql: String,
    },

    /// Print the store schema as the SQL generator sees it
    Schema,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(querygate::config::Config::default_path)
    }
}
