//! CLI module for docchat
//!
//! Provides command-line interface parsing for the docchat binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docchat - ask questions about your documentation
///
/// Indexes a plain-text corpus into a vector store, then answers questions
/// by rewriting them, retrieving the closest chunks and generating a
/// grounded answer.
#[derive(Parser, Debug)]
#[command(
    name = "docchat",
    version,
    about = "docchat - documentation Q&A with retrieval-augmented generation",
    long_about = "Indexes a plain-text corpus into a vector store, then answers questions\n\
                  by rewriting them into standalone form, retrieving the closest chunks\n\
                  and generating an answer grounded in those chunks.",
    after_help = "EXAMPLES:\n    \
                  docchat index scrimba-info.txt --replace   # Build the index\n    \
                  docchat ask \"What is Scrimba?\"             # One-shot question\n    \
                  docchat chat                               # Interactive session\n    \
                  docchat --config my.toml config --validate # Check a config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "docchat.toml", global = true, env = "DOCCHAT_CONFIG")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, embed and store a UTF-8 text corpus
    Index {
        /// Corpus file to index
        corpus: PathBuf,

        /// Source name stored in each chunk's metadata (defaults to the file name)
        #[arg(short, long)]
        source: Option<String>,

        /// Drop previously indexed records before writing
        #[arg(long)]
        replace: bool,
    },

    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,

        /// Also print the standalone question and retrieved chunks
        #[arg(long)]
        show_context: bool,
    },

    /// Start an interactive chat session on stdin
    Chat,

    /// Show configuration information
    Config {
        /// Validate the configuration file and referenced environment variables
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
