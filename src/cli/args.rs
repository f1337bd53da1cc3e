//! Command-line argument parsing for lexsearch
//!
//! Provides clap-based CLI with subcommands, retrieval overrides and
//! verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::chunking::SegmenterKind;
use crate::config::Config;
use crate::retrieval::PackingPolicy;

/// lexsearch - Semantic search and grounded answers over legal texts
#[derive(Parser, Debug)]
#[command(name = "lexsearch")]
#[command(version)]
#[command(about = "Semantic search and grounded answers over legal texts", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LEXSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory (overrides paths.data_dir)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Number of nearest neighbours to retrieve
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// Relevance distance threshold
    #[arg(long, global = true)]
    pub threshold: Option<f32>,

    /// Context budget in characters
    #[arg(long, global = true)]
    pub max_context_chars: Option<usize>,

    /// Handling of the block that overflows the context budget
    #[arg(long, global = true, value_enum)]
    pub packing: Option<PackingPolicy>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean raw text files into cleaned_txt/
    Clean,

    /// Segment cleaned files into the chunk corpus
    Chunk {
        /// Segmentation strategy (overrides chunking.strategy)
        #[arg(long, value_enum)]
        strategy: Option<SegmenterKind>,
    },

    /// Embed the chunk corpus and write the index artifacts
    Index,

    /// Run clean, chunk and index in sequence
    Build {
        /// Segmentation strategy (overrides chunking.strategy)
        #[arg(long, value_enum)]
        strategy: Option<SegmenterKind>,
    },

    /// List the nearest chunks for a query
    Search {
        /// Query text
        query: String,
    },

    /// Answer one question
    Ask {
        /// Question text
        question: String,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive question loop
    Chat,

    /// Serve the answer endpoint over HTTP
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.paths.data_dir = dir.clone();
        }
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(threshold) = self.threshold {
            config.retrieval.distance_threshold = threshold;
        }
        if let Some(max_chars) = self.max_context_chars {
            config.retrieval.max_context_chars = max_chars;
        }
        if let Some(packing) = self.packing {
            config.retrieval.packing = packing;
        }
        match &self.command {
            Commands::Chunk { strategy: Some(kind) } | Commands::Build { strategy: Some(kind) } => {
                config.chunking.strategy = *kind;
            }
            Commands::Serve { bind: Some(bind) } => {
                config.server.bind = bind.clone();
            }
            _ => {}
        }
    }
}

impl Verbosity {
    /// Default tracing filter directive
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_flags() {
        let args = Args::parse_from(["lexsearch", "-q", "chat"]);
        assert_eq!(args.verbosity(), Verbosity::Quiet);
        assert!(!args.verbosity().show_progress());

        let args = Args::parse_from(["lexsearch", "-vv", "chat"]);
        assert_eq!(args.verbosity(), Verbosity::VeryVerbose);
        assert_eq!(args.verbosity().filter_directive(), "trace");

        let args = Args::parse_from(["lexsearch", "chat"]);
        assert_eq!(args.verbosity().filter_directive(), "info");
    }

    #[test]
    fn test_retrieval_overrides() {
        let args = Args::parse_from([
            "lexsearch",
            "--top-k",
            "8",
            "--threshold",
            "7.5",
            "--max-context-chars",
            "3000",
            "--packing",
            "truncate",
            "search",
            "working hours",
        ]);
        let mut config = Config::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.distance_threshold, 7.5);
        assert_eq!(config.retrieval.max_context_chars, 3000);
        assert_eq!(config.retrieval.packing, PackingPolicy::Truncate);
        assert!(matches!(args.command, Commands::Search { ref query } if query == "working hours"));
    }

    #[test]
    fn test_strategy_and_bind_overrides() {
        let args = Args::parse_from(["lexsearch", "build", "--strategy", "articles"]);
        let mut config = Config::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.chunking.strategy, SegmenterKind::Articles);

        let args = Args::parse_from(["lexsearch", "serve", "--bind", "0.0.0.0:9000"]);
        args.apply_overrides(&mut config);
        assert_eq!(config.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_ask_json_flag() {
        let args = Args::parse_from(["lexsearch", "ask", "--json", "What is the trial period?"]);
        assert!(matches!(args.command, Commands::Ask { json: true, .. }));
    }

    #[test]
    fn test_requires_subcommand() {
        assert!(Args::try_parse_from(["lexsearch"]).is_err());
    }
}
