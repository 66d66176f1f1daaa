// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// oggframe - Ogg stream framing tool
#[derive(Parser, Debug)]
#[command(name = "oggframe")]
#[command(about = "Copy, inspect and summarize Ogg streams page by page", long_about = None)]
#[command(version)]
#[command(author = "xwsjjctz <xwsjjctz@icloud.com>")]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (only errors are logged)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (log resync and reassembly details)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for page listings and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON, one record per line
    Json,
    /// Aligned key/value table
    Table,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a stream and re-encode its packets (stdin to stdout by default)
    Copy {
        /// Input file, "-" for stdin
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,

        /// Output file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the pages of Ogg file(s)
    Inspect {
        /// File path(s) or glob pattern(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// Include packet data (base64)
        #[arg(short, long)]
        data: bool,
    },

    /// Summarize Ogg file(s)
    Info {
        /// File path(s) or glob pattern(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },
}

impl Config {
    /// Default log filter when RUST_LOG is not set
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_copy() {
        let config = Config::parse_from(["oggframe", "copy", "in.ogg", "-o", "out.ogg"]);
        match config.command {
            Commands::Copy { input, output } => {
                assert_eq!(input, Some(PathBuf::from("in.ogg")));
                assert_eq!(output, Some(PathBuf::from("out.ogg")));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(config.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let config =
            Config::parse_from(["oggframe", "inspect", "a.ogg", "--format", "table", "-v"]);
        assert_eq!(config.format, OutputFormat::Table);
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn test_inspect_requires_files() {
        assert!(Config::try_parse_from(["oggframe", "inspect"]).is_err());
    }
}
