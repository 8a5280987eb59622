// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

/// oggflac - Ogg FLAC metadata CLI tool
#[derive(Parser, Debug)]
#[command(name = "oggflac")]
#[command(about = "Read and edit the metadata of FLAC streams in Ogg containers", long_about = None)]
#[command(version)]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (log scanning details)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether files are Ogg FLAC
    Detect {
        /// Audio file path(s) or glob pattern(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },

    /// Read the Vorbis comment of file(s)
    Read {
        /// Audio file path(s) or glob pattern(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// Fields to display (comma-separated)
        #[arg(long)]
        fields: Option<String>,

        /// Output to file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show audio properties and stream layout
    Info {
        /// Audio file path(s) or glob pattern(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },

    /// Edit comment fields and save
    Write {
        /// Audio file path
        #[arg(value_name = "FILE")]
        file: String,

        /// Field to set, repeat the key to store several values
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Field to remove
        #[arg(short, long, value_name = "KEY")]
        remove: Vec<String>,

        /// Read fields from a JSON object of KEY to value or list of values
        #[arg(long)]
        from_file: Option<String>,
    },

    /// Remove every embedded picture and save
    RemovePictures {
        /// Audio file path(s) or glob pattern(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },

    /// Export an embedded picture
    ExportCover {
        /// Audio file path
        #[arg(value_name = "FILE")]
        file: String,

        /// Output directory for the image
        #[arg(short, long)]
        output: String,

        /// Picture index (for files with several pictures)
        #[arg(short, long)]
        index: Option<usize>,
    },
}

impl Config {
    /// Log level implied by --quiet / --verbose
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_write_with_repeated_fields() {
        let config = Config::try_parse_from([
            "oggflac", "write", "a.oga", "--set", "ARTIST=One", "-s", "ARTIST=Two", "-r", "GENRE",
        ])
        .unwrap();

        match config.command {
            Commands::Write { file, set, remove, from_file } => {
                assert_eq!(file, "a.oga");
                assert_eq!(set, vec!["ARTIST=One", "ARTIST=Two"]);
                assert_eq!(remove, vec!["GENRE"]);
                assert!(from_file.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let config = Config::try_parse_from(["oggflac", "info", "a.oga", "-f", "json", "-v"]).unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.log_level(), LevelFilter::Debug);
    }

    #[test]
    fn files_are_required() {
        assert!(Config::try_parse_from(["oggflac", "read"]).is_err());
    }
}
