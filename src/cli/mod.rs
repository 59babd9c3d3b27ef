pub mod commands;
pub mod formatter;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wayback",
    version,
    about = "Reconstruct the geometry history of OpenStreetMap features",
    long_about = "Wayback rebuilds every historical geometry of a feature from its own version \
                  records and the timelines of the points it references, including the minor \
                  versions caused by edits to those points alone."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconstruct historical geometries from a history-enriched GeoJSON sequence
    Reconstruct(commands::reconstruct::ReconstructArgs),

    /// Show or initialize the configuration file
    Config(commands::config::ConfigArgs),
}

/// How the run statistics are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatsFormat {
    Text,
    Json,
    None,
}

impl std::str::FromStr for StatsFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "table" => Ok(StatsFormat::Text),
            "json" => Ok(StatsFormat::Json),
            "none" | "off" => Ok(StatsFormat::None),
            _ => Err(format!("Unknown stats format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_reconstruct() {
        let cli = Cli::try_parse_from([
            "wayback",
            "-j",
            "4",
            "reconstruct",
            "history.geojsonseq.gz",
            "-o",
            "out.geojsonseq",
            "--write-mode",
            "history_object",
            "--include-diffs",
            "--stats-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.threads, Some(4));
        match cli.command {
            Commands::Reconstruct(args) => {
                assert_eq!(args.input.to_str(), Some("history.geojsonseq.gz"));
                assert!(args.include_diffs);
                assert!(!args.geometry_only);
                assert_eq!(args.stats_format, StatsFormat::Json);
                assert_eq!(
                    args.write_mode,
                    Some(crate::config::WriteMode::HistoryObject)
                );
            }
            _ => panic!("expected reconstruct"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_write_mode() {
        let result = Cli::try_parse_from(["wayback", "reconstruct", "--write-mode", "shapefile"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_format_from_str() {
        let cases = vec![
            ("text", Some(StatsFormat::Text)),
            ("JSON", Some(StatsFormat::Json)),
            ("off", Some(StatsFormat::None)),
            ("xml", None),
        ];
        for (input, expected) in cases {
            assert_eq!(input.parse::<StatsFormat>().ok(), expected);
        }
    }
}
