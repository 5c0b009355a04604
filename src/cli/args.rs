use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "embrace-processor")]
#[command(about = "EMBRACE one-second magnetometer archive processor")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide progress bars")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "TOML settings file")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Parquet,
    Csv,
    Both,
}

impl OutputFormat {
    pub fn parquet(&self) -> bool {
        matches!(self, OutputFormat::Parquet | OutputFormat::Both)
    }

    pub fn csv(&self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble daily one-second series from an archive tree
    Process {
        #[arg(short, long, help = "Archive root ({root}/{year}/{STN}/*.zip)")]
        input_dir: PathBuf,

        #[arg(
            short,
            long,
            help = "Parquet file for all series [default: output/embrace-series-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, default_value = "output", help = "Directory for CSV and merged output")]
        output_dir: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Parquet)]
        format: OutputFormat,

        #[arg(long, help = "Also write one merged multi-station file per day")]
        merge: bool,

        #[arg(long, help = "Two-digit years at or above this are 19xx")]
        century_pivot: Option<u8>,

        #[arg(long, help = "Year for archives outside a {year} directory")]
        default_year: Option<i32>,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long, help = "Per-file read timeout in seconds")]
        io_timeout: Option<u64>,

        #[arg(long)]
        max_retries: Option<u32>,

        #[arg(short, long)]
        compression: Option<String>,

        #[arg(long, help = "Fail a merge when a required station is absent")]
        strict_merge: bool,

        #[arg(long, value_delimiter = ',', help = "Stations every merged day must contain")]
        required_stations: Option<Vec<String>>,

        #[arg(long, help = "Station table (CSV or readme) replacing the built-in one")]
        station_catalog: Option<PathBuf>,

        #[arg(long, help = "Write the per-file outcome list as JSON")]
        summary_json: Option<PathBuf>,

        #[arg(long, help = "Inspect and parse only; write no output")]
        validate_only: bool,
    },

    /// List the archives under a root and how they partition
    Inspect {
        #[arg(short, long)]
        input_dir: PathBuf,

        #[arg(long)]
        century_pivot: Option<u8>,

        #[arg(long)]
        default_year: Option<i32>,

        #[arg(long, help = "Extract the raw member of every archive to this directory")]
        extract_to: Option<PathBuf>,
    },

    /// Display information about a Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::try_parse_from([
            "embrace-processor",
            "--quiet",
            "process",
            "--input-dir",
            "data",
            "--century-pivot",
            "70",
            "--format",
            "both",
            "--required-stations",
            "sjc,vss",
        ])
        .unwrap();

        assert!(cli.quiet);
        match cli.command {
            Commands::Process {
                century_pivot,
                format,
                required_stations,
                merge,
                ..
            } => {
                assert_eq!(century_pivot, Some(70));
                assert_eq!(format, OutputFormat::Both);
                assert_eq!(
                    required_stations,
                    Some(vec!["sjc".to_string(), "vss".to_string()])
                );
                assert!(!merge);
            }
            _ => panic!("expected process"),
        }
    }
}
