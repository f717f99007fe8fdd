//! lex-quality CLI
//!
//! Command-line interface for profiling a CSV table and detecting anomalous
//! rows. Every command prints JSON to stdout; logs go to stderr.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use lex_quality::{
    AnomalyConfig, Contamination, DeclaredSchema, FillValues, ProfileConfig, QualityService,
    ReportGenerator, TableId, TableStore,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "lex-quality",
    version,
    about = "Profile a CSV table and explain its anomalous rows",
    long_about = "Profile a CSV table and explain its anomalous rows.\n\n\
                  Anomalies are found with an isolation forest over the numeric columns. \
                  Each flagged row lists the columns more than --deviation-threshold \
                  standard deviations from their mean.\n\n\
                  EXAMPLES:\n  \
                  # Flagged rows with their problem columns\n  \
                  lex-quality detect -i data.csv\n\n  \
                  # Expect about 1% anomalies, only look at two columns\n  \
                  lex-quality detect -i data.csv --contamination 0.01 --columns price,qty\n\n  \
                  # Check declared column types\n  \
                  lex-quality validate -i data.csv --schema '{\"id\": \"int\", \"price\": \"float\"}'\n\n  \
                  # Fill nulls and write the result\n  \
                  lex-quality fill -i data.csv --values fill.json -o cleaned_data.csv"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Path to the CSV file to check
    #[arg(short, long)]
    input: PathBuf,
}

#[derive(Args, Debug)]
struct DetectionArgs {
    /// Number of isolation trees
    #[arg(long, default_value = "100")]
    n_estimators: usize,

    /// Maximum rows sampled per tree
    #[arg(long, default_value = "256")]
    max_samples: usize,

    /// "auto" or the expected fraction of anomalous rows (0.0 - 0.5]
    #[arg(long, default_value = "auto", value_parser = parse_contamination)]
    contamination: Contamination,

    /// Seed for tree construction
    #[arg(long, default_value = "42")]
    random_state: u64,

    /// Standard deviations from the mean that mark a problem column
    #[arg(long, default_value = "2.0")]
    deviation_threshold: f64,

    /// Comma-separated feature columns (default: every numeric column)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Replace missing feature values with the column mean instead of
    /// skipping their rows
    #[arg(long)]
    impute_missing: bool,
}

impl DetectionArgs {
    fn to_config(&self) -> Result<AnomalyConfig> {
        let mut builder = AnomalyConfig::builder()
            .n_estimators(self.n_estimators)
            .max_samples(self.max_samples)
            .contamination(self.contamination)
            .random_state(self.random_state)
            .deviation_threshold(self.deviation_threshold)
            .impute_missing(self.impute_missing);

        if !self.columns.is_empty() {
            builder = builder.columns(self.columns.iter().cloned());
        }

        Ok(builder.build()?)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List anomalous rows with their scores and problem columns
    Detect {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Anomaly score of every complete numeric row
    Scores {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Infer a primitive type for every column
    Schema {
        #[command(flatten)]
        input: InputArgs,

        /// Leading rows sampled for inference
        #[arg(long, default_value = "100")]
        sample_rows: usize,
    },

    /// Check declared column types against the data
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Declared schema: inline JSON object or path to a JSON file
        #[arg(long)]
        schema: String,
    },

    /// Fraction of missing values per column
    NullRates {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Fill missing values with per-column constants and write the result
    Fill {
        #[command(flatten)]
        input: InputArgs,

        /// Fill values: inline JSON object or path to a JSON file
        #[arg(long)]
        values: String,

        /// Where to write the filled CSV
        #[arg(short, long, default_value = "cleaned_data.csv")]
        output: PathBuf,
    },

    /// First rows of the table as JSON records
    Snapshot {
        #[command(flatten)]
        input: InputArgs,

        /// Number of rows
        #[arg(short = 'n', long, default_value = "10")]
        rows: usize,
    },

    /// Run every check and print a combined report
    Report {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        detection: DetectionArgs,

        /// Declared schema: inline JSON object or path to a JSON file
        #[arg(long)]
        schema: Option<String>,

        /// Null rate above which a column is reported (0.0 - 1.0)
        #[arg(long, default_value = "0.5")]
        high_null_threshold: f64,

        /// Also write the report to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Command {
    fn input(&self) -> &Path {
        match self {
            Command::Detect { input, .. }
            | Command::Scores { input, .. }
            | Command::Schema { input, .. }
            | Command::Validate { input, .. }
            | Command::NullRates { input }
            | Command::Fill { input, .. }
            | Command::Snapshot { input, .. }
            | Command::Report { input, .. } => &input.input,
        }
    }

    /// Profiling commands print an empty result for a table that is missing
    /// or cannot be parsed.
    fn tolerates_unreadable_input(&self) -> bool {
        matches!(
            self,
            Command::Schema { .. } | Command::NullRates { .. } | Command::Snapshot { .. }
        )
    }
}

/// Load the command's input into `store` under `id`.
///
/// A missing file is logged and left for the service to report, so every
/// command answers in its usual shape. Parse failures abort, except for the
/// profiling commands, which continue without the table.
fn load_input(store: &TableStore, id: &TableId, command: &Command) -> Result<()> {
    let input = command.input();
    if let Err(e) = store.load_csv(id.clone(), input) {
        if !e.is_missing_input() && !command.tolerates_unreadable_input() {
            return Err(anyhow!(e).context(format!("Loading {}", input.display())));
        }
        warn!("{}", e);
    }
    Ok(())
}

fn parse_contamination(s: &str) -> std::result::Result<Contamination, String> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(Contamination::Auto);
    }
    s.parse::<f64>()
        .map(Contamination::Fraction)
        .map_err(|_| format!("expected \"auto\" or a fraction, got '{}'", s))
}

/// Parse a JSON object given inline or as a path to a file.
fn read_json_arg<T: serde::de::DeserializeOwned>(arg: &str) -> Result<T> {
    let trimmed = arg.trim_start();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).context("Parsing inline JSON");
    }
    let content = std::fs::read_to_string(arg).with_context(|| format!("Reading {}", arg))?;
    serde_json::from_str(&content).with_context(|| format!("Parsing {}", arg))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize the tracing subscriber. Logs are written to stderr so stdout
/// only carries JSON.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.quiet);

    let store = Arc::new(TableStore::new());
    let id = TableId::new("input");

    load_input(&store, &id, &cli.command)?;

    let service = QualityService::new(Arc::clone(&store));

    match &cli.command {
        Command::Detect { detection, .. } => {
            let service = service.with_anomaly_config(detection.to_config()?);
            print_json(&service.detect_anomalies(&id)?)
        }
        Command::Scores { detection, .. } => {
            let service = service.with_anomaly_config(detection.to_config()?);
            print_json(&service.anomaly_scores(&id)?)
        }
        Command::Schema { sample_rows, .. } => {
            let profile = ProfileConfig::builder().schema_sample_rows(*sample_rows).build()?;
            print_json(&service.with_profile_config(profile).infer_schema(&id))
        }
        Command::Validate { schema, .. } => {
            let declared: DeclaredSchema = read_json_arg(schema)?;
            print_json(&service.validate_schema(&id, &declared)?)
        }
        Command::NullRates { .. } => print_json(&service.null_rates(&id)),
        Command::Fill { values, output, .. } => {
            let values: FillValues = read_json_arg(values)?;
            let report = service.fill_nulls(&id, &values)?;
            store.export_filled(&id, output)?;
            info!("Filled table written to {}", output.display());
            print_json(&report)
        }
        Command::Snapshot { rows, .. } => {
            let profile = ProfileConfig::builder().snapshot_rows(*rows).build()?;
            print_json(&service.with_profile_config(profile).snapshot(&id))
        }
        Command::Report {
            detection,
            schema,
            high_null_threshold,
            output,
            ..
        } => {
            let declared: Option<DeclaredSchema> =
                schema.as_deref().map(read_json_arg::<DeclaredSchema>).transpose()?;
            let profile = ProfileConfig::builder()
                .high_null_threshold(*high_null_threshold)
                .build()?;

            let report = service
                .with_anomaly_config(detection.to_config()?)
                .with_profile_config(profile)
                .run_checks(&id, declared.as_ref())?;

            if let Some(path) = output {
                ReportGenerator::write_report_to_file(&report, path)?;
            }
            print_json(&report)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contamination() {
        assert_eq!(parse_contamination("auto"), Ok(Contamination::Auto));
        assert_eq!(parse_contamination("0.05"), Ok(Contamination::Fraction(0.05)));
        assert!(parse_contamination("lots").is_err());
    }

    #[test]
    fn test_read_inline_json() {
        let declared: DeclaredSchema = read_json_arg(r#"{"b": "int", "a": "str"}"#).unwrap();
        let keys: Vec<&String> = declared.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    fn malformed_fixture() -> String {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/malformed.csv")
            .display()
            .to_string()
    }

    fn parse_command(args: &[&str]) -> Command {
        Cli::try_parse_from(std::iter::once("lex-quality").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_profiling_commands_tolerate_malformed_csv() {
        let input = malformed_fixture();

        for name in ["schema", "null-rates", "snapshot"] {
            let store = TableStore::new();
            let id = TableId::new("input");
            let command = parse_command(&[name, "-i", &input]);

            assert!(load_input(&store, &id, &command).is_ok(), "{} failed", name);
            assert!(!store.contains(&id));
        }
    }

    #[test]
    fn test_other_commands_reject_malformed_csv() {
        let input = malformed_fixture();

        for args in [
            vec!["detect", "-i", input.as_str()],
            vec!["validate", "-i", input.as_str(), "--schema", "{}"],
            vec!["fill", "-i", input.as_str(), "--values", "{}"],
        ] {
            let store = TableStore::new();
            let command = parse_command(&args);
            assert!(load_input(&store, &TableId::new("input"), &command).is_err());
        }
    }

    #[test]
    fn test_missing_file_is_left_to_the_service() {
        let store = TableStore::new();
        let command = parse_command(&["detect", "-i", "/nonexistent/data.csv"]);
        assert!(load_input(&store, &TableId::new("input"), &command).is_ok());
    }

    #[test]
    fn test_cli_parses_detect() {
        let cli = Cli::try_parse_from([
            "lex-quality",
            "detect",
            "-i",
            "data.csv",
            "--contamination",
            "0.1",
            "--columns",
            "a,b",
            "--impute-missing",
        ])
        .unwrap();

        match cli.command {
            Command::Detect { input, detection } => {
                assert_eq!(input.input, PathBuf::from("data.csv"));
                assert_eq!(detection.columns, vec!["a".to_string(), "b".to_string()]);
                let config = detection.to_config().unwrap();
                assert_eq!(config.contamination, Contamination::Fraction(0.1));
                assert!(config.impute_missing);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
