use crate::cli::formatter::{create_spinner, print_stats_table, print_success, print_warning};
use crate::cli::StatsFormat;
use crate::config::{resolve_config, Config, WriteMode};
use crate::io::{open_input, open_output};
use crate::processing::{run_pipeline_with_progress, ProcessingStats};
use crate::utils::format::{format_bytes, format_number};
use crate::utils::parallel::{batch_size_for_parallelism, configure_thread_pool, resolve_thread_count};
use crate::WaybackError;
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Args)]
pub struct ReconstructArgs {
    /// History-enriched GeoJSON sequence (`.gz` accepted, `-` for stdin)
    #[arg(value_name = "INPUT", default_value = "-")]
    pub input: PathBuf,

    /// Output file (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Configuration file (default: <config dir>/wayback/config.toml)
    #[arg(long, value_name = "FILE", env = "WAYBACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only emit geometry and validity interval per version
    #[arg(long)]
    pub geometry_only: bool,

    /// Attach attribute diffs to the first minor of each major version
    #[arg(long)]
    pub include_diffs: bool,

    /// Omit full attribute snapshots on every version
    #[arg(long)]
    pub no_full_properties: bool,

    /// Output layout: every_geometry, history_object or topology
    #[arg(long, value_name = "MODE")]
    pub write_mode: Option<WriteMode>,

    /// Lines per parallel batch
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Run statistics format: text, json or none
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub stats_format: StatsFormat,
}

impl ReconstructArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if self.geometry_only {
            config.output.geometry_only = true;
        }
        if self.include_diffs {
            config.output.include_diffs_on_major_versions = true;
        }
        if self.no_full_properties {
            config.output.include_full_properties_on_major_versions = false;
            config.output.include_full_properties_on_minor_versions = false;
        }
        if let Some(mode) = self.write_mode {
            config.output.write_mode = mode;
        }
        if let Some(batch_size) = self.batch_size {
            config.performance.batch_size = batch_size;
        }
    }
}

/// An explicit `--batch-size` is used as given; otherwise the configured size
/// is raised to keep every thread busy.
fn effective_batch_size(explicit: Option<usize>, configured: usize, threads: usize) -> usize {
    match explicit {
        Some(size) => size.max(1),
        None => batch_size_for_parallelism(configured, threads),
    }
}

pub fn run(args: ReconstructArgs, threads: Option<usize>) -> anyhow::Result<()> {
    let mut config = resolve_config(args.config.as_deref())?;
    args.apply_to(&mut config);

    let threads = resolve_thread_count(threads.unwrap_or(config.performance.threads));
    if let Err(e) = configure_thread_pool(threads) {
        debug!(error = %e, "global thread pool already initialized");
    }
    config.performance.batch_size =
        effective_batch_size(args.batch_size, config.performance.batch_size, threads);

    info!(
        input = %args.input.display(),
        threads,
        batch_size = config.performance.batch_size,
        write_mode = %config.output.write_mode,
        "starting reconstruction"
    );

    let reader = open_input(&args.input)?;
    let mut writer = open_output(args.output.as_deref())?;

    let quiet = args.stats_format != StatsFormat::Text;
    let pb = create_spinner("Reconstructing geometries...", quiet);
    let started = Instant::now();

    let stats = run_pipeline_with_progress(reader, &mut writer, &config, |stats| {
        pb.set_message(format!(
            "{} records, {} geometries",
            format_number(stats.lines_processed),
            format_number(stats.total_geometries)
        ));
    })?;
    pb.finish_and_clear();

    let elapsed = started.elapsed();
    info!(
        lines = stats.lines_processed,
        geometries = stats.total_geometries,
        elapsed_ms = elapsed.as_millis() as u64,
        "reconstruction finished"
    );

    match args.stats_format {
        StatsFormat::Text => report_text(&stats, &config, elapsed.as_secs_f64()),
        StatsFormat::Json => {
            let json = serde_json::to_string_pretty(&stats)
                .map_err(|e| WaybackError::Serialization(e.to_string()))?;
            eprintln!("{}", json);
        }
        StatsFormat::None => {}
    }

    Ok(())
}

fn report_text(stats: &ProcessingStats, config: &Config, seconds: f64) {
    let bytes = match config.output.write_mode {
        WriteMode::EveryGeometry => stats.every_geometry_bytes,
        WriteMode::HistoryObject => stats.history_object_bytes,
        WriteMode::Topology => stats.topology_bytes,
    };

    print_stats_table(
        "Reconstruction",
        &[
            ("Records processed", format_number(stats.lines_processed)),
            ("Without history", format_number(stats.no_history)),
            ("Parse errors", format_number(stats.parse_errors)),
            ("No builder", format_number(stats.builders_undefined)),
            ("Unresolved versions", format_number(stats.unresolved_versions)),
            ("Geometries written", format_number(stats.total_geometries)),
            ("Encoding failures", format_number(stats.encoding_failures)),
            ("Output size", format_bytes(bytes)),
            ("Elapsed", format!("{:.2}s", seconds)),
        ],
    );

    if stats.parse_errors > 0 {
        print_warning(&format!(
            "{} lines could not be decoded and were passed through unchanged",
            stats.parse_errors
        ));
    }
    if stats.unresolved_versions > 0 {
        print_warning(&format!(
            "{} major versions reference points with no usable location",
            stats.unresolved_versions
        ));
    }
    if stats.encoding_failures > 0 {
        print_warning(&format!(
            "{} records could not be encoded as a topology and were skipped",
            stats.encoding_failures
        ));
    }
    print_success("Reconstruction complete");
}
