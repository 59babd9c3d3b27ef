/// Line-by-line record processing
///
/// Decodes each input line, routes it to the history builder for its kind,
/// and renders the reconstructed versions. Lines are processed in parallel
/// batches; output order always follows input order.

use crate::config::{Config, OutputConfig};
use crate::history::FeatureKind;
use crate::io::{decode_record, render_record, DecodedLine, FeatureRecord};
use crate::reconstruct::{
    CompositeHistoryBuilder, GeometryHistoryBuilder, LineHistoryBuilder, PointHistoryBuilder,
};
use crate::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::{debug, trace, warn};

/// What happened to one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    /// Blank line, nothing written
    Empty,
    /// Undecodable line, passed through unchanged
    Malformed,
    /// Feature without history, passed through unchanged
    NoHistory,
    /// No history builder applies to the feature
    NoBuilder,
    Reconstructed {
        kind: FeatureKind,
        geometries: u64,
        unresolved: u64,
        every_geometry_bytes: u64,
        history_object_bytes: u64,
        topology_bytes: u64,
        encoding_failures: u64,
    },
}

/// Output lines of one input line plus its status.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub lines: Vec<String>,
    pub status: RecordStatus,
}

/// Aggregated counters over a run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub lines_processed: u64,
    pub no_history: u64,
    pub parse_errors: u64,
    pub builders_undefined: u64,
    pub unresolved_versions: u64,
    pub total_geometries: u64,
    pub encoding_failures: u64,
    pub every_geometry_bytes: u64,
    pub history_object_bytes: u64,
    pub topology_bytes: u64,
}

impl ProcessingStats {
    /// Count one record.
    pub fn record(&mut self, status: &RecordStatus) {
        match status {
            RecordStatus::Empty => {}
            RecordStatus::Malformed => self.parse_errors += 1,
            RecordStatus::NoHistory => {
                self.lines_processed += 1;
                self.no_history += 1;
            }
            RecordStatus::NoBuilder => {
                self.lines_processed += 1;
                self.builders_undefined += 1;
            }
            RecordStatus::Reconstructed {
                geometries,
                unresolved,
                every_geometry_bytes,
                history_object_bytes,
                topology_bytes,
                encoding_failures,
                ..
            } => {
                self.lines_processed += 1;
                self.total_geometries += geometries;
                self.unresolved_versions += unresolved;
                self.every_geometry_bytes += every_geometry_bytes;
                self.history_object_bytes += history_object_bytes;
                self.topology_bytes += topology_bytes;
                self.encoding_failures += encoding_failures;
            }
        }
    }

    /// Combine two partial counts. Order does not matter.
    pub fn merge(self, other: Self) -> Self {
        Self {
            lines_processed: self.lines_processed + other.lines_processed,
            no_history: self.no_history + other.no_history,
            parse_errors: self.parse_errors + other.parse_errors,
            builders_undefined: self.builders_undefined + other.builders_undefined,
            unresolved_versions: self.unresolved_versions + other.unresolved_versions,
            total_geometries: self.total_geometries + other.total_geometries,
            encoding_failures: self.encoding_failures + other.encoding_failures,
            every_geometry_bytes: self.every_geometry_bytes + other.every_geometry_bytes,
            history_object_bytes: self.history_object_bytes + other.history_object_bytes,
            topology_bytes: self.topology_bytes + other.topology_bytes,
        }
    }
}

/// Select the history builder for a decoded record.
pub fn builder_for(record: &FeatureRecord) -> Option<Box<dyn GeometryHistoryBuilder + '_>> {
    match (record.kind()?, record.timelines.as_ref()) {
        (FeatureKind::Point, _) => Some(Box::new(PointHistoryBuilder::new(&record.history))),
        (FeatureKind::Line, Some(timelines)) => {
            Some(Box::new(LineHistoryBuilder::new(timelines, &record.history)))
        }
        (FeatureKind::Composite, _) => Some(Box::new(CompositeHistoryBuilder::new(
            &record.history,
            &record.head_geometry,
        ))),
        (FeatureKind::Line, None) => None,
    }
}

pub struct RecordProcessor {
    output: OutputConfig,
}

impl RecordProcessor {
    pub fn new(output: OutputConfig) -> Self {
        Self { output }
    }

    pub fn output_config(&self) -> &OutputConfig {
        &self.output
    }

    /// Decode, reconstruct and render one input line.
    pub fn process_line(&self, line: &str) -> RecordOutcome {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return RecordOutcome {
                lines: Vec::new(),
                status: RecordStatus::Empty,
            };
        }

        let record = match decode_record(line) {
            Ok(DecodedLine::Feature(record)) => record,
            Ok(DecodedLine::NoHistory) => {
                return RecordOutcome {
                    lines: vec![line.to_string()],
                    status: RecordStatus::NoHistory,
                }
            }
            Err(e) => {
                warn!(error = %e, "passing through undecodable line");
                return RecordOutcome {
                    lines: vec![line.to_string()],
                    status: RecordStatus::Malformed,
                };
            }
        };

        let Some(builder) = builder_for(&record) else {
            debug!(id = record.id, osm_type = ?record.osm_type, "no history builder for record");
            return RecordOutcome {
                lines: Vec::new(),
                status: RecordStatus::NoBuilder,
            };
        };

        let kind = builder.kind();
        let reconstruction = builder.build();
        trace!(
            id = record.id,
            ?kind,
            geometries = reconstruction.geometry_count(),
            "record reconstructed"
        );

        let rendered = render_record(&record, &reconstruction.geometries, &self.output);
        RecordOutcome {
            lines: rendered.lines,
            status: RecordStatus::Reconstructed {
                kind,
                geometries: rendered.geometry_count,
                unresolved: reconstruction.unresolved.len() as u64,
                every_geometry_bytes: rendered.every_geometry_bytes,
                history_object_bytes: rendered.history_object_bytes,
                topology_bytes: rendered.topology_bytes,
                encoding_failures: rendered.encoding_failures,
            },
        }
    }
}

/// Run the whole pipeline from `reader` to `writer`.
pub fn run_pipeline<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    config: &Config,
) -> Result<ProcessingStats> {
    run_pipeline_with_progress(reader, writer, config, |_| {})
}

/// Like [`run_pipeline`], reporting the running stats after every batch.
pub fn run_pipeline_with_progress<R, W, F>(
    mut reader: R,
    writer: &mut W,
    config: &Config,
    mut progress: F,
) -> Result<ProcessingStats>
where
    R: BufRead,
    W: Write,
    F: FnMut(&ProcessingStats),
{
    let processor = RecordProcessor::new(config.output.clone());
    let batch_size = config.performance.batch_size.max(1);

    let mut stats = ProcessingStats::default();
    let mut batch = Vec::with_capacity(batch_size);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        batch.push(InputLine::decode(std::mem::take(&mut buf)));

        if batch.len() >= batch_size {
            stats = stats.merge(flush_batch(&processor, &batch, writer)?);
            batch.clear();
            progress(&stats);
        }
    }
    if !batch.is_empty() {
        stats = stats.merge(flush_batch(&processor, &batch, writer)?);
        progress(&stats);
    }

    writer.flush()?;
    Ok(stats)
}

/// One raw input line, decoded as UTF-8 when possible.
#[derive(Debug, Clone, PartialEq)]
enum InputLine {
    Text(String),
    /// Not valid UTF-8; written back byte for byte
    Undecodable(Vec<u8>),
}

impl InputLine {
    fn decode(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => InputLine::Text(text),
            Err(e) => InputLine::Undecodable(e.into_bytes()),
        }
    }
}

/// Process a batch in parallel and write the outcomes in input order.
fn flush_batch<W: Write>(
    processor: &RecordProcessor,
    batch: &[InputLine],
    writer: &mut W,
) -> Result<ProcessingStats> {
    let outcomes: Vec<std::result::Result<RecordOutcome, &[u8]>> = batch
        .par_iter()
        .map(|line| match line {
            InputLine::Text(text) => Ok(processor.process_line(text)),
            InputLine::Undecodable(bytes) => Err(bytes.as_slice()),
        })
        .collect();

    let mut stats = ProcessingStats::default();
    for outcome in outcomes {
        match outcome {
            Ok(outcome) => {
                for line in &outcome.lines {
                    writer.write_all(line.as_bytes())?;
                    writer.write_all(b"\n")?;
                }
                stats.record(&outcome.status);
            }
            Err(bytes) => {
                warn!(bytes = bytes.len(), "passing through line that is not valid UTF-8");
                writer.write_all(bytes)?;
                writer.write_all(b"\n")?;
                stats.record(&RecordStatus::Malformed);
            }
        }
    }
    Ok(stats)
}
