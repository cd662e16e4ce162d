use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::MultiGzDecoder;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::dedup::{DedupStats, Deduplicator, SequenceGroup};
use crate::domain::{Member, SequenceDigest, TypeMarkers};
use crate::error::SeqDedupError;
use crate::fasta::{FastaReader, FastaWriter, RecordSink};

pub const STDIO_PATH: &str = "-";

#[derive(Debug, Clone)]
pub struct DedupOptions {
    pub type_markers: TypeMarkers,
    pub line_width: usize,
    pub manifest: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DedupResult {
    pub inputs: Vec<String>,
    pub output: String,
    pub manifest: Option<String>,
    pub type_markers: Vec<String>,
    pub stats: DedupStats,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectResult {
    pub inputs: Vec<String>,
    pub stats: DedupStats,
    pub largest_groups: Vec<GroupSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub digest: SequenceDigest,
    pub representative: String,
    pub type_selected: bool,
    pub members: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DigestEntry {
    pub digest: SequenceDigest,
    pub id: String,
}

/// Sidecar listing every group with its full membership.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub groups: Vec<ManifestGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestGroup {
    pub digest: SequenceDigest,
    pub representative: String,
    pub type_selected: bool,
    pub members: Vec<Member>,
}

impl From<&SequenceGroup> for ManifestGroup {
    fn from(group: &SequenceGroup) -> Self {
        Self {
            digest: group.digest(),
            representative: group.representative().id.clone(),
            type_selected: group.is_type_selected(),
            members: group.members().to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Forwards progress events to `tracing`.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_s = elapsed.as_secs_f64(), "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

pub struct Pipeline {
    options: DedupOptions,
}

impl Pipeline {
    pub fn new(options: DedupOptions) -> Self {
        Self { options }
    }

    /// Reads every input, groups the records and only then writes the output
    /// FASTA (and manifest). A decode error leaves no output behind, and a
    /// failure while persisting leaves neither file.
    ///
    /// An `output` of `-` writes to stdout.
    pub fn run(
        &self,
        inputs: &[Utf8PathBuf],
        output: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<DedupResult, SeqDedupError> {
        if output.as_str() == STDIO_PATH {
            let stdout = io::stdout();
            return self.run_to_writer(inputs, BufWriter::new(stdout.lock()), sink);
        }

        let started = Instant::now();
        let dedup = self.aggregate(inputs, sink)?;
        let manifest = self.options.manifest.as_deref();
        let staged_manifest = match manifest {
            Some(path) => Some(stage_manifest(&dedup, path)?),
            None => None,
        };
        let staged_output = stage(output, |writer| {
            let mut writer = FastaWriter::with_line_width(writer, self.options.line_width);
            write_records(&dedup, &mut writer)
        })?;

        // Manifest first: if the FASTA cannot be persisted afterwards, the
        // manifest is removed again.
        if let (Some(staged), Some(path)) = (staged_manifest, manifest) {
            persist(staged, path)?;
        }
        if let Err(err) = persist(staged_output, output) {
            if let Some(path) = manifest
                && let Err(cleanup) = fs::remove_file(path.as_std_path())
            {
                warn!(manifest = %path, error = %cleanup, "failed to remove manifest");
            }
            return Err(err);
        }

        Ok(self.finish(inputs, output, manifest, &dedup, sink, started))
    }

    /// Like [`Pipeline::run`] but streams the FASTA into `writer`. The
    /// manifest, if configured, is persisted once the FASTA is written.
    pub fn run_to_writer<W: Write>(
        &self,
        inputs: &[Utf8PathBuf],
        writer: W,
        sink: &dyn ProgressSink,
    ) -> Result<DedupResult, SeqDedupError> {
        let started = Instant::now();
        let dedup = self.aggregate(inputs, sink)?;
        let manifest = self.options.manifest.as_deref();
        let staged_manifest = match manifest {
            Some(path) => Some(stage_manifest(&dedup, path)?),
            None => None,
        };

        let mut writer = FastaWriter::with_line_width(writer, self.options.line_width);
        write_records(&dedup, &mut writer)?;
        if let (Some(staged), Some(path)) = (staged_manifest, manifest) {
            persist(staged, path)?;
        }

        let output = Utf8Path::new(STDIO_PATH);
        Ok(self.finish(inputs, output, manifest, &dedup, sink, started))
    }

    fn finish(
        &self,
        inputs: &[Utf8PathBuf],
        output: &Utf8Path,
        manifest: Option<&Utf8Path>,
        dedup: &Deduplicator,
        sink: &dyn ProgressSink,
        started: Instant,
    ) -> DedupResult {
        let stats = dedup.stats();
        sink.event(ProgressEvent {
            message: format!("phase=Write; {} records written to {output}", stats.groups),
            elapsed: Some(started.elapsed()),
        });

        DedupResult {
            inputs: inputs.iter().map(ToString::to_string).collect(),
            output: output.to_string(),
            manifest: manifest.map(ToString::to_string),
            type_markers: self
                .options
                .type_markers
                .iter()
                .map(ToString::to_string)
                .collect(),
            stats,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Aggregates without writing anything and reports the largest groups.
    pub fn inspect(
        &self,
        inputs: &[Utf8PathBuf],
        top: usize,
        sink: &dyn ProgressSink,
    ) -> Result<InspectResult, SeqDedupError> {
        let dedup = self.aggregate(inputs, sink)?;
        let stats = dedup.stats();
        let mut groups: Vec<_> = dedup
            .groups()
            .map(|group| GroupSummary {
                digest: group.digest(),
                representative: group.representative().id.clone(),
                type_selected: group.is_type_selected(),
                members: group.members().len(),
            })
            .collect();
        // stable sort keeps first-seen order among equal sizes
        groups.sort_by(|a, b| b.members.cmp(&a.members));
        groups.truncate(top);

        Ok(InspectResult {
            inputs: inputs.iter().map(ToString::to_string).collect(),
            stats,
            largest_groups: groups,
        })
    }

    pub fn aggregate(
        &self,
        inputs: &[Utf8PathBuf],
        sink: &dyn ProgressSink,
    ) -> Result<Deduplicator, SeqDedupError> {
        if inputs.is_empty() {
            return Err(SeqDedupError::MissingInput);
        }
        let started = Instant::now();
        let mut dedup = Deduplicator::new(self.options.type_markers.clone());
        for input in inputs {
            let file_started = Instant::now();
            sink.event(ProgressEvent {
                message: format!("phase=Read; {input}"),
                elapsed: None,
            });
            let before = dedup.stats().records;
            dedup.extend_from(FastaReader::named(open_input(input)?, input.as_str()))?;
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Read; {} records from {input}",
                    dedup.stats().records - before
                ),
                elapsed: Some(file_started.elapsed()),
            });
        }

        let stats = dedup.stats();
        info!(
            records = stats.records,
            groups = stats.groups,
            "aggregation finished"
        );
        sink.event(ProgressEvent {
            message: format!(
                "phase=Aggregate; {} records in {} groups",
                stats.records, stats.groups
            ),
            elapsed: Some(started.elapsed()),
        });
        Ok(dedup)
    }
}

/// Digest of every record of every input, in input order.
pub fn digest_inputs(inputs: &[Utf8PathBuf]) -> Result<Vec<DigestEntry>, SeqDedupError> {
    if inputs.is_empty() {
        return Err(SeqDedupError::MissingInput);
    }
    let mut entries = Vec::new();
    for input in inputs {
        for record in FastaReader::named(open_input(input)?, input.as_str()) {
            let record = record?;
            entries.push(DigestEntry {
                digest: record.digest(),
                id: record.id,
            });
        }
    }
    Ok(entries)
}

/// Opens `-` as stdin and `*.gz` through a gzip decoder.
pub fn open_input(path: &Utf8Path) -> Result<Box<dyn Read>, SeqDedupError> {
    if path.as_str() == STDIO_PATH {
        return Ok(Box::new(io::stdin()));
    }
    let file = File::open(path.as_std_path())
        .map_err(|err| SeqDedupError::Filesystem(format!("open {path}: {err}")))?;
    if path.extension() == Some("gz") {
        Ok(Box::new(MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn write_records<S: RecordSink>(dedup: &Deduplicator, sink: &mut S) -> Result<(), SeqDedupError> {
    for record in dedup.output_records() {
        sink.write_record(&record?)?;
    }
    sink.finish()
}

fn stage_manifest(dedup: &Deduplicator, dest: &Utf8Path) -> Result<NamedTempFile, SeqDedupError> {
    let document = Manifest {
        groups: dedup.groups().map(ManifestGroup::from).collect(),
    };
    stage(dest, |writer| {
        serde_json::to_writer_pretty(&mut *writer, &document)
            .map_err(|err| SeqDedupError::Encode(err.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|err| SeqDedupError::Encode(err.to_string()))
    })
}

/// Writes into a temp file next to `dest`; nothing is visible at `dest` until
/// [`persist`] is called.
fn stage<F>(dest: &Utf8Path, write: F) -> Result<NamedTempFile, SeqDedupError>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<(), SeqDedupError>,
{
    let parent = match dest.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| SeqDedupError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix(".seqdedup")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| SeqDedupError::Filesystem(err.to_string()))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer
            .flush()
            .map_err(|err| SeqDedupError::Encode(err.to_string()))?;
    }
    Ok(temp)
}

fn persist(temp: NamedTempFile, dest: &Utf8Path) -> Result<(), SeqDedupError> {
    temp.persist(dest.as_std_path())
        .map_err(|err| SeqDedupError::Filesystem(err.to_string()))?;
    Ok(())
}
