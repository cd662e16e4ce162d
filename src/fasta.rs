use std::io::{Read, Write};

use seq_io::fasta::{self, Record, RefRecord};

use crate::domain::SequenceRecord;
use crate::error::SeqDedupError;

pub const DEFAULT_LINE_WIDTH: usize = 60;

const UNNAMED_SOURCE: &str = "<stream>";

/// Lazy FASTA parser over `seq_io`. Yields one record per `>` header; residue
/// lines are concatenated with whitespace removed and case preserved.
///
/// Headers must be UTF-8 and residues ASCII. Text before the first header is
/// an error. The reader stops after the first error.
pub struct FastaReader<R: Read> {
    reader: fasta::Reader<R>,
    source: String,
    records: usize,
    finished: bool,
}

impl<R: Read> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self::named(reader, UNNAMED_SOURCE)
    }

    /// `source` names the input in decode errors.
    pub fn named(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader: fasta::Reader::new(reader),
            source: source.into(),
            records: 0,
            finished: false,
        }
    }
}

fn convert(
    record: &RefRecord,
    source: &str,
    index: usize,
) -> Result<SequenceRecord, SeqDedupError> {
    let header = std::str::from_utf8(record.head())
        .map_err(|_| SeqDedupError::decode(source, index, "header is not valid UTF-8"))?;

    let mut residues = Vec::new();
    for line in record.seq_lines() {
        residues.extend(line.iter().copied().filter(|b| !b.is_ascii_whitespace()));
    }
    if !residues.is_ascii() {
        return Err(SeqDedupError::decode(
            source,
            index,
            format!("record {} contains non-ASCII residues", header.trim()),
        ));
    }
    let sequence = String::from_utf8(residues)
        .map_err(|err| SeqDedupError::decode(source, index, err.to_string()))?;

    Ok(SequenceRecord::from_header(header, sequence))
}

impl<R: Read> Iterator for FastaReader<R> {
    type Item = Result<SequenceRecord, SeqDedupError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let index = self.records + 1;
        let result = match self.reader.next() {
            Some(Ok(record)) => convert(&record, &self.source, index),
            Some(Err(err)) => Err(SeqDedupError::decode(
                self.source.as_str(),
                index,
                err.to_string(),
            )),
            None => {
                self.finished = true;
                return None;
            }
        };
        match result {
            Ok(record) => {
                self.records = index;
                Some(Ok(record))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// Destination for finished records.
pub trait RecordSink {
    fn write_record(&mut self, record: &SequenceRecord) -> Result<(), SeqDedupError>;
    fn finish(&mut self) -> Result<(), SeqDedupError>;
}

pub struct FastaWriter<W: Write> {
    writer: W,
    line_width: usize,
}

impl<W: Write> FastaWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_line_width(writer, DEFAULT_LINE_WIDTH)
    }

    /// A width of 0 writes each sequence on a single line.
    pub fn with_line_width(writer: W, line_width: usize) -> Self {
        Self { writer, line_width }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for FastaWriter<W> {
    fn write_record(&mut self, record: &SequenceRecord) -> Result<(), SeqDedupError> {
        // Wrapping splits bytes, so residues must be single-byte.
        if !record.sequence.is_ascii() {
            return Err(SeqDedupError::Encode(format!(
                "record {} contains non-ASCII residues",
                record.id
            )));
        }
        let head = if record.description.is_empty() {
            record.id.clone()
        } else {
            format!("{} {}", record.id, record.description)
        };

        let residues = record.sequence.as_bytes();
        let written = if residues.is_empty() {
            fasta::write_head(&mut self.writer, head.as_bytes())
        } else if self.line_width == 0 {
            fasta::write_head(&mut self.writer, head.as_bytes())
                .and_then(|()| fasta::write_seq(&mut self.writer, residues))
        } else {
            fasta::write_wrap(&mut self.writer, head.as_bytes(), None, residues, self.line_width)
        };
        written.map_err(|err| SeqDedupError::Encode(err.to_string()))
    }

    fn finish(&mut self) -> Result<(), SeqDedupError> {
        self.writer
            .flush()
            .map_err(|err| SeqDedupError::Encode(err.to_string()))
    }
}

impl RecordSink for Vec<SequenceRecord> {
    fn write_record(&mut self, record: &SequenceRecord) -> Result<(), SeqDedupError> {
        self.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SeqDedupError> {
        Ok(())
    }
}
