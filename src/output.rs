use std::io::{self, Write};

use serde::Serialize;

use crate::pipeline::{DedupResult, DigestEntry, InspectResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_dedup(result: &DedupResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_inspect(result: &InspectResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_digests(entries: &[DigestEntry]) -> io::Result<()> {
        Self::print_json(&entries)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Tab-separated `<digest>\t<id>` lines.
pub fn write_digest_table<W: Write>(mut writer: W, entries: &[DigestEntry]) -> io::Result<()> {
    for entry in entries {
        writeln!(writer, "{}\t{}", entry.digest, entry.id)?;
    }
    writer.flush()
}
