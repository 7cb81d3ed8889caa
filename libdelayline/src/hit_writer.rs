use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::detector_set::EventHits;
use super::error::HitWriterError;

/// This is the version of the output format
const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
struct HitDocument<'a> {
    version: String,
    events: &'a [EventHits],
}

// Structure
// version
// events
// |---- event_id
// |---- detectors
// |    |---- <name> - [x, y, time, signals(mcp, first, second)]
// |---- orphans
// |    |---- <name>

/// Writes the reconstructed hits of a run to a YAML file
#[derive(Debug)]
pub struct HitWriter {
    file_handle: BufWriter<File>,
    file_path: PathBuf,
}

impl HitWriter {
    /// Create the writer, truncating any file at path
    pub fn new(path: &Path) -> Result<Self, HitWriterError> {
        Ok(Self {
            file_handle: BufWriter::new(File::create(path)?),
            file_path: path.to_path_buf(),
        })
    }

    /// Write all events, in the order given
    pub fn write_events(&mut self, events: &[EventHits]) -> Result<(), HitWriterError> {
        let document = HitDocument {
            version: format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION),
            events,
        };
        serde_yaml::to_writer(&mut self.file_handle, &document)?;
        Ok(())
    }

    pub fn close(mut self) -> Result<(), HitWriterError> {
        self.file_handle.flush()?;
        spdlog::info!("Wrote hits to {}", self.file_path.to_string_lossy());
        Ok(())
    }
}
