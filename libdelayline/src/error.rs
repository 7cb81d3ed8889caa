use std::path::PathBuf;
use thiserror::Error;

use super::layer::{DetectorKind, Layer, LayerPair};
use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Detector {name} is a {kind:?} detector and cannot use layer pair {pair:?}")]
    MismatchedLayerPair {
        name: String,
        kind: DetectorKind,
        pair: LayerPair,
    },
    #[error("Detector {name} has an invalid timesum window for layer {layer:?} -- low: {low} high: {high}; low must be below high")]
    BadTimesumWindow {
        name: String,
        layer: Layer,
        low: f64,
        high: f64,
    },
    #[error("Detector {name} has a non-positive maximum runtime: {value}")]
    NonPositiveRuntime { name: String, value: f64 },
    #[error("Detector {name} has a non-positive maximum radius: {value}")]
    NonPositiveRadius { name: String, value: f64 },
    #[error("Detector {name} has an unusable scale factor for layer {layer:?}: {value}")]
    BadScaleFactor {
        name: String,
        layer: Layer,
        value: f64,
    },
    #[error("Detector {name} uses layer {layer:?} but no wire-end channels are assigned to it")]
    MissingLayer { name: String, layer: Layer },
    #[error("Detector {name} assigns layer {layer:?}, which a {kind:?} detector does not have")]
    ForeignLayer {
        name: String,
        layer: Layer,
        kind: DetectorKind,
    },
    #[error("Detector {name} assigns channel {channel} to more than one input")]
    DuplicateChannel { name: String, channel: usize },
    #[error("Detector {name} reads channel {channel} but the event file only has {n_channels} channels")]
    ChannelOutOfRange {
        name: String,
        channel: usize,
        n_channels: usize,
    },
    #[error("Detector {name} uses layer pair {pair:?} but the calibration is for layers {first:?} and {second:?}")]
    MismatchedCalibration {
        name: String,
        pair: LayerPair,
        first: Layer,
        second: Layer,
    },
    #[error("Detector name {0} is defined more than once")]
    DuplicateDetector(String),
    #[error("Invalid number of worker threads: {0}; must be at least 1")]
    BadThreadCount(i32),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Detector {name} reads channel {channel} but the event only has {n_channels} channels")]
    MissingChannel {
        name: String,
        channel: usize,
        n_channels: usize,
    },
}

#[derive(Debug, Error)]
pub enum EventFileError {
    #[error("Could not open EventFile because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("EventFile has incorrect magic {0:?}; expected {exp:?}", exp = super::event_file::EVENT_FILE_MAGIC)]
    BadMagic([u8; 4]),
    #[error("EventFile has unsupported format version {0}; expected {exp}", exp = super::event_file::EVENT_FILE_VERSION)]
    BadVersion(u16),
    #[error("EventFile ended in the middle of event {0}")]
    TruncatedEvent(u64),
    #[error("Reached end of EventFile")]
    EndOfFile,
    #[error("EventFile failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum HitWriterError {
    #[error("HitWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("HitWriter failed to convert to yaml: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to EventFile error: {0}")]
    EventFileError(#[from] EventFileError),
    #[error("Processor failed due to Event error: {0}")]
    EventError(#[from] EventError),
    #[error("Processor failed due to HitWriter error: {0}")]
    HitWriterError(#[from] HitWriterError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed because worker {0} panicked")]
    WorkerPanic(usize),
}
