use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use super::error::EventFileError;
use super::signal::Signal;

pub const EVENT_FILE_MAGIC: [u8; 4] = *b"DLSG";
pub const EVENT_FILE_VERSION: u16 = 1;
/// Bytes of one (time, height, fwhm) signal record
const SIGNAL_SIZE_BYTES: u64 = 24;

/// The extracted signals of all digitizer channels for one readout event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalEvent {
    pub id: u64,
    /// Signals per digitizer channel, indexed by channel number
    pub channels: Vec<Vec<Signal>>,
}

// Structure (all little endian)
// header - magic "DLSG", version(u16), n_channels(u16)
// |---- event
// |    |---- id(u64)
// |    |---- channel x n_channels
// |    |    |---- n_signals(u32)
// |    |    |---- signal x n_signals - time(f64), height(f64), fwhm(f64)

/// Reader for the binary signal files written by the signal extraction.
#[derive(Debug)]
pub struct EventFile {
    file_handle: BufReader<File>,
    file_path: PathBuf,
    size_bytes: u64,
    n_channels: usize,
}

impl EventFile {
    /// Open a file and check its header
    pub fn new(path: &Path) -> Result<Self, EventFileError> {
        if !path.exists() {
            return Err(EventFileError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        let mut file_handle = BufReader::new(file);

        let mut magic = [0u8; 4];
        file_handle.read_exact(&mut magic)?;
        if magic != EVENT_FILE_MAGIC {
            return Err(EventFileError::BadMagic(magic));
        }
        let version = file_handle.read_u16::<LittleEndian>()?;
        if version != EVENT_FILE_VERSION {
            return Err(EventFileError::BadVersion(version));
        }
        let n_channels = file_handle.read_u16::<LittleEndian>()? as usize;

        Ok(Self {
            file_handle,
            file_path: path.to_path_buf(),
            size_bytes,
            n_channels,
        })
    }

    /// Read the next event.
    ///
    /// Returns `EventFileError::EndOfFile` once all events were read.
    pub fn get_next_event(&mut self) -> Result<SignalEvent, EventFileError> {
        let id = match self.file_handle.read_u64::<LittleEndian>() {
            Ok(id) => id,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(EventFileError::EndOfFile),
            Err(e) => return Err(EventFileError::IOError(e)),
        };

        let mut channels = Vec::with_capacity(self.n_channels);
        for _ in 0..self.n_channels {
            channels.push(self.read_channel().map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => EventFileError::TruncatedEvent(id),
                _ => EventFileError::IOError(e),
            })?);
        }

        Ok(SignalEvent { id, channels })
    }

    fn read_channel(&mut self) -> Result<Vec<Signal>, std::io::Error> {
        let n_signals = self.file_handle.read_u32::<LittleEndian>()?;
        // The count is untrusted, a file cannot hold more signals than its size allows
        if n_signals as u64 * SIGNAL_SIZE_BYTES > self.size_bytes {
            return Err(std::io::Error::from(ErrorKind::UnexpectedEof));
        }
        let mut signals = Vec::with_capacity(n_signals as usize);
        for _ in 0..n_signals {
            let time = self.file_handle.read_f64::<LittleEndian>()?;
            let height = self.file_handle.read_f64::<LittleEndian>()?;
            let fwhm = self.file_handle.read_f64::<LittleEndian>()?;
            signals.push(Signal::new(time, height, fwhm));
        }
        Ok(signals)
    }

    /// Read all remaining events
    pub fn read_all(&mut self) -> Result<Vec<SignalEvent>, EventFileError> {
        let mut events = Vec::new();
        loop {
            match self.get_next_event() {
                Ok(event) => events.push(event),
                Err(EventFileError::EndOfFile) => return Ok(events),
                Err(e) => return Err(e),
            }
        }
    }

    pub fn get_filename(&self) -> &Path {
        &self.file_path
    }

    pub fn get_size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn get_n_channels(&self) -> usize {
        self.n_channels
    }
}

/// Write the header of a signal file
pub fn write_header<W: Write>(writer: &mut W, n_channels: u16) -> Result<(), std::io::Error> {
    writer.write_all(&EVENT_FILE_MAGIC)?;
    writer.write_u16::<LittleEndian>(EVENT_FILE_VERSION)?;
    writer.write_u16::<LittleEndian>(n_channels)?;
    Ok(())
}

/// Append an event to a signal file. The event must have as many channels as the header declares
pub fn write_event<W: Write>(writer: &mut W, event: &SignalEvent) -> Result<(), std::io::Error> {
    writer.write_u64::<LittleEndian>(event.id)?;
    for channel in event.channels.iter() {
        writer.write_u32::<LittleEndian>(channel.len() as u32)?;
        for signal in channel.iter() {
            writer.write_f64::<LittleEndian>(signal.time)?;
            writer.write_f64::<LittleEndian>(signal.height)?;
            writer.write_f64::<LittleEndian>(signal.fwhm)?;
        }
    }
    Ok(())
}
