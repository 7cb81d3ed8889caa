use bit_set::BitSet;
use std::ops::{Index, Range};

/// A single discrete pulse found on one digitizer channel.
///
/// Only the time and the claim flag matter to hit reconstruction. Height and
/// width are carried along from the signal extraction for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Signal {
    /// Arrival time in ns
    pub time: f64,
    /// Set once the signal contributed to a reconstructed hit
    pub is_used: bool,
    pub height: f64,
    pub fwhm: f64,
}

impl Signal {
    pub fn new(time: f64, height: f64, fwhm: f64) -> Self {
        Self {
            time,
            is_used: false,
            height,
            fwhm,
        }
    }

    /// A signal which only knows its arrival time
    pub fn at(time: f64) -> Self {
        Self::new(time, 0.0, 0.0)
    }
}

/// The time ordered signals of one channel for the current event.
///
/// The stream is the sole owner of its signals. Hit reconstruction only ever
/// flips the `is_used` flag, so after reconstruction the stream tells which
/// signals were never attributed to a hit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalStream {
    signals: Vec<Signal>,
}

impl SignalStream {
    /// Create a stream from signals, sorting them by ascending time
    pub fn from_signals(mut signals: Vec<Signal>) -> Self {
        signals.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { signals }
    }

    /// Create a stream from bare arrival times
    pub fn from_times(times: &[f64]) -> Self {
        Self::from_signals(times.iter().map(|t| Signal::at(*t)).collect())
    }

    /// Replace the contents with the signals of a new event.
    ///
    /// The new signals are sorted and all claims are cleared.
    pub fn refill(&mut self, signals: &[Signal]) {
        self.signals.clear();
        self.signals.extend_from_slice(signals);
        self.signals.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.reset_claims();
    }

    pub fn reset_claims(&mut self) {
        self.signals.iter_mut().for_each(|s| s.is_used = false);
    }

    /// Find the contiguous range of signals that could pair with an MCP signal.
    ///
    /// A signal qualifies when `|2 t - 2 mcp - timesum_center| <= runtime`, i.e. its
    /// partner on the other wire end would have to lie within the anode runtime.
    /// The stream is sorted, so the first qualifying signal starts the range and
    /// the first one after it that fails the check ends it.
    pub fn candidate_range(&self, mcp: f64, timesum_center: f64, runtime: f64) -> Range<usize> {
        let fits = |s: &Signal| (2.0 * s.time - 2.0 * mcp - timesum_center).abs() <= runtime;
        let n_signals = self.signals.len();
        let start = self.signals.iter().position(fits).unwrap_or(n_signals);
        let stop = self.signals[start..]
            .iter()
            .position(|s| !fits(s))
            .map_or(n_signals, |offset| start + offset);
        start..stop
    }

    /// Indices of the signals which were never claimed by a hit
    pub fn orphans(&self) -> BitSet {
        self.signals
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_used)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn claim(&mut self, idx: usize) {
        self.signals[idx].is_used = true;
    }

    pub fn is_used(&self, idx: usize) -> bool {
        self.signals[idx].is_used
    }

    pub fn time(&self, idx: usize) -> f64 {
        self.signals[idx].time
    }

    pub fn first(&self) -> Option<&Signal> {
        self.signals.first()
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signal> {
        self.signals.iter()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl Index<usize> for SignalStream {
    type Output = Signal;

    fn index(&self, index: usize) -> &Self::Output {
        &self.signals[index]
    }
}
