//! # libdelayline
//!
//! libdelayline reconstructs particle impacts on delay-line detectors, written in Rust.
//! It takes the discrete signals extracted from the digitized MCP and wire-end
//! waveforms of each readout event and turns them into hits: a position on the
//! detector in mm plus the arrival time given by the MCP signal.
//!
//! ## Installation
//!
//! Currently the only method of install is from source. If you have not used Rust
//! before, you will most likely need to install the Rust tool chain. See the
//! [Rust docs](https://www.rust-lang.org/tools/install) for installation instructions.
//!
//! To build and install the CLI use `cargo install --path ./delayline_cli` from the
//! top level repository.
//!
//! ## Reconstruction
//!
//! A delay-line anode layer is a wire read out at both ends. For a genuine impact the
//! times of the two wire-end signals relative to the MCP signal always add up to the
//! same value, the timesum, and their difference encodes the position along the layer.
//! Two layers are needed for a position: X and Y on a quad anode, or any two of U, V,
//! and W on a hex anode.
//!
//! For each MCP signal (in time order) the reconstruction looks for the first
//! combination of wire-end signals which
//!
//! - falls within the timesum window of both layers, and
//! - gives a position inside the MCP radius.
//!
//! Every signal that formed a hit is claimed and never considered again for that
//! event, so a signal belongs to at most one hit. Signals left unclaimed are reported
//! as orphans.
//!
//! ## Configuration
//!
//! The YAML format of a configuration file is as follows:
//!
//! ```yml
//! event_path: /path/to/run_0001.sig
//! hit_path: /path/to/run_0001_hits.yml
//! n_threads: 4
//! detectors:
//!   - name: dld
//!     kind: quad          # quad or hex
//!     layer_pair: xy      # xy for quad; uv, uw, or vw for hex
//!     mcp_channel: 0
//!     layers:
//!       x: { channels: [1, 2], timesum: [20.0, 200.0], scale_factor: 0.4 }
//!       y: { channels: [3, 4], timesum: [20.0, 200.0], scale_factor: 0.4 }
//!     runtime: 100.0      # ns
//!     max_radius: 88.0    # mm
//!     w_layer_offset: 0.0 # mm, hex only
//! ```
//!
//! Definitions are validated when the detectors are created. A layer pair that does not
//! match the detector kind, a timesum window whose lower bound is not below its upper
//! bound, or a non-positive runtime or radius stop the run before any event is read.
//!
//! ## Input
//!
//! The signal file is a little endian binary file. It starts with the magic `DLSG`, a
//! u16 format version, and the u16 number of channels. Each event is a u64 event id
//! followed by, for every channel, a u32 signal count and that many
//! (time, height, fwhm) f64 triplets.
//!
//! ## Output
//!
//! Hits are written to a YAML file:
//!
//! ```text
//! run_0001_hits.yml
//! version
//! events
//! |---- event_id
//! |---- detectors
//! |    |---- <name> - [x, y, time, signals]
//! |---- orphans
//! |    |---- <name>
//! ```
pub mod calibration;
pub mod config;
pub mod detector;
pub mod detector_set;
pub mod error;
pub mod event_file;
pub mod hit_writer;
pub mod layer;
pub mod position;
pub mod process;
pub mod reconstructor;
pub mod signal;
pub mod worker_status;
