//! # delayline_cli
//!
//! Part of the libdelayline crate family.
//!
//! Command line application reconstructing delay-line detector hits from a signal file.
//!
//! ## Use
//!
//! Make a template configuration with
//!
//! ```bash
//! delayline_cli -p config.yml new
//! ```
//!
//! Edit the paths and detector definitions, then run the reconstruction with
//!
//! ```bash
//! delayline_cli -p config.yml
//! ```
//!
//! Library messages are written to `./delayline.log`.
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use libdelayline::config::Config;
use libdelayline::detector_set::DetectorSet;
use libdelayline::process::process;
use libdelayline::worker_status::WorkerStatus;

fn make_template_config(path: &Path) {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config).unwrap();
    let mut file = File::create(path).expect("Could create template config file!");
    file.write_all(yaml_str.as_bytes())
        .expect("Failed to write yaml data to file!");
}

/// Send the library log to a file
fn init_file_log() -> Result<(), spdlog::Error> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from("./delayline.log"))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()?,
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("delayline_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    if let Err(e) = init_file_log() {
        log::warn!("Could not create log file, library messages go to the terminal: {e}");
    }

    // Parse the cli
    let config_path = PathBuf::from(matches.get_one::<String>("path").expect("We require args"));

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        log::info!("Done.");
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Event Path: {}", config.event_path.to_string_lossy());
    log::info!("Hit Path: {}", config.hit_path.to_string_lossy());
    log::info!("Number of Workers: {}", config.n_threads);
    if !config.is_n_threads_valid() {
        log::error!("Number of workers must be at least 1!");
        return;
    }

    // Check the detector definitions up front so mistakes show on the terminal
    match DetectorSet::new(&config) {
        Ok(set) => log::info!("Defined {} detector(s).", set.len()),
        Err(e) => {
            log::error!("Invalid detector definition: {e}");
            return;
        }
    }
    for def in config.detectors.iter() {
        log::info!(
            "Detector {}: {:?} using {:?}, runtime {} ns, radius {} mm",
            def.name,
            def.kind,
            def.layer_pair,
            def.runtime,
            def.max_radius
        );
    }

    // Setup the progress bars, one per worker
    let bars: Vec<ProgressBar> = (0..config.n_threads)
        .map(|_| pb_manager.add(ProgressBar::new(100)))
        .collect();
    let (tx, rx) = mpsc::channel::<WorkerStatus>();

    // Spawn the task!
    let handle = std::thread::spawn(move || process(&config, &tx));

    loop {
        // No UI here, so sleep a little before trying to update
        std::thread::sleep(std::time::Duration::from_millis(250));
        for status in rx.try_iter() {
            if let Some(bar) = bars.get(status.worker_id) {
                bar.set_position((status.progress * 100.0) as u64);
            }
        }

        if handle.is_finished() {
            match handle.join() {
                Ok(result) => match result {
                    Ok(summary) => log::info!(
                        "Successfully reconstructed {} hits in {} events!",
                        summary.n_hits,
                        summary.n_events
                    ),
                    Err(e) => log::error!("Reconstruction failed with error: {e}"),
                },
                Err(_) => log::error!("Failed to join reconstruction task!"),
            }
            break;
        }
    }

    for bar in bars.iter() {
        bar.finish();
    }

    log::info!("Done.");
}
