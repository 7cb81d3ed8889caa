use std::sync::mpsc::Sender;

use super::config::Config;
use super::detector_set::{DetectorPool, DetectorSet, EventHits};
use super::error::{ConfigError, ProcessorError};
use super::event_file::{EventFile, SignalEvent};
use super::hit_writer::HitWriter;
use super::worker_status::WorkerStatus;

/// Totals of a processed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub n_events: usize,
    pub n_hits: usize,
}

/// Divide the event ordinals in to a set of subsets (per thread/worker)
///
/// Event n goes to worker n % n_workers, matching the pool instance of that event.
pub fn create_subsets(n_events: usize, n_workers: usize) -> Vec<Vec<usize>> {
    let mut subsets: Vec<Vec<usize>> = vec![Vec::new(); n_workers.max(1)];
    let n_subsets = subsets.len();

    for ordinal in 0..n_events {
        subsets[ordinal % n_subsets].push(ordinal)
    }

    subsets
}

/// Reconstruct a subset of the events with a worker's own detectors
pub fn process_subset(
    mut detectors: DetectorSet,
    events: &[SignalEvent],
    subset: &[usize],
    tx: &Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<Vec<(usize, EventHits)>, ProcessorError> {
    let flush_frac: f32 = 0.01;
    let flush_val = ((subset.len() as f32 * flush_frac) as usize).max(1);
    let mut results = Vec::with_capacity(subset.len());

    tx.send(WorkerStatus::new(0.0, worker_id))?;
    for (count, ordinal) in subset.iter().enumerate() {
        let hits = detectors.process_event(&events[*ordinal])?;
        results.push((*ordinal, hits));
        if (count + 1) % flush_val == 0 {
            tx.send(WorkerStatus::new(
                (count + 1) as f32 / subset.len() as f32,
                worker_id,
            ))?;
        }
    }
    tx.send(WorkerStatus::new(1.0, worker_id))?;
    spdlog::info!("Worker {} finished {} events", worker_id, subset.len());

    Ok(results)
}

/// The main loop of the reconstruction.
///
/// Reads all events of the configured signal file, spreads them over `n_threads`
/// workers, and writes the hits in event order. Progress is reported through tx.
pub fn process(config: &Config, tx: &Sender<WorkerStatus>) -> Result<RunSummary, ProcessorError> {
    if !config.is_n_threads_valid() {
        return Err(ConfigError::BadThreadCount(config.n_threads).into());
    }
    let event_path = config.get_event_file_name()?;
    let hit_path = config.get_hit_file_name()?;

    // Fail on bad detector definitions before any data is touched
    let pool = DetectorPool::new(config, config.n_threads as usize)?;

    let mut event_file = EventFile::new(&event_path)?;
    pool.check_channels(event_file.get_n_channels())?;
    spdlog::info!(
        "Reading events from {} with total size: {}",
        event_path.to_string_lossy(),
        human_bytes::human_bytes(event_file.get_size_bytes() as f64)
    );
    let events = event_file.read_all()?;
    spdlog::info!(
        "Read {} events with {} channels each",
        events.len(),
        event_file.get_n_channels()
    );

    let subsets = create_subsets(events.len(), pool.len());
    let mut results: Vec<(usize, EventHits)> = Vec::with_capacity(events.len());
    std::thread::scope(|scope| -> Result<(), ProcessorError> {
        let handles: Vec<_> = pool
            .into_instances()
            .into_iter()
            .zip(subsets.iter())
            .enumerate()
            .map(|(worker_id, (detectors, subset))| {
                let events = &events;
                let tx = tx.clone();
                scope.spawn(move || process_subset(detectors, events, subset, &tx, worker_id))
            })
            .collect();

        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(worker_results) => results.extend(worker_results?),
                Err(_) => return Err(ProcessorError::WorkerPanic(worker_id)),
            }
        }
        Ok(())
    })?;

    results.sort_by_key(|(ordinal, _)| *ordinal);
    let event_hits: Vec<EventHits> = results.into_iter().map(|(_, hits)| hits).collect();
    let summary = RunSummary {
        n_events: event_hits.len(),
        n_hits: event_hits.iter().map(|e| e.n_hits()).sum(),
    };

    let mut writer = HitWriter::new(&hit_path)?;
    writer.write_events(&event_hits)?;
    writer.close()?;

    spdlog::info!(
        "Reconstructed {} hits in {} events",
        summary.n_hits,
        summary.n_events
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_file::{write_event, write_header};
    use crate::signal::Signal;
    use std::sync::mpsc;

    #[test]
    fn test_create_subsets() {
        let subsets = create_subsets(7, 3);
        assert_eq!(subsets, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
        assert_eq!(create_subsets(2, 0), vec![vec![0, 1]]);
    }

    fn write_run(path: &std::path::Path, n_events: u64) {
        let mut bytes: Vec<u8> = Vec::new();
        write_header(&mut bytes, 5).unwrap();
        for id in 0..n_events {
            // Every other event carries one clean hit
            let times: [&[f64]; 5] = if id % 2 == 0 {
                [&[1000.0], &[1050.0], &[1050.0], &[1060.0], &[1040.0]]
            } else {
                [&[1000.0], &[], &[1050.0], &[], &[]]
            };
            let event = SignalEvent {
                id,
                channels: times
                    .iter()
                    .map(|c| c.iter().map(|t| Signal::at(*t)).collect())
                    .collect(),
            };
            write_event(&mut bytes, &event).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_process_run() {
        let dir = std::env::temp_dir();
        let event_path = dir.join(format!("libdelayline_{}_run.sig", std::process::id()));
        let hit_path = dir.join(format!("libdelayline_{}_run_hits.yml", std::process::id()));
        write_run(&event_path, 9);

        let config = Config {
            event_path: event_path.clone(),
            hit_path: hit_path.clone(),
            n_threads: 2,
            ..Default::default()
        };
        let (tx, rx) = mpsc::channel();
        let summary = process(&config, &tx).unwrap();
        assert_eq!(
            summary,
            RunSummary {
                n_events: 9,
                n_hits: 5
            }
        );

        let statuses: Vec<WorkerStatus> = rx.try_iter().collect();
        for worker_id in 0..2 {
            assert!(statuses
                .iter()
                .any(|s| s.worker_id == worker_id && s.progress == 1.0));
        }

        let text = std::fs::read_to_string(&hit_path).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        let ids: Vec<u64> = value["events"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|e| e["event_id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, (0..9).collect::<Vec<u64>>());

        std::fs::remove_file(&event_path).unwrap();
        std::fs::remove_file(&hit_path).unwrap();
    }

    #[test]
    fn test_bad_thread_count() {
        let (tx, _rx) = mpsc::channel();
        let config = Config {
            n_threads: 0,
            ..Default::default()
        };
        assert!(matches!(
            process(&config, &tx),
            Err(ProcessorError::ConfigError(ConfigError::BadThreadCount(0)))
        ));
    }

    #[test]
    fn test_channel_beyond_file() {
        let dir = std::env::temp_dir();
        let event_path = dir.join(format!("libdelayline_{}_narrow.sig", std::process::id()));
        let hit_path = dir.join(format!("libdelayline_{}_narrow_hits.yml", std::process::id()));
        write_run(&event_path, 2);

        let mut config = Config {
            event_path: event_path.clone(),
            hit_path: hit_path.clone(),
            ..Default::default()
        };
        config.detectors[0].mcp_channel = 9;
        let (tx, rx) = mpsc::channel();
        assert!(matches!(
            process(&config, &tx),
            Err(ProcessorError::ConfigError(ConfigError::ChannelOutOfRange {
                channel: 9,
                n_channels: 5,
                ..
            }))
        ));
        // No worker was started and no output written
        assert_eq!(rx.try_iter().count(), 0);
        assert!(!hit_path.exists());

        std::fs::remove_file(&event_path).unwrap();
    }
}
