use fxhash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;

use super::config::Config;
use super::detector::DelaylineDetector;
use super::error::{ConfigError, EventError};
use super::event_file::SignalEvent;
use super::reconstructor::DetectorHit;

/// The hits all detectors found in one event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventHits {
    pub event_id: u64,
    pub detectors: BTreeMap<String, Vec<DetectorHit>>,
    /// Number of signals per detector that were not attributed to a hit
    pub orphans: BTreeMap<String, usize>,
}

impl EventHits {
    pub fn n_hits(&self) -> usize {
        self.detectors.values().map(|h| h.len()).sum()
    }
}

/// All detectors of a setup, keyed by name
#[derive(Debug, Clone, Default)]
pub struct DetectorSet {
    detectors: FxHashMap<String, DelaylineDetector>,
}

impl DetectorSet {
    /// Build every detector defined in the config
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        for def in config.detectors.iter() {
            if set.detectors.contains_key(&def.name) {
                return Err(ConfigError::DuplicateDetector(def.name.clone()));
            }
            set.detectors
                .insert(def.name.clone(), DelaylineDetector::new(def)?);
        }
        Ok(set)
    }

    /// Check the channel assignments of every detector against the channel count of the input
    pub fn check_channels(&self, n_channels: usize) -> Result<(), ConfigError> {
        self.detectors
            .values()
            .try_for_each(|d| d.check_channels(n_channels))
    }

    /// Associate the event with every detector and reconstruct its hits
    pub fn process_event(&mut self, event: &SignalEvent) -> Result<EventHits, EventError> {
        let mut hits = EventHits {
            event_id: event.id,
            detectors: BTreeMap::new(),
            orphans: BTreeMap::new(),
        };
        for (name, detector) in self.detectors.iter_mut() {
            detector.associate(event)?;
            hits.detectors
                .insert(name.clone(), detector.reconstruct().to_vec());
            hits.orphans.insert(name.clone(), detector.orphan_count());
        }
        Ok(hits)
    }

    pub fn get(&self, name: &str) -> Option<&DelaylineDetector> {
        self.detectors.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DelaylineDetector> {
        self.detectors.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

/// One independent detector set per worker.
///
/// Event `n` is always handled by instance `n % pool_size`, so each worker owns
/// the detector state of the events it processes and nothing is shared.
#[derive(Debug, Clone)]
pub struct DetectorPool {
    instances: Vec<DetectorSet>,
}

impl DetectorPool {
    pub fn new(config: &Config, pool_size: usize) -> Result<Self, ConfigError> {
        let template = DetectorSet::new(config)?;
        Ok(Self {
            instances: vec![template; pool_size.max(1)],
        })
    }

    pub fn check_channels(&self, n_channels: usize) -> Result<(), ConfigError> {
        self.instances
            .iter()
            .try_for_each(|i| i.check_channels(n_channels))
    }

    pub fn instance_index(&self, event_ordinal: usize) -> usize {
        event_ordinal % self.instances.len()
    }

    /// The detector set responsible for an event
    pub fn get_mut(&mut self, event_ordinal: usize) -> &mut DetectorSet {
        let idx = self.instance_index(event_ordinal);
        &mut self.instances[idx]
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Hand out the instances, one per worker
    pub fn into_instances(self) -> Vec<DetectorSet> {
        self.instances
    }
}
