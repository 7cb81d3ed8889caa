use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::layer::{DetectorKind, Layer, LayerPair};

/// Readout and calibration of a single anode layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Event channels of wire end 1 and wire end 2
    pub channels: [usize; 2],
    /// Lower and upper bound of the timesum window in ns
    pub timesum: [f64; 2],
    /// Conversion of a wire-end time difference to mm
    pub scale_factor: f64,
}

/// Definition of one delay-line detector: geometry, channel assignment, and calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub name: String,
    pub kind: DetectorKind,
    pub layer_pair: LayerPair,
    pub mcp_channel: usize,
    pub layers: BTreeMap<Layer, LayerConfig>,
    pub runtime: f64,
    pub max_radius: f64,
    #[serde(default)]
    pub w_layer_offset: f64,
}

impl DetectorConfig {
    /// A typical quad-anode definition; MCP on channel 0, X on 1/2, Y on 3/4
    pub fn quad_template(name: &str) -> Self {
        let layer = |channels: [usize; 2]| LayerConfig {
            channels,
            timesum: [20.0, 200.0],
            scale_factor: 0.4,
        };
        Self {
            name: String::from(name),
            kind: DetectorKind::Quad,
            layer_pair: LayerPair::XY,
            mcp_channel: 0,
            layers: BTreeMap::from([(Layer::X, layer([1, 2])), (Layer::Y, layer([3, 4]))]),
            runtime: 100.0,
            max_radius: 88.0,
            w_layer_offset: 0.0,
        }
    }
}

/// Structure representing the application configuration. Contains pathing, worker and detector information.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub event_path: PathBuf,
    pub hit_path: PathBuf,
    pub n_threads: i32,
    pub detectors: Vec<DetectorConfig>,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be invalid, a single quad detector is defined
    fn default() -> Self {
        Self {
            event_path: PathBuf::from("None"),
            hit_path: PathBuf::from("None"),
            n_threads: 1,
            detectors: vec![DetectorConfig::quad_template("dld")],
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Get the path to the input event file
    pub fn get_event_file_name(&self) -> Result<PathBuf, ConfigError> {
        if self.event_path.exists() {
            Ok(self.event_path.clone())
        } else {
            Err(ConfigError::BadFilePath(self.event_path.clone()))
        }
    }

    /// Get the path to the output hit file. The parent directory must exist
    pub fn get_hit_file_name(&self) -> Result<PathBuf, ConfigError> {
        match self.hit_path.parent() {
            Some(parent) if parent.as_os_str().is_empty() || parent.exists() => {
                Ok(self.hit_path.clone())
            }
            _ => Err(ConfigError::BadFilePath(self.hit_path.clone())),
        }
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.detectors, config.detectors);
        assert!(parsed.is_n_threads_valid());
    }

    #[test]
    fn test_parse_hex_definition() {
        let yaml = "
event_path: run_0001.sig
hit_path: run_0001_hits.yml
n_threads: 4
detectors:
  - name: ion
    kind: hex
    layer_pair: vw
    mcp_channel: 6
    layers:
      u: { channels: [0, 1], timesum: [120.0, 140.0], scale_factor: 0.5 }
      v: { channels: [2, 3], timesum: [118.0, 138.0], scale_factor: 0.51 }
      w: { channels: [4, 5], timesum: [119.0, 139.0], scale_factor: 0.49 }
    runtime: 150.0
    max_radius: 60.0
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.n_threads, 4);
        let det = &config.detectors[0];
        assert_eq!(det.kind, DetectorKind::Hex);
        assert_eq!(det.layer_pair, LayerPair::VW);
        assert_eq!(det.layers[&Layer::W].channels, [4, 5]);
        assert_eq!(det.w_layer_offset, 0.0);
    }

    #[test]
    fn test_missing_config_file() {
        let path = Path::new("/this/path/does/not/exist.yml");
        assert!(matches!(
            Config::read_config_file(path),
            Err(ConfigError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_thread_count() {
        let config = Config {
            n_threads: 0,
            ..Default::default()
        };
        assert!(!config.is_n_threads_valid());
    }
}
