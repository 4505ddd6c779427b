use crate::actuator::{ActuatorParams, DEFAULT_MAX_ON_TIME_MS, DEFAULT_OFF_DELAY_MS};
use crate::error::{FerroError, Result};
use crate::pwm::duty_from_percent;
use crate::types::Millis;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const CONFIG_FILE: &str = "ferrogrid.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// TimingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_off_delay")]
    pub off_delay_ms: Millis,
    #[serde(default = "default_max_on_time")]
    pub max_on_time_ms: Millis,
    #[serde(default = "default_tick_period")]
    pub tick_period_ms: Millis,
}

fn default_off_delay() -> Millis {
    DEFAULT_OFF_DELAY_MS
}

fn default_max_on_time() -> Millis {
    DEFAULT_MAX_ON_TIME_MS
}

fn default_tick_period() -> Millis {
    50
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            off_delay_ms: default_off_delay(),
            max_on_time_ms: default_max_on_time(),
            tick_period_ms: default_tick_period(),
        }
    }
}

// ---------------------------------------------------------------------------
// DriveConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    #[serde(default = "default_frequency")]
    pub frequency_hz: u32,
    #[serde(default = "default_duty_cycle")]
    pub duty_cycle_percent: f32,
}

fn default_frequency() -> u32 {
    1000
}

fn default_duty_cycle() -> f32 {
    100.0
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency(),
            duty_cycle_percent: default_duty_cycle(),
        }
    }
}

// ---------------------------------------------------------------------------
// LayoutConfig
// ---------------------------------------------------------------------------

/// Rows of GPIO pins. Row layout only affects numbering: actuators are
/// addressed by their 1-based row-major position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_rows")]
    pub rows: Vec<Vec<u8>>,
}

fn default_rows() -> Vec<Vec<u8>> {
    vec![
        vec![26, 22, 21, 20],
        vec![19, 18, 17, 16],
        vec![15, 14, 13, 12],
    ]
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
        }
    }
}

impl LayoutConfig {
    pub fn count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn row_lengths(&self) -> Vec<usize> {
        self.rows.iter().map(Vec::len).collect()
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            timing: TimingConfig::default(),
            drive: DriveConfig::default(),
            layout: LayoutConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` when given, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Atomically write the config as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Per-actuator parameters in row-major order; ids start at 1.
    pub fn actuator_params(&self) -> Vec<ActuatorParams> {
        self.layout
            .rows
            .iter()
            .enumerate()
            .flat_map(|(row, pins)| {
                pins.iter()
                    .enumerate()
                    .map(move |(column, &pin)| (row, column, pin))
            })
            .enumerate()
            .map(|(i, (row, column, pin))| ActuatorParams {
                id: i + 1,
                pin,
                row,
                column,
                frequency_hz: self.drive.frequency_hz,
                duty_cycle_percent: self.drive.duty_cycle_percent,
                off_delay_ms: self.timing.off_delay_ms,
                max_on_time_ms: self.timing.max_on_time_ms,
            })
            .collect()
    }

    /// Fail with the first error-level finding, if any.
    pub fn ensure_valid(&self) -> Result<()> {
        match self
            .validate()
            .into_iter()
            .find(|w| w.level == WarnLevel::Error)
        {
            Some(w) => Err(FerroError::InvalidConfig(w.message)),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.layout.rows.is_empty() {
            error("layout.rows is empty: at least one actuator is required".to_string());
        }
        for (i, row) in self.layout.rows.iter().enumerate() {
            if row.is_empty() {
                error(format!("layout row {} has no pins", i + 1));
            }
        }

        let mut seen = HashSet::new();
        for pin in self.layout.rows.iter().flatten() {
            if !seen.insert(*pin) {
                error(format!("pin {pin} is assigned to more than one actuator"));
            }
        }

        let duty = self.drive.duty_cycle_percent;
        if !(duty > 0.0 && duty <= 100.0) {
            error(format!("drive.duty_cycle_percent={duty} must be in (0, 100]"));
        } else if duty_from_percent(duty) == 0 {
            error(format!("drive.duty_cycle_percent={duty} rounds to a zero duty register"));
        }
        if self.drive.frequency_hz == 0 {
            error("drive.frequency_hz must be nonzero".to_string());
        }
        if self.timing.tick_period_ms == 0 {
            error("timing.tick_period_ms must be nonzero".to_string());
        }

        if self.timing.tick_period_ms > self.timing.off_delay_ms {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "timing.tick_period_ms={} exceeds off_delay_ms={}; the off-delay \
                     will overshoot by up to one tick",
                    self.timing.tick_period_ms, self.timing.off_delay_ms
                ),
            });
        }
        if self.timing.off_delay_ms >= self.timing.max_on_time_ms {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "timing.off_delay_ms={} is not below max_on_time_ms={}; \
                     max-on-time will always cut the hand-off short",
                    self.timing.off_delay_ms, self.timing.max_on_time_ms
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_twelve_actuators_in_three_rows() {
        let cfg = Config::default();
        assert_eq!(cfg.layout.count(), 12);
        assert_eq!(cfg.layout.row_lengths(), vec![4, 4, 4]);
        assert_eq!(cfg.timing.off_delay_ms, 400);
        assert_eq!(cfg.timing.max_on_time_ms, 10_000);
        assert_eq!(cfg.timing.tick_period_ms, 50);
        assert_eq!(cfg.drive.frequency_hz, 1000);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "timing:\n  off_delay_ms: 250\nlayout:\n  rows:\n    - [1, 2]\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.timing.off_delay_ms, 250);
        assert_eq!(cfg.timing.max_on_time_ms, 10_000);
        assert_eq!(cfg.layout.count(), 2);
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn actuator_params_are_row_major_from_one() {
        let cfg = Config::default();
        let params = cfg.actuator_params();
        assert_eq!(params.len(), 12);
        assert_eq!((params[0].id, params[0].pin), (1, 26));
        assert_eq!((params[4].id, params[4].row, params[4].column), (5, 1, 0));
        assert_eq!((params[11].id, params[11].pin), (12, 12));
        assert!(params.iter().all(|p| p.off_delay_ms == 400));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut cfg = Config::default();
        cfg.server.port = 9000;
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.server.port, 9000);
    }

    #[test]
    fn load_or_default_without_path() {
        let cfg = Config::load_or_default(None).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/ferrogrid.yaml")).unwrap_err();
        assert!(matches!(err, FerroError::Io(_)));
    }

    #[test]
    fn validate_rejects_duplicate_pins() {
        let mut cfg = Config::default();
        cfg.layout.rows = vec![vec![1, 2], vec![2, 3]];
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("pin 2")));
        assert!(cfg.ensure_valid().is_err());
    }

    #[test]
    fn validate_rejects_empty_layout_and_rows() {
        let mut cfg = Config::default();
        cfg.layout.rows = vec![];
        assert!(cfg.ensure_valid().is_err());

        cfg.layout.rows = vec![vec![1], vec![]];
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("row 2")));
    }

    #[test]
    fn validate_rejects_zero_duty() {
        let mut cfg = Config::default();
        cfg.drive.duty_cycle_percent = 0.0;
        assert!(matches!(
            cfg.ensure_valid(),
            Err(FerroError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_duty_below_one_register_step() {
        let mut cfg = Config::default();
        cfg.drive.duty_cycle_percent = 0.001;
        let err = cfg.ensure_valid().unwrap_err();
        assert!(err.to_string().contains("zero duty register"), "{err}");
        assert!(crate::grid::Grid::simulated(&cfg).is_err());

        // One register step is the smallest duty that still energizes.
        cfg.drive.duty_cycle_percent = 0.002;
        assert!(cfg.ensure_valid().is_ok());
    }

    #[test]
    fn validate_rejects_zero_tick_period_and_frequency() {
        let mut cfg = Config::default();
        cfg.timing.tick_period_ms = 0;
        cfg.drive.frequency_hz = 0;
        let errors = cfg
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .count();
        assert_eq!(errors, 2);
    }

    #[test]
    fn slow_tick_is_only_a_warning() {
        let mut cfg = Config::default();
        cfg.timing.tick_period_ms = 500;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(cfg.ensure_valid().is_ok());
    }
}
