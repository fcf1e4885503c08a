// Timeouts, topics, swerve module configuration
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::swerve::{ConfigError, HeadingGains, Vector2, validate_gains};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_BASE: &str = "swerve/cmd/base"; // chassis commands
pub const TOPIC_RT_MODULES: &str = "swerve/rt/modules"; // per-module actuation
pub const TOPIC_HEALTH: &str = "swerve/state/health"; // health status

// Reference chassis: 28 in square, one module at each corner
const INCH: f64 = 0.0254;
pub const CHASSIS_LENGTH_M: f64 = 28.0 * INCH;
pub const CHASSIS_WIDTH_M: f64 = 28.0 * INCH;

pub const DEFAULT_MAX_SPEED_MPS: f64 = 2.0;

/// Static configuration for one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    /// Chassis-frame position in meters
    pub position: Vector2,
    /// Sensor reading (degrees) when the wheel points along +x
    pub angle_offset_deg: f64,
    /// Sensor counts clockwise
    #[serde(default)]
    pub invert_sensor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwerveConfig {
    pub modules: Vec<ModuleConfig>,
    #[serde(default)]
    pub center_of_rotation: Vector2,
    #[serde(default)]
    pub heading: HeadingGains,
    /// Applied to drive speed (m/s) before it reaches the drive actuator
    #[serde(default = "default_drive_output_scale")]
    pub drive_output_scale: f64,
    /// Chassis translation commands above this are scaled down
    #[serde(default = "default_max_speed")]
    pub max_speed_mps: f64,
}

fn default_drive_output_scale() -> f64 {
    1.0
}

fn default_max_speed() -> f64 {
    DEFAULT_MAX_SPEED_MPS
}

impl Default for SwerveConfig {
    fn default() -> Self {
        let half_w = CHASSIS_WIDTH_M / 2.0;
        let half_l = CHASSIS_LENGTH_M / 2.0;
        let module = |name: &str, x: f64, y: f64, offset: f64| ModuleConfig {
            name: name.to_string(),
            position: Vector2::new(x, y),
            angle_offset_deg: offset,
            invert_sensor: true,
        };
        Self {
            modules: vec![
                module("front_right", half_w, half_l, 49.83398),
                module("front_left", -half_w, half_l, -134.20898),
                module("back_left", -half_w, -half_l, -71.10352),
                module("back_right", half_w, -half_l, 0.87891),
            ],
            center_of_rotation: Vector2::ZERO,
            heading: HeadingGains::default(),
            drive_output_scale: default_drive_output_scale(),
            max_speed_mps: DEFAULT_MAX_SPEED_MPS,
        }
    }
}

impl SwerveConfig {
    /// Read and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading swerve configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SwerveConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modules.is_empty() {
            return Err(ConfigError::NoModules);
        }
        validate_gains(&self.heading)?;
        if !(self.max_speed_mps.is_finite() && self.max_speed_mps > 0.0) {
            return Err(ConfigError::InvalidGain {
                name: "max_speed_mps",
                value: self.max_speed_mps,
            });
        }
        if !self.drive_output_scale.is_finite() {
            return Err(ConfigError::InvalidGain {
                name: "drive_output_scale",
                value: self.drive_output_scale,
            });
        }
        if !self.center_of_rotation.is_finite() {
            return Err(ConfigError::InvalidGeometry {
                module: "*".to_string(),
                reason: "center of rotation must be finite".to_string(),
            });
        }

        let mut names = HashSet::new();
        for module in &self.modules {
            if !names.insert(module.name.as_str()) {
                return Err(ConfigError::InvalidGeometry {
                    module: module.name.clone(),
                    reason: "duplicate module name".to_string(),
                });
            }
            if !module.position.is_finite() || !module.angle_offset_deg.is_finite() {
                return Err(ConfigError::InvalidGeometry {
                    module: module.name.clone(),
                    reason: "position and sensor offset must be finite".to_string(),
                });
            }
        }
        Ok(())
    }
}
