// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::swerve::{ModuleOutput, Vector2};

// Command from teleop/scripts -> runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseCommand {
    /// m/s along chassis +x (or field +x when `yaw_deg` is set)
    pub x_vel: f64,
    /// m/s along chassis +y (or field +y when `yaw_deg` is set)
    pub y_vel: f64,
    /// rad/s, positive turns the modules toward their clockwise perpendicular
    pub theta_vel: f64,
    /// Robot yaw in degrees; when present the translation is field-relative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaw_deg: Option<f64>,
    /// New pivot for rotation, in chassis coordinates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_of_rotation: Option<Vector2>,
}

impl BaseCommand {
    pub fn new(x_vel: f64, y_vel: f64, theta_vel: f64) -> Self {
        Self {
            x_vel,
            y_vel,
            theta_vel,
            yaw_deg: None,
            center_of_rotation: None,
        }
    }

    /// Translation expressed in the chassis frame
    pub fn chassis_velocity(&self) -> Vector2 {
        let translation = Vector2::new(self.x_vel, self.y_vel);
        match self.yaw_deg {
            // Field frame -> chassis frame undoes the robot's yaw
            Some(yaw) if yaw.is_finite() => translation.rotated(-yaw.to_radians()),
            _ => translation,
        }
    }
}

// Actuation output of one module for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleActuation {
    pub name: String,
    pub measured_heading_deg: f64,
    pub target_heading_deg: f64,
    pub reversed: bool,
    pub drive: f64,
    pub steering: f64,
    pub at_setpoint: bool,
}

impl ModuleActuation {
    pub fn from_output(name: &str, output: &ModuleOutput) -> Self {
        Self {
            name: name.to_string(),
            measured_heading_deg: output.measured_heading_deg,
            target_heading_deg: output.target_heading_deg,
            reversed: output.reversed,
            drive: output.drive,
            steering: output.steering,
            at_setpoint: output.at_setpoint,
        }
    }
}

// Actuation output from runtime -> telemetry / hardware bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BaseActuation {
    pub modules: Vec<ModuleActuation>,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}
