// Simulated swerve module hardware
//
// One `SimulatedModule` owns the plant state; the sensor and actuator handles it
// hands out all share that state, so a module wired to them closes the loop.

use std::sync::{Arc, Mutex, MutexGuard};

use super::heading::wrap_degrees;
use super::hardware::{AngleSensor, DriveActuator, SteeringActuator};

/// Steering slew rate at full command, degrees per second
pub const DEFAULT_MAX_STEER_RATE_DEG_S: f64 = 720.0;

#[derive(Debug, Clone, Default)]
struct PlantState {
    heading_deg: f64,
    drive_command: f64,
    steering_command: f64,
    /// Last value reported by the sensor; only refreshed while not frozen
    sensor_raw_deg: f64,
    sensor_frozen: bool,
}

#[derive(Debug, Clone)]
pub struct SimulatedModule {
    state: Arc<Mutex<PlantState>>,
    sensor_offset_deg: f64,
    sensor_inverted: bool,
    max_steer_rate_deg_s: f64,
}

impl SimulatedModule {
    /// `sensor_offset_deg` is what the sensor reads when the wheel points along +x
    pub fn new(sensor_offset_deg: f64, sensor_inverted: bool) -> Self {
        let sim = Self {
            state: Arc::new(Mutex::new(PlantState::default())),
            sensor_offset_deg,
            sensor_inverted,
            max_steer_rate_deg_s: DEFAULT_MAX_STEER_RATE_DEG_S,
        };
        sim.refresh_sensor();
        sim
    }

    pub fn with_max_steer_rate(mut self, deg_per_s: f64) -> Self {
        self.max_steer_rate_deg_s = deg_per_s;
        self
    }

    fn lock(&self) -> MutexGuard<'_, PlantState> {
        // Plain data; a panic elsewhere can't leave it inconsistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn raw_reading(&self, heading_deg: f64) -> f64 {
        let sign = if self.sensor_inverted { -1.0 } else { 1.0 };
        (self.sensor_offset_deg + sign * heading_deg).rem_euclid(360.0)
    }

    fn refresh_sensor(&self) {
        let raw = self.raw_reading(self.lock().heading_deg);
        let mut state = self.lock();
        if !state.sensor_frozen {
            state.sensor_raw_deg = raw;
        }
    }

    /// True wheel heading, degrees in (-180, 180]
    pub fn heading_deg(&self) -> f64 {
        self.lock().heading_deg
    }

    pub fn set_heading_deg(&self, heading_deg: f64) {
        self.lock().heading_deg = wrap_degrees(heading_deg);
        self.refresh_sensor();
    }

    pub fn drive_command(&self) -> f64 {
        self.lock().drive_command
    }

    pub fn steering_command(&self) -> f64 {
        self.lock().steering_command
    }

    /// Stop the sensor updating, as a disconnected encoder would
    pub fn freeze_sensor(&self, frozen: bool) {
        self.lock().sensor_frozen = frozen;
        self.refresh_sensor();
    }

    /// Advance the plant by `dt` seconds
    pub fn step(&self, dt: f64) {
        {
            let mut state = self.lock();
            let command = state.steering_command.clamp(-1.0, 1.0);
            state.heading_deg = wrap_degrees(state.heading_deg + command * self.max_steer_rate_deg_s * dt);
        }
        self.refresh_sensor();
    }

    pub fn sensor(&self) -> SimAngleSensor {
        SimAngleSensor { sim: self.clone() }
    }

    pub fn drive(&self) -> SimDriveMotor {
        SimDriveMotor { sim: self.clone() }
    }

    pub fn steering(&self) -> SimSteeringMotor {
        SimSteeringMotor { sim: self.clone() }
    }
}

pub struct SimAngleSensor {
    sim: SimulatedModule,
}

impl AngleSensor for SimAngleSensor {
    fn read_absolute_angle_degrees(&mut self) -> f64 {
        self.sim.lock().sensor_raw_deg
    }
}

pub struct SimDriveMotor {
    sim: SimulatedModule,
}

impl DriveActuator for SimDriveMotor {
    fn set_drive_command(&mut self, command: f64) {
        self.sim.lock().drive_command = command;
    }
}

pub struct SimSteeringMotor {
    sim: SimulatedModule,
}

impl SteeringActuator for SimSteeringMotor {
    fn set_steering_command(&mut self, command: f64) {
        self.sim.lock().steering_command = command;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_applies_offset() {
        let sim = SimulatedModule::new(49.0, false);
        let mut sensor = sim.sensor();
        assert_eq!(sensor.read_absolute_angle_degrees(), 49.0);

        sim.set_heading_deg(-60.0);
        assert_eq!(sensor.read_absolute_angle_degrees(), 349.0);
    }

    #[test]
    fn test_inverted_sensor() {
        let sim = SimulatedModule::new(10.0, true);
        sim.set_heading_deg(30.0);
        assert_eq!(sim.sensor().read_absolute_angle_degrees(), 340.0);
    }

    #[test]
    fn test_step_slews_heading() {
        let sim = SimulatedModule::new(0.0, false).with_max_steer_rate(100.0);
        sim.steering().set_steering_command(0.5);
        sim.step(0.1);
        assert!((sim.heading_deg() - 5.0).abs() < 1e-9);

        // Commands beyond full scale are clamped
        sim.steering().set_steering_command(-4.0);
        sim.step(0.1);
        assert!((sim.heading_deg() + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_frozen_sensor_reports_last_value() {
        let sim = SimulatedModule::new(0.0, false);
        sim.set_heading_deg(20.0);
        sim.freeze_sensor(true);
        sim.set_heading_deg(80.0);
        assert_eq!(sim.sensor().read_absolute_angle_degrees(), 20.0);

        sim.freeze_sensor(false);
        assert_eq!(sim.sensor().read_absolute_angle_degrees(), 80.0);
    }

    #[test]
    fn test_drive_command_recorded() {
        let sim = SimulatedModule::new(0.0, false);
        sim.drive().set_drive_command(-0.75);
        assert_eq!(sim.drive_command(), -0.75);
    }
}
