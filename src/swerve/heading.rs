// Continuous-heading PID controller
//
// Headings live on a circle with a 360° period. The error is always wrapped into
// (-180°, 180°] so the controller turns the short way around.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Wrap an angle in degrees into (-180, 180]
///
/// Exactly ±180 resolves to +180 so an antipodal error always turns the same way.
pub fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Gains and limits for a [`HeadingController`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Heading error (degrees) below which the module counts as on target
    pub tolerance_deg: f64,
    /// Output is clamped to [-output_limit, output_limit]
    pub output_limit: f64,
}

impl Default for HeadingGains {
    fn default() -> Self {
        Self {
            kp: 0.005,
            ki: 0.0,
            kd: 0.0,
            tolerance_deg: 5.0,
            output_limit: 1.0,
        }
    }
}

pub struct HeadingController {
    gains: HeadingGains,
    /// Control period in seconds
    period: f64,
    setpoint_deg: f64,
    integral: f64,
    prev_error: Option<f64>,
    /// None until the first `calculate`
    last_error: Option<f64>,
}

impl HeadingController {
    pub fn new(gains: HeadingGains, period: f64) -> Self {
        Self {
            gains,
            period,
            setpoint_deg: 0.0,
            integral: 0.0,
            prev_error: None,
            last_error: None,
        }
    }

    pub fn gains(&self) -> HeadingGains {
        self.gains
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint_deg
    }

    /// Store a new target heading, normalized into (-180, 180]
    pub fn set_setpoint(&mut self, degrees: f64) {
        if !degrees.is_finite() {
            debug!(degrees, "ignoring non-finite heading setpoint");
            return;
        }
        self.setpoint_deg = wrap_degrees(degrees);
    }

    /// Shortest-path error from `measured_deg` to the setpoint
    pub fn error(&self, measured_deg: f64) -> f64 {
        wrap_degrees(self.setpoint_deg - measured_deg)
    }

    /// Error seen by the most recent `calculate` call
    pub fn last_error(&self) -> Option<f64> {
        self.last_error
    }

    /// Run one control step and return the steering output
    pub fn calculate(&mut self, measured_deg: f64) -> f64 {
        let limit = self.gains.output_limit.abs();
        let error = self.error(measured_deg);
        if !error.is_finite() {
            // Bad reading; hold still rather than spin
            return 0.0;
        }
        self.last_error = Some(error);

        let dt = self.period;
        if self.gains.ki != 0.0 {
            self.integral += error * dt;
            // Integral alone may never saturate the output
            let i_max = limit / self.gains.ki.abs();
            self.integral = self.integral.clamp(-i_max, i_max);
        }

        // Difference of wrapped errors is wrapped again so a setpoint change across
        // the ±180 seam doesn't kick the derivative
        let derivative = match self.prev_error {
            Some(prev) if dt > 0.0 => wrap_degrees(error - prev) / dt,
            _ => 0.0,
        };
        self.prev_error = Some(error);

        let output = self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative;
        output.clamp(-limit, limit)
    }

    /// True when the wrapped error is inside `tolerance_deg`
    pub fn at_setpoint_within(&self, measured_deg: f64, tolerance_deg: f64) -> bool {
        self.error(measured_deg).abs() < tolerance_deg
    }

    /// True when the last calculated error is inside the configured tolerance
    ///
    /// False until `calculate` has run at least once.
    pub fn at_setpoint(&self) -> bool {
        self.last_error
            .is_some_and(|error| error.abs() < self.gains.tolerance_deg)
    }

    /// Clear integral and derivative history
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.last_error = None;
    }
}
