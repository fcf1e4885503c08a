// Fixed-rate swerve loop with watchdog
// Note: a watchdog is a safety mechanism that triggers a safe action if something goes wrong
// Eg. without it if teleop crashes and stops sending commands, the modules would keep driving
// at the last commanded velocity forever

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

// local imports
use crate::config::{SwerveConfig, TOPIC_CMD_BASE, TOPIC_HEALTH, TOPIC_RT_MODULES};
use crate::messages::{BaseActuation, BaseCommand, ModuleActuation, RuntimeHealth};
use crate::swerve::sim::SimulatedModule;
use crate::swerve::{ConfigError, SwerveModule, Vector2};

/// Loop timing supplied by the caller
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    pub period: Duration,
    pub cmd_timeout: Duration,
}

pub struct Runtime {
    modules: Vec<SwerveModule>,
    plants: Vec<SimulatedModule>,
    max_speed_mps: f64,
    options: RuntimeOptions,
    latest_cmd: Option<BaseCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
}

impl Runtime {
    /// Build every configured module against a simulated plant
    pub fn simulated(config: &SwerveConfig, options: RuntimeOptions) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut modules = Vec::with_capacity(config.modules.len());
        let mut plants = Vec::with_capacity(config.modules.len());
        for module_cfg in &config.modules {
            let plant = SimulatedModule::new(module_cfg.angle_offset_deg, module_cfg.invert_sensor);
            let module = SwerveModule::builder(module_cfg.name.clone())
                .angle_sensor(plant.sensor())
                .drive_actuator(plant.drive())
                .steering_actuator(plant.steering())
                .position(module_cfg.position)
                .center_of_rotation(config.center_of_rotation)
                .angle_offset_deg(module_cfg.angle_offset_deg)
                .sensor_inverted(module_cfg.invert_sensor)
                .heading_gains(config.heading)
                .period_s(options.period.as_secs_f64())
                .drive_output_scale(config.drive_output_scale)
                .build()?;
            modules.push(module);
            plants.push(plant);
        }

        Ok(Self {
            modules,
            plants,
            max_speed_mps: config.max_speed_mps,
            options,
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        })
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn modules(&self) -> &[SwerveModule] {
        &self.modules
    }

    pub fn plants(&self) -> &[SimulatedModule] {
        &self.plants
    }

    /// Process incoming command
    fn on_command(&mut self, cmd: BaseCommand) {
        info!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = Instant::now();
    }

    /// Chassis velocity to apply this tick, honoring the watchdog
    fn active_command(&mut self) -> (Vector2, f64, Option<Vector2>) {
        let cmd_age = self.cmd_received_at.elapsed();

        match self.latest_cmd {
            Some(ref cmd) if cmd_age <= self.options.cmd_timeout => {
                self.health = RuntimeHealth::Ok;
                let mut velocity = cmd.chassis_velocity();
                let speed = velocity.norm();
                if speed > self.max_speed_mps {
                    velocity = velocity * (self.max_speed_mps / speed);
                }
                let theta = if cmd.theta_vel.is_finite() { cmd.theta_vel } else { 0.0 };
                (velocity, theta, cmd.center_of_rotation)
            }
            Some(ref cmd) => {
                // Watchdog triggered - stop the robot, keep the pivot
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Command stale ({:?} old), stopping robot", cmd_age);
                }
                self.health = RuntimeHealth::CmdStale;
                (Vector2::ZERO, 0.0, cmd.center_of_rotation)
            }
            None => {
                // No command ever received
                self.health = RuntimeHealth::CmdStale;
                (Vector2::ZERO, 0.0, None)
            }
        }
    }

    /// One tick: command phase, control phase, then advance the simulation
    fn compute_actuation(&mut self) -> BaseActuation {
        let (velocity, theta, pivot) = self.active_command();
        if !velocity.is_finite() {
            warn!("Ignoring non-finite chassis velocity {}", velocity);
        }
        let velocity = if velocity.is_finite() { velocity } else { Vector2::ZERO };

        let mut actuation = BaseActuation::default();
        for module in &mut self.modules {
            if let Some(cor) = pivot.filter(|cor| cor.is_finite()) {
                module.update_center_of_rotation(cor);
            }
            module.update_local_velocity(velocity, theta);
            let output = module.periodic();
            actuation
                .modules
                .push(ModuleActuation::from_output(module.name(), &output));
        }

        let dt = self.options.period.as_secs_f64();
        for plant in &self.plants {
            plant.step(dt);
        }
        actuation
    }
}

pub async fn run(
    config: SwerveConfig,
    options: RuntimeOptions,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut runtime = Runtime::simulated(&config, options)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_BASE).await?;
    let pub_actuation = session.declare_publisher(TOPIC_RT_MODULES).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut tick = interval(options.period);

    info!(
        "Runtime started: {} modules, {:?} period, {}ms watchdog timeout",
        runtime.modules.len(),
        options.period,
        options.cmd_timeout.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_BASE);
    info!("Publishing to: {}, {}", TOPIC_RT_MODULES, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<BaseCommand>(&payload) {
                Ok(cmd) => {
                    runtime.on_command(cmd);
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Run every module for this tick (includes watchdog logic)
        let actuation = runtime.compute_actuation();

        // 3. Publish actuation
        let actuation_json = serde_json::to_string(&actuation)?;
        pub_actuation.put(actuation_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health)?;
        pub_health.put(health_json).await?;
    }
}
