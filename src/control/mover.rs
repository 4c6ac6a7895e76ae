use nalgebra::{Rotation3, Vector2, Vector3};

use crate::body::{BodyState, Direction6, ThrustCapacity};
use crate::control::actuators::{Actuators, MoveCommand};
use crate::control::profiler::RotationProfile;

// ---------------------------------------------------------------------------
// Motion solver ("mover")
// ---------------------------------------------------------------------------
//
// Per-tick inverse control: from the current kinematics and a desired
// point/facing, derive bounded force and torque ratios. Translation works
// backward from a kinematic stopping-distance model (v = sqrt(2·a·s) per
// axis, with asymmetric available deceleration); rotation uses the same
// model with the profiler's learned torque coefficient in place of an
// inertia tensor.

/// Tuned thresholds. The defaults are empirical; they are parameters, not
/// invariants.
#[derive(Debug, Clone)]
pub struct MoverConfig {
    /// Target-velocity magnitude (m/s) below which an axis is handed to the
    /// dampers instead of being actively thrust.
    pub move_target_deadband: f64,
    /// Raw per-axis speed (m/s) above which opposing thrust defers to the
    /// dampers.
    pub damp_speed_threshold: f64,
    /// Squared target speed ((m/s)^2) below which target motion is treated
    /// as measurement noise and ignored.
    pub moving_target_threshold_sq: f64,
    /// Angular deadband (rad/s) for the rotation dampener rules.
    pub rotate_deadband: f64,
    /// Squared angular displacement (rad^2) considered "aligned".
    pub align_epsilon_sq: f64,
    /// Force ratio of the fixed probing command that bootstraps torque
    /// calibration.
    pub probe_ratio: f64,
    /// Reaction-time cap on angular target speed, as a multiple of the
    /// remaining angular displacement.
    pub angle_speed_cap_factor: f64,
    /// Hardware scale: control pixels at maximum rotation rate.
    pub pixels_for_max_rotation: f64,
    /// Hardware scale: roll ratio divisor.
    pub roll_control_multiplier: f64,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            move_target_deadband: 0.1,
            damp_speed_threshold: 1.0,
            moving_target_threshold_sq: 25.0,
            rotate_deadband: 0.01,
            align_epsilon_sq: 0.01,
            probe_ratio: 1.0,
            angle_speed_cap_factor: 1.0,
            pixels_for_max_rotation: 20.0,
            roll_control_multiplier: 0.2,
        }
    }
}

/// Per-axis solver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisState {
    Tracking,
    Stopped,
}

/// The per-tick force/torque solver for one controlling block. Never shared
/// between vehicles.
#[derive(Debug)]
pub struct Mover {
    config: MoverConfig,
    profile: RotationProfile,

    move_force_ratio: Vector3<f64>,
    rotate_force_ratio: Vector3<f64>,
    dampeners: bool,

    prev_angular_velocity: Vector3<f64>,
    prev_rotate_tick: Option<u64>,

    move_state: AxisState,
    rotate_state: AxisState,
}

/// Maximum speed that still permits stopping within `dist` under constant
/// deceleration `decel`: `sqrt(2·a·s)`. Zero for non-positive inputs.
pub fn max_speed(dist: f64, decel: f64) -> f64 {
    if dist <= 0.0 || decel <= 0.0 {
        return 0.0;
    }
    (2.0 * decel * dist).sqrt()
}

/// Replace non-finite components with zero. Division by near-zero thrust or
/// mass is recovered here, never propagated into an actuator command.
fn sanitize(mut v: Vector3<f64>, what: &str) -> Vector3<f64> {
    for axis in 0..3 {
        if !v[axis].is_finite() {
            log::warn!("non-finite {} on axis {}, substituting zero", what, axis);
            v[axis] = 0.0;
        }
    }
    v
}

/// Azimuth/elevation of a unit direction in the block frame
/// (+X right, +Y up, -Z forward).
fn azimuth_elevation(dir: &Vector3<f64>) -> (f64, f64) {
    let elevation = dir.y.clamp(-1.0, 1.0).asin();
    let azimuth = (-dir.x).atan2(-dir.z);
    (azimuth, elevation)
}

/// Snap a direction to the nearest cardinal axis of the block frame.
fn nearest_cardinal(v: &Vector3<f64>) -> Vector3<f64> {
    let mut axis = 0;
    for candidate in 1..3 {
        if v[candidate].abs() > v[axis].abs() {
            axis = candidate;
        }
    }
    let mut result = Vector3::zeros();
    result[axis] = v[axis].signum();
    result
}

impl Mover {
    pub fn new() -> Self {
        Self::with_config(MoverConfig::default())
    }

    pub fn with_config(config: MoverConfig) -> Self {
        Self {
            config,
            profile: RotationProfile::new(),
            move_force_ratio: Vector3::zeros(),
            rotate_force_ratio: Vector3::zeros(),
            dampeners: true,
            prev_angular_velocity: Vector3::zeros(),
            prev_rotate_tick: None,
            move_state: AxisState::Stopped,
            rotate_state: AxisState::Stopped,
        }
    }

    pub fn profile(&self) -> &RotationProfile {
        &self.profile
    }

    /// Structural-change notifications land here.
    pub fn profile_mut(&mut self) -> &mut RotationProfile {
        &mut self.profile
    }

    pub fn move_state(&self) -> AxisState {
        self.move_state
    }

    pub fn rotate_state(&self) -> AxisState {
        self.rotate_state
    }

    /// Translational force ratio from the last `calc_move`. Bounded by
    /// construction only per the dampener rules; clamped at submission.
    pub fn move_force_ratio(&self) -> Vector3<f64> {
        self.move_force_ratio
    }

    pub fn rotate_force_ratio(&self) -> Vector3<f64> {
        self.rotate_force_ratio
    }

    // -----------------------------------------------------------------------
    // Translation
    // -----------------------------------------------------------------------

    /// Solve the translational force ratio for one tick.
    ///
    /// `dest_point`/`dest_velocity` are world-frame; `speed_target` is the
    /// cruise-speed ceiling from the settings chain.
    pub fn calc_move(
        &mut self,
        body: &BodyState,
        thrust: &ThrustCapacity,
        speed_target: f64,
        dest_point: Vector3<f64>,
        dest_velocity: Vector3<f64>,
    ) {
        let disp_world = dest_point - body.position;

        // A slow-drifting target is noise; chase the point, not the drift.
        let rel_vel_world = if dest_velocity.norm_squared() > self.config.moving_target_threshold_sq
        {
            body.velocity - dest_velocity
        } else {
            body.velocity
        };

        let disp = body.to_local(&disp_world);
        let rel_vel = body.to_local(&rel_vel_world);
        let velocity = body.to_local(&body.velocity);

        let mut target_velocity = self.maximum_velocity(&disp, thrust, body.mass);

        // Cruise ceiling: scale uniformly to preserve direction.
        let target_speed_sq = target_velocity.norm_squared();
        if target_speed_sq > speed_target * speed_target {
            target_velocity *= speed_target / target_speed_sq.sqrt();
        }

        // One-tick correction toward the target velocity.
        let accel = target_velocity - rel_vel;
        let mut ratio = sanitize(
            self.to_force_ratio(&accel, thrust, body.mass),
            "translation force ratio",
        );

        // Dampener policy: hand an axis to the built-in damper when active
        // thrust would fight it.
        let mut dampeners = false;
        for axis in 0..3 {
            if target_velocity[axis].abs() < self.config.move_target_deadband {
                ratio[axis] = 0.0;
                dampeners = true;
                continue;
            }
            let r = ratio[axis];
            if r != 0.0
                && r.abs() <= 1.0
                && velocity[axis].abs() > self.config.damp_speed_threshold
                && r.signum() * velocity[axis].signum() < 0.0
            {
                ratio[axis] = 0.0;
                dampeners = true;
            }
        }

        log::trace!(
            "disp: {:?}, target velocity: {:?}, force ratio: {:?}",
            disp,
            target_velocity,
            ratio
        );

        self.move_force_ratio = ratio;
        self.move_state = if ratio == Vector3::zeros() {
            AxisState::Stopped
        } else {
            AxisState::Tracking
        };
        self.dampeners = dampeners;
    }

    /// Per-axis maximum velocity that still stops at the displacement,
    /// signed, using the thrust available *against* the travel direction.
    fn maximum_velocity(
        &self,
        disp: &Vector3<f64>,
        thrust: &ThrustCapacity,
        mass: f64,
    ) -> Vector3<f64> {
        let mut result = Vector3::zeros();
        for axis in 0..3 {
            let d = disp[axis];
            if d == 0.0 {
                continue;
            }
            let travel = Direction6::along(axis, d > 0.0);
            let decel = thrust.available(travel.flip()) / mass;
            result[axis] = d.signum() * max_speed(d.abs(), decel);
        }
        sanitize(result, "stopping-distance velocity")
    }

    /// Force ratio from desired acceleration; thrust capacity is direction-
    /// dependent, so each sign uses its own divisor.
    fn to_force_ratio(
        &self,
        accel: &Vector3<f64>,
        thrust: &ThrustCapacity,
        mass: f64,
    ) -> Vector3<f64> {
        let mut result = Vector3::zeros();
        for axis in 0..3 {
            let a = accel[axis];
            if a > 0.0 {
                result[axis] = a * mass / thrust.available(Direction6::along(axis, true));
            } else if a < 0.0 {
                result[axis] = a * mass / thrust.available(Direction6::along(axis, false));
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Rotation
    // -----------------------------------------------------------------------

    /// Solve the rotational force ratio for one tick.
    ///
    /// `desired_local` is the direction to face, in the vehicle's local
    /// frame; `reference` orients the navigation face relative to the
    /// controlling block (identity when they coincide). Returns true when
    /// the facing error is within the alignment threshold.
    pub fn calc_rotate(
        &mut self,
        body: &BodyState,
        desired_local: Vector3<f64>,
        reference: &Rotation3<f64>,
    ) -> bool {
        // Angular velocity in the block frame, sign-inverted to match the
        // actuator convention.
        let angular_velocity = -body.to_local(&body.angular_velocity);

        self.feed_calibration(body.tick, &angular_velocity);

        let norm = desired_local.norm();
        if norm < 1e-9 {
            self.record_rotation(body.tick, angular_velocity, Vector3::zeros());
            return false;
        }
        let direction = reference.inverse() * (desired_local / norm);
        let (azimuth, elevation) = azimuth_elevation(&direction.normalize());

        let right = nearest_cardinal(&(reference * Vector3::x()));
        let up = nearest_cardinal(&(reference * Vector3::y()));

        // Signed angular error per axis.
        let displacement = right * (-elevation) + up * (-azimuth);
        let aligned = displacement.norm_squared() < self.config.align_epsilon_sq;

        if !self.profile.is_calibrated() {
            // No learned coefficient yet: issue a fixed probe so the next
            // tick's velocity delta yields a calibration sample.
            let probe = Direction6::Up.unit() * self.config.probe_ratio;
            self.record_rotation(body.tick, angular_velocity, probe);
            return aligned;
        }

        let torque = self.profile.total_torque();
        let decel = self.profile.torque_accel_ratio() * torque;
        if decel <= 0.0 {
            log::warn!("no usable torque, stopping rotation");
            self.record_rotation(body.tick, angular_velocity, Vector3::zeros());
            return aligned;
        }

        let target_velocity = self.max_angle_velocity(&displacement, decel);
        let accel = target_velocity - angular_velocity;
        let mut ratio = sanitize(accel / decel, "rotation force ratio");

        for axis in 0..3 {
            if target_velocity[axis].abs() < self.config.rotate_deadband {
                ratio[axis] = 0.0;
                continue;
            }
            let w = angular_velocity[axis];
            if w.abs() < self.config.rotate_deadband {
                continue;
            }
            // Opposing the spin is the dampers' job.
            if ratio[axis].signum() * w.signum() < 0.0 {
                ratio[axis] = 0.0;
            }
        }

        self.record_rotation(body.tick, angular_velocity, ratio);
        aligned
    }

    /// A calibration sample is only valid when exactly one tick has elapsed
    /// since the previous rotation command; anything older is contaminated
    /// by multiple commands and is skipped silently.
    fn feed_calibration(&mut self, tick: u64, angular_velocity: &Vector3<f64>) {
        let Some(prev_tick) = self.prev_rotate_tick else {
            return;
        };
        if tick != prev_tick + 1 || self.rotate_force_ratio == Vector3::zeros() {
            return;
        }
        let torque = self.profile.total_torque();
        if torque <= 0.0 {
            return;
        }
        let commanded = self.rotate_force_ratio;
        let delta = angular_velocity - self.prev_angular_velocity;
        let observed = delta.component_div(&(commanded * torque));
        self.profile.update_learned(&commanded, &observed);
    }

    fn record_rotation(&mut self, tick: u64, angular_velocity: Vector3<f64>, ratio: Vector3<f64>) {
        self.prev_rotate_tick = Some(tick);
        self.prev_angular_velocity = angular_velocity;
        self.rotate_force_ratio = ratio;
        self.rotate_state = if ratio == Vector3::zeros() {
            AxisState::Stopped
        } else {
            AxisState::Tracking
        };
    }

    /// Angular analogue of `maximum_velocity`, with a reaction-time cap.
    fn max_angle_velocity(&self, disp: &Vector3<f64>, decel: f64) -> Vector3<f64> {
        let cap = self.config.angle_speed_cap_factor;
        let mut result = Vector3::zeros();
        for axis in 0..3 {
            let d = disp[axis];
            if d > 0.0 {
                result[axis] = max_speed(d, decel).min(d * cap);
            } else if d < 0.0 {
                result[axis] = -max_speed(-d, decel).min(-d * cap);
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Submission and stops
    // -----------------------------------------------------------------------

    /// Clamp and submit the solved ratios. With both vectors exactly zero a
    /// hard stop is issued instead of a zero command, and re-issued every
    /// tick: outside forces can restore motion while the solver sits at
    /// zero. Without simulation authority nothing is submitted at all.
    pub fn move_and_rotate(&mut self, actuators: &mut dyn Actuators, authority: bool) {
        if !authority {
            log::trace!("no simulation authority, skipping actuator submission");
            return;
        }

        if self.move_force_ratio == Vector3::zeros() && self.rotate_force_ratio == Vector3::zeros()
        {
            self.move_state = AxisState::Stopped;
            self.rotate_state = AxisState::Stopped;
            actuators.full_stop();
            return;
        }

        actuators.set_dampeners(self.dampeners);

        let m = &self.move_force_ratio;
        let r = &self.rotate_force_ratio;
        let command = MoveCommand {
            thrust_ratio: Vector3::new(
                m.x.clamp(-1.0, 1.0),
                m.y.clamp(-1.0, 1.0),
                m.z.clamp(-1.0, 1.0),
            ),
            pitch_yaw: Vector2::new(
                r.x.clamp(-1.0, 1.0) * self.config.pixels_for_max_rotation,
                r.y.clamp(-1.0, 1.0) * self.config.pixels_for_max_rotation,
            ),
            roll: r.z.clamp(-1.0, 1.0) / self.config.roll_control_multiplier,
        };
        actuators.move_and_rotate(command);
    }

    /// Zero the translational ratio, optionally handing the axes to the
    /// dampers.
    pub fn stop_move(&mut self, enable_dampeners: bool) {
        self.move_force_ratio = Vector3::zeros();
        self.move_state = AxisState::Stopped;
        if enable_dampeners {
            self.dampeners = true;
        }
    }

    /// Zero the rotational ratio.
    pub fn stop_rotate(&mut self) {
        self.rotate_force_ratio = Vector3::zeros();
        self.rotate_state = AxisState::Stopped;
    }

    /// Stop everything: zero both ratios, enable dampers, and submit the
    /// hard-stop command.
    pub fn full_stop(&mut self, actuators: &mut dyn Actuators) {
        self.stop_move(true);
        self.stop_rotate();
        actuators.set_dampeners(true);
        actuators.full_stop();
    }
}

impl Default for Mover {
    fn default() -> Self {
        Self::new()
    }
}
