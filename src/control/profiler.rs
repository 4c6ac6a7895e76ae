use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Rotational response profiler
// ---------------------------------------------------------------------------
//
// The ratio between commanded torque and resulting angular acceleration
// depends on the vehicle's moment of inertia, which is not directly
// knowable. Instead of an inertia model, the profiler keeps a running
// maximum over observed samples: slightly conservative, converges quickly,
// re-baselined when the vehicle's structure changes.

/// Arena handle for a torque actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorHandle(usize);

/// One torque-producing actuator. `max_torque` is the rated torque already
/// derated by the actuator's own power-availability factor.
#[derive(Debug, Clone, Copy)]
pub struct TorqueActuator {
    pub max_torque: f64, // N·m
    pub working: bool,
}

/// Tracks the torque actuator set and the learned torque-to-angular-
/// acceleration coefficient. Owned by exactly one motion solver.
#[derive(Debug)]
pub struct RotationProfile {
    actuators: Vec<Option<TorqueActuator>>,
    free_slots: Vec<usize>,
    cached_total: Option<f64>,
    dirty: bool,
    learned: f64, // 0.0 = not yet calibrated
    command_deadband: f64,
}

impl RotationProfile {
    pub fn new() -> Self {
        Self {
            actuators: Vec::new(),
            free_slots: Vec::new(),
            cached_total: None,
            dirty: false,
            learned: 0.0,
            command_deadband: 0.01,
        }
    }

    /// Register a torque actuator (structural change: block added).
    /// Sets the recalibration flag.
    pub fn add_actuator(&mut self, actuator: TorqueActuator) -> ActuatorHandle {
        self.cached_total = None;
        self.dirty = true;
        match self.free_slots.pop() {
            Some(slot) => {
                self.actuators[slot] = Some(actuator);
                ActuatorHandle(slot)
            }
            None => {
                self.actuators.push(Some(actuator));
                ActuatorHandle(self.actuators.len() - 1)
            }
        }
    }

    /// A non-actuator block was added; mass distribution changed, so the
    /// learned coefficient must re-baseline. Removals do not set the flag.
    pub fn note_block_added(&mut self) {
        self.dirty = true;
    }

    /// Remove an actuator (structural change: block removed).
    pub fn remove_actuator(&mut self, handle: ActuatorHandle) {
        if let Some(slot) = self.actuators.get_mut(handle.0) {
            if slot.take().is_some() {
                self.free_slots.push(handle.0);
                self.cached_total = None;
            }
        }
    }

    /// Update an actuator's working/power state.
    pub fn set_working(&mut self, handle: ActuatorHandle, working: bool) {
        if let Some(Some(actuator)) = self.actuators.get_mut(handle.0) {
            if actuator.working != working {
                actuator.working = working;
                self.cached_total = None;
            }
        }
    }

    /// Sum of working actuators' derated torque (N·m), cached until the
    /// actuator set changes.
    pub fn total_torque(&mut self) -> f64 {
        if let Some(total) = self.cached_total {
            return total;
        }
        let total = self
            .actuators
            .iter()
            .flatten()
            .filter(|a| a.working)
            .map(|a| a.max_torque)
            .sum();
        self.cached_total = Some(total);
        total
    }

    /// The learned torque-to-angular-acceleration coefficient. Zero until
    /// the first calibration sample is accepted.
    pub fn torque_accel_ratio(&self) -> f64 {
        self.learned
    }

    pub fn is_calibrated(&self) -> bool {
        self.learned > 0.0
    }

    pub fn needs_recalibration(&self) -> bool {
        self.dirty
    }

    /// Feed one calibration sample: the commanded force ratio and the
    /// observed angular-acceleration ratio, per rotational axis.
    ///
    /// Axes with commanded magnitude below the deadband are being damped
    /// and carry no information. A valid positive observation is adopted
    /// when the profile is dirty (once, re-baselining after structural
    /// change) or when it exceeds the learned value. Non-positive
    /// observations come from external disturbance and never lower the
    /// coefficient.
    pub fn update_learned(&mut self, commanded: &Vector3<f64>, observed: &Vector3<f64>) {
        for axis in 0..3 {
            if commanded[axis].abs() < self.command_deadband {
                continue;
            }
            let sample = observed[axis];
            if !sample.is_finite() {
                continue;
            }
            if self.dirty || sample > self.learned {
                if sample > 0.0 {
                    log::debug!(
                        "torque/accel ratio {} -> {} (axis {})",
                        self.learned,
                        sample,
                        axis
                    );
                    self.learned = sample;
                    self.dirty = false;
                } else {
                    log::debug!("discarding non-positive ratio sample {} (axis {})", sample, axis);
                }
            }
        }
    }
}

impl Default for RotationProfile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gyro(torque: f64) -> TorqueActuator {
        TorqueActuator {
            max_torque: torque,
            working: true,
        }
    }

    #[test]
    fn total_torque_sums_working_actuators() {
        let mut profile = RotationProfile::new();
        let a = profile.add_actuator(gyro(1000.0));
        profile.add_actuator(gyro(500.0));
        assert_eq!(profile.total_torque(), 1500.0);

        profile.set_working(a, false);
        assert_eq!(profile.total_torque(), 500.0);

        profile.remove_actuator(a);
        assert_eq!(profile.total_torque(), 500.0);
    }

    #[test]
    fn removal_reuses_arena_slots() {
        let mut profile = RotationProfile::new();
        let a = profile.add_actuator(gyro(100.0));
        profile.remove_actuator(a);
        let b = profile.add_actuator(gyro(200.0));
        assert_eq!(a, b, "freed slot should be reused");
        assert_eq!(profile.total_torque(), 200.0);
    }

    #[test]
    fn coefficient_is_running_maximum() {
        let mut profile = RotationProfile::new();
        profile.add_actuator(gyro(1000.0));
        let cmd = Vector3::new(0.0, 1.0, 0.0);

        profile.update_learned(&cmd, &Vector3::new(0.0, 0.002, 0.0));
        assert_eq!(profile.torque_accel_ratio(), 0.002);

        // Lower sample ignored once calibrated.
        profile.update_learned(&cmd, &Vector3::new(0.0, 0.001, 0.0));
        assert_eq!(profile.torque_accel_ratio(), 0.002);

        // Higher sample adopted.
        profile.update_learned(&cmd, &Vector3::new(0.0, 0.003, 0.0));
        assert_eq!(profile.torque_accel_ratio(), 0.003);
    }

    #[test]
    fn dirty_flag_accepts_one_lower_sample() {
        let mut profile = RotationProfile::new();
        profile.add_actuator(gyro(1000.0));
        let cmd = Vector3::new(1.0, 0.0, 0.0);

        profile.update_learned(&cmd, &Vector3::new(0.004, 0.0, 0.0));
        assert_eq!(profile.torque_accel_ratio(), 0.004);

        // Structural change: next valid sample re-baselines, even if lower.
        profile.note_block_added();
        assert!(profile.needs_recalibration());
        profile.update_learned(&cmd, &Vector3::new(0.001, 0.0, 0.0));
        assert_eq!(profile.torque_accel_ratio(), 0.001);
        assert!(!profile.needs_recalibration());

        // Flag cleared: back to running-maximum behavior.
        profile.update_learned(&cmd, &Vector3::new(0.0005, 0.0, 0.0));
        assert_eq!(profile.torque_accel_ratio(), 0.001);
    }

    #[test]
    fn damped_axes_and_bad_samples_are_ignored() {
        let mut profile = RotationProfile::new();
        profile.add_actuator(gyro(1000.0));

        // Commanded below deadband: axis carries no information.
        profile.update_learned(&Vector3::new(0.005, 0.0, 0.0), &Vector3::new(9.0, 0.0, 0.0));
        assert_eq!(profile.torque_accel_ratio(), 0.0);

        let cmd = Vector3::new(1.0, 0.0, 0.0);
        // NaN from a zero division upstream.
        profile.update_learned(&cmd, &Vector3::new(f64::NAN, 0.0, 0.0));
        assert_eq!(profile.torque_accel_ratio(), 0.0);

        // Collision pushed the ship against the commanded torque.
        profile.update_learned(&cmd, &Vector3::new(-0.5, 0.0, 0.0));
        assert_eq!(profile.torque_accel_ratio(), 0.0);
    }
}
