use nalgebra::{Rotation3, UnitQuaternion, Vector3};

use crate::body::{BodyState, Direction6, ThrustCapacity};
use crate::control::{Actuators, MoveCommand, Mover, MoverConfig};

// ---------------------------------------------------------------------------
// Closed-loop flight harness
// ---------------------------------------------------------------------------
//
// A deliberately simple rigid-body plant behind the `Actuators` seam: thrust
// ratios integrate into velocity, rotation commands integrate into angular
// velocity through a fixed torque response, dampers decay idle axes. Good
// enough to close the loop around the solver and watch it converge; not a
// substitute for real vehicle dynamics.

const TICK_SECONDS: f64 = 1.0 / 60.0;

/// Simulated vehicle implementing the actuator seam.
pub struct ShipSim {
    body: BodyState,
    thrust: ThrustCapacity,
    /// Angular-velocity change (rad/s) per unit commanded ratio per tick.
    angular_response: f64,
    dt: f64,
    config: MoverConfig,
    command: Option<MoveCommand>,
    dampeners: bool,
    arrested: bool,
}

impl ShipSim {
    pub fn new(body: BodyState, thrust: ThrustCapacity, angular_response: f64) -> Self {
        Self {
            body,
            thrust,
            angular_response,
            dt: TICK_SECONDS,
            config: MoverConfig::default(),
            command: None,
            dampeners: true,
            arrested: false,
        }
    }

    pub fn body(&self) -> &BodyState {
        &self.body
    }

    pub fn thrust(&self) -> &ThrustCapacity {
        &self.thrust
    }

    /// Advance the plant by one tick, applying the last submitted command.
    pub fn step(&mut self) {
        let dt = self.dt;
        let mut local_v = self.body.to_local(&self.body.velocity);
        // Same sign convention as the solver: inverted local rate.
        let mut omega = -self.body.to_local(&self.body.angular_velocity);

        match self.command {
            Some(ref cmd) => {
                for axis in 0..3 {
                    let r = cmd.thrust_ratio[axis];
                    if r != 0.0 {
                        let dir = Direction6::along(axis, r > 0.0);
                        local_v[axis] += r * self.thrust.available(dir) / self.body.mass * dt;
                    } else if self.dampeners {
                        self.damp_linear_axis(&mut local_v, axis);
                    }
                }

                let rot = Vector3::new(
                    cmd.pitch_yaw.x / self.config.pixels_for_max_rotation,
                    cmd.pitch_yaw.y / self.config.pixels_for_max_rotation,
                    cmd.roll * self.config.roll_control_multiplier,
                );
                for axis in 0..3 {
                    let r = rot[axis];
                    if r != 0.0 {
                        omega[axis] += r.clamp(-1.0, 1.0) * self.angular_response;
                    } else {
                        Self::damp_toward_zero(&mut omega[axis], self.angular_response);
                    }
                }
            }
            None => {
                if self.arrested || self.dampeners {
                    for axis in 0..3 {
                        self.damp_linear_axis(&mut local_v, axis);
                        Self::damp_toward_zero(&mut omega[axis], self.angular_response);
                    }
                }
            }
        }

        self.body.velocity = self.body.to_world(&local_v);
        let local_omega = -omega;
        self.body.orientation =
            self.body.orientation * UnitQuaternion::from_scaled_axis(local_omega * dt);
        self.body.angular_velocity = self.body.to_world(&local_omega);
        self.body.position += self.body.velocity * dt;
        self.body.tick += 1;
        self.body.time += dt;
    }

    fn damp_linear_axis(&self, local_v: &mut Vector3<f64>, axis: usize) {
        let v = local_v[axis];
        if v == 0.0 {
            return;
        }
        // Braking uses the thrusters opposing the drift.
        let dir = Direction6::along(axis, v < 0.0);
        let step = self.thrust.available(dir) / self.body.mass * self.dt;
        Self::damp_toward_zero(&mut local_v[axis], step);
    }

    fn damp_toward_zero(value: &mut f64, step: f64) {
        if value.abs() <= step {
            *value = 0.0;
        } else {
            *value -= value.signum() * step;
        }
    }
}

impl Actuators for ShipSim {
    fn move_and_rotate(&mut self, command: MoveCommand) {
        self.command = Some(command);
        self.arrested = false;
    }

    fn full_stop(&mut self) {
        self.command = None;
        self.arrested = true;
        self.dampeners = true;
    }

    fn set_dampeners(&mut self, enabled: bool) {
        self.dampeners = enabled;
    }
}

// ---------------------------------------------------------------------------
// Flight drivers
// ---------------------------------------------------------------------------

/// Outcome of a `fly_to` run.
#[derive(Debug, Clone, Copy)]
pub struct FlightReport {
    pub ticks: u64,
    pub arrived: bool,
    pub final_distance: f64,
    pub final_speed: f64,
}

/// Fly the ship to a world-frame point, then arrest. Translation only; the
/// attitude is left to the dampers.
pub fn fly_to(
    sim: &mut ShipSim,
    mover: &mut Mover,
    dest: Vector3<f64>,
    speed_target: f64,
    radius: f64,
    max_ticks: u64,
) -> FlightReport {
    let mut arrived = false;
    let mut ticks = 0;

    if !sim.thrust().can_move_any_direction() {
        log::warn!("thrust missing on some axis, refusing flight");
        return report(sim, dest, 0, false);
    }

    while ticks < max_ticks {
        let distance = (dest - sim.body().position).norm();
        if !arrived && distance <= radius {
            arrived = true;
            mover.full_stop(sim);
        } else if !arrived {
            let body = sim.body().clone();
            let thrust = *sim.thrust();
            mover.calc_move(&body, &thrust, speed_target, dest, Vector3::zeros());
            mover.move_and_rotate(sim, true);
        } else if sim.body().velocity.norm() < 0.5 {
            break;
        }
        sim.step();
        ticks += 1;
    }

    report(sim, dest, ticks, arrived)
}

/// Rotate the ship until its navigation face points along a world-frame
/// direction. Returns true with the tick count on success.
pub fn aim_at(
    sim: &mut ShipSim,
    mover: &mut Mover,
    world_dir: Vector3<f64>,
    max_ticks: u64,
) -> (bool, u64) {
    let mut ticks = 0;
    while ticks < max_ticks {
        let body = sim.body().clone();
        let desired_local = body.to_local(&world_dir);
        let aligned = mover.calc_rotate(&body, desired_local, &Rotation3::identity());
        if aligned && body.angular_velocity.norm() < 0.05 {
            mover.stop_rotate();
            return (true, ticks);
        }
        mover.move_and_rotate(sim, true);
        sim.step();
        ticks += 1;
    }
    (false, ticks)
}

fn report(sim: &ShipSim, dest: Vector3<f64>, ticks: u64, arrived: bool) -> FlightReport {
    FlightReport {
        ticks,
        arrived,
        final_distance: (dest - sim.body().position).norm(),
        final_speed: sim.body().velocity.norm(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TorqueActuator;
    use crate::settings::{NavSettings, ScopeLevel};
    use crate::target::{aim_point, Destination, LastSeen};
    use crate::world::{BlockId, Entity, World};
    use approx::assert_relative_eq;

    fn ship(mass: f64, thrust: ThrustCapacity, angular_response: f64) -> ShipSim {
        let body = BodyState {
            tick: 0,
            time: 0.0,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
            mass,
        };
        ShipSim::new(body, thrust, angular_response)
    }

    #[test]
    fn flight_converges_and_stops() {
        // 100 kg, 4 kN per direction: 40 m/s^2 everywhere. Cruise at 10 m/s
        // to a point 200 m out, arrive within 5 m.
        let mut sim = ship(100.0, ThrustCapacity::uniform(4000.0), 0.1);
        let mut mover = Mover::new();

        let dest = Vector3::new(200.0, 0.0, 0.0);
        let flight = fly_to(&mut sim, &mut mover, dest, 10.0, 5.0, 4000);

        assert!(flight.arrived, "did not arrive: {:?}", flight);
        assert!(
            flight.final_distance < 6.0,
            "stopped too far out: {:?}",
            flight
        );
        assert!(flight.final_speed < 1.0, "still moving: {:?}", flight);
    }

    #[test]
    fn settings_destination_drives_the_closed_loop() {
        // The full per-tick pipeline: the settings chain supplies the
        // destination descriptor, the world table resolves it, the predictor
        // turns it into an aim point, and the solver flies the ship there.
        let mut world = World::new();
        let station_position = Vector3::new(150.0, 0.0, 0.0);
        let station = world.spawn(Entity::at_rest(station_position));

        let mut nav = NavSettings::new(BlockId(1));
        let task = nav.scope_mut(ScopeLevel::Task);
        task.destination = Some(Destination::Grid {
            entity: station,
            last_seen: LastSeen {
                position: station_position,
                velocity: Vector3::zeros(),
                acceleration: Vector3::zeros(),
                seen_at: 0.0,
            },
        });
        task.speed_target = Some(10.0);
        task.destination_radius = Some(5.0);

        let mut sim = ship(100.0, ThrustCapacity::uniform(4000.0), 0.1);
        let mut mover = Mover::new();

        let mut arrived = false;
        for _ in 0..4000 {
            let body = sim.body().clone();
            let Some(sample) = nav.destination().resolve(&world, body.time) else {
                break;
            };
            let aim = aim_point(&sample, body.position, body.velocity);
            if !arrived && (aim - body.position).norm() <= nav.destination_radius() {
                arrived = true;
                mover.full_stop(&mut sim);
            } else if !arrived {
                let thrust = *sim.thrust();
                mover.calc_move(&body, &thrust, nav.speed_target(), aim, sample.velocity);
                mover.move_and_rotate(&mut sim, true);
            } else if sim.body().velocity.norm() < 0.5 {
                break;
            }
            sim.step();
        }

        assert!(arrived, "never reached the destination radius");
        let final_distance = (station_position - sim.body().position).norm();
        assert!(final_distance < 6.0, "stopped {} m out", final_distance);
        assert!(sim.body().velocity.norm() < 1.0);
    }

    #[test]
    fn cruise_speed_is_respected() {
        let mut sim = ship(100.0, ThrustCapacity::uniform(4000.0), 0.1);
        let mut mover = Mover::new();
        let dest = Vector3::new(500.0, 0.0, 0.0);

        let mut peak = 0.0_f64;
        for _ in 0..600 {
            let body = sim.body().clone();
            let thrust = *sim.thrust();
            mover.calc_move(&body, &thrust, 10.0, dest, Vector3::zeros());
            mover.move_and_rotate(&mut sim, true);
            sim.step();
            peak = peak.max(sim.body().velocity.norm());
        }
        assert!(peak > 5.0, "never got going, peak {}", peak);
        assert!(peak <= 10.5, "cruise ceiling exceeded, peak {}", peak);
    }

    #[test]
    fn missing_thrust_axis_refuses_flight() {
        let thrust = ThrustCapacity {
            right: 4000.0,
            left: 0.0,
            up: 4000.0,
            down: 4000.0,
            forward: 4000.0,
            backward: 4000.0,
        };
        let mut sim = ship(100.0, thrust, 0.1);
        let mut mover = Mover::new();
        let flight = fly_to(
            &mut sim,
            &mut mover,
            Vector3::new(100.0, 0.0, 0.0),
            10.0,
            5.0,
            1000,
        );
        assert!(!flight.arrived);
        assert_eq!(flight.ticks, 0);
    }

    #[test]
    fn aim_calibrates_then_aligns() {
        // One gyro of 1e5 N·m; the plant turns a full-ratio command into
        // 0.1 rad/s per tick, so the true torque coefficient is 1e-6.
        let mut sim = ship(1000.0, ThrustCapacity::uniform(10_000.0), 0.1);
        let mut mover = Mover::new();
        mover.profile_mut().add_actuator(TorqueActuator {
            max_torque: 1.0e5,
            working: true,
        });
        assert!(!mover.profile().is_calibrated());

        // Facing -Z, target +X: quarter turn of yaw.
        let (aligned, ticks) = aim_at(&mut sim, &mut mover, Vector3::new(1.0, 0.0, 0.0), 2000);

        assert!(aligned, "never aligned");
        assert!(ticks > 10, "a quarter turn cannot be instant");
        assert!(mover.profile().is_calibrated());
        // The probe command is unsaturated, so its sample recovers the
        // plant coefficient exactly.
        assert_relative_eq!(
            mover.profile().torque_accel_ratio(),
            1.0e-6,
            max_relative = 1.0e-9
        );

        // The facing actually points at the target.
        let forward = sim.body().to_world(&Vector3::new(0.0, 0.0, -1.0));
        let error = forward.angle(&Vector3::new(1.0, 0.0, 0.0));
        assert!(error < 0.15, "residual facing error {} rad", error);
    }

    #[test]
    fn full_stop_arrests_motion() {
        let mut sim = ship(100.0, ThrustCapacity::uniform(4000.0), 0.1);
        // Give it some drift, then arrest.
        let cmd = MoveCommand {
            thrust_ratio: Vector3::new(1.0, 0.0, 0.0),
            pitch_yaw: nalgebra::Vector2::zeros(),
            roll: 0.0,
        };
        sim.move_and_rotate(cmd);
        for _ in 0..60 {
            sim.step();
        }
        assert!(sim.body().velocity.norm() > 10.0);

        sim.full_stop();
        for _ in 0..120 {
            sim.step();
        }
        assert!(sim.body().velocity.norm() < 1.0e-9);
    }
}
