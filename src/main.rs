use nalgebra::{UnitQuaternion, Vector3};

use autonav::body::{BodyState, ThrustCapacity};
use autonav::control::{Mover, TorqueActuator};
use autonav::sim::{aim_at, ShipSim};

fn main() {
    // -----------------------------------------------------------------------
    // Vehicle: "Longliner" utility freighter
    // -----------------------------------------------------------------------
    // One big aft engine, modest maneuvering thrusters everywhere else.
    let mass = 25_000.0; // kg
    let thrust = ThrustCapacity {
        forward: 1_200_000.0, // N (main engine)
        backward: 200_000.0,
        left: 150_000.0,
        right: 150_000.0,
        up: 150_000.0,
        down: 150_000.0,
    };
    let gyro_torque = 3.0e5; // N·m
    let angular_response = 0.06; // rad/s per unit command per tick

    let body = BodyState {
        tick: 0,
        time: 0.0,
        position: Vector3::zeros(),
        velocity: Vector3::zeros(),
        orientation: UnitQuaternion::identity(),
        angular_velocity: Vector3::zeros(),
        mass,
    };

    let mut sim = ShipSim::new(body, thrust, angular_response);
    let mut mover = Mover::new();
    mover.profile_mut().add_actuator(TorqueActuator {
        max_torque: gyro_torque,
        working: true,
    });

    let dest = Vector3::new(1500.0, 400.0, -2000.0);
    let cruise = 40.0; // m/s
    let radius = 10.0; // m

    println!();
    println!("====================================================================");
    println!("  AUTOPILOT FLIGHT — Longliner");
    println!("====================================================================");
    println!();
    println!("  Vehicle");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Mass:          {:>10.0} kg    Gyro torque:  {:>10.0} N·m",
        mass, gyro_torque
    );
    println!(
        "  Main engine:   {:>10.0} N     Maneuvering:  {:>10.0} N",
        thrust.forward, thrust.left
    );
    println!(
        "  Destination:   ({:.0}, {:.0}, {:.0}) m,  cruise {:.0} m/s, radius {:.0} m",
        dest.x, dest.y, dest.z, cruise, radius
    );
    println!();

    // -----------------------------------------------------------------------
    // Phase 1: calibrate and face the destination
    // -----------------------------------------------------------------------
    let direction = dest.normalize();
    let (aligned, aim_ticks) = aim_at(&mut sim, &mut mover, direction, 6000);

    println!("  Attitude");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Aligned:       {:>10}       Ticks:        {:>10}",
        aligned, aim_ticks
    );
    println!(
        "  Torque/accel coefficient: {:.3e} (rad/s)/(N·m)",
        mover.profile().torque_accel_ratio()
    );
    println!();

    // -----------------------------------------------------------------------
    // Phase 2: fly, sampling the trajectory
    // -----------------------------------------------------------------------
    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>8}  {:>10}  {:>10}  {:>8}",
        "t (s)", "dist (m)", "vel (m/s)", "phase"
    );
    println!("  {}", "─".repeat(44));

    let max_ticks = 60 * 600;
    let mut arrived_tick = None;
    for tick in 0..max_ticks {
        let body = sim.body().clone();
        let distance = (dest - body.position).norm();
        let speed = body.velocity.norm();

        if arrived_tick.is_none() && distance <= radius {
            arrived_tick = Some(tick);
            mover.full_stop(&mut sim);
        }

        if tick % 600 == 0 || arrived_tick == Some(tick) {
            let phase = if arrived_tick.is_some() {
                "STOP"
            } else if speed > cruise * 0.95 {
                "CRUISE"
            } else {
                "ACCEL"
            };
            println!(
                "  {:>8.1}  {:>10.1}  {:>10.1}  {:>8}",
                body.time, distance, speed, phase
            );
        }

        if arrived_tick.is_none() {
            let capacity = *sim.thrust();
            mover.calc_move(&body, &capacity, cruise, dest, Vector3::zeros());
            mover.move_and_rotate(&mut sim, true);
        } else if speed < 0.1 {
            break;
        }
        sim.step();
    }

    let final_body = sim.body();
    let final_distance = (dest - final_body.position).norm();

    println!();
    println!("  Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Arrived:       {:>10}       Final dist:   {:>10.2} m",
        arrived_tick.is_some(),
        final_distance
    );
    println!(
        "  Final speed:   {:>10.3} m/s   Flight time:  {:>10.1} s",
        final_body.velocity.norm(),
        final_body.time
    );
    println!("====================================================================");
    println!();
}
