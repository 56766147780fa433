//! End-to-end scenarios through the `Pathfinder` facade.

use pathgrid_core::prelude::*;
use pathgrid_core::path::polyline_length;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn open_grid(width: u32, height: u32, cell_size: f32) -> Pathfinder {
    let mut pf = Pathfinder::new();
    pf.initialize();
    assert!(pf.set_grid_dimensions(width, height, cell_size));
    pf
}

fn random_walls(pf: &mut Pathfinder, seed: u64, density: f64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let (w, h) = (pf.grid().width(), pf.grid().height());
    for y in 0..h {
        for x in 0..w {
            if rng.gen_bool(density) {
                pf.set_cell_walkable(x, y, false);
            }
        }
    }
}

#[test]
fn diagonal_across_ten_by_ten() {
    let mut pf = open_grid(10, 10, 2.0);
    let handle = pf.find_path(1.0, 1.0, 19.0, 19.0, 0.5);

    assert!(!handle.is_null());
    assert_eq!(pf.path_status(handle), PathStatus::Found);
    assert!(pf.path_waypoint_count(handle) >= 1);

    let diagonal = (18.0f32 * 18.0 * 2.0).sqrt();
    let cell_diagonal = 2.0 * 2f32.sqrt();
    let length = pf.path_length(handle);
    assert!(
        (length - diagonal).abs() <= cell_diagonal,
        "length {} vs {}",
        length,
        diagonal
    );
}

#[test]
fn blocked_corridor_fails() {
    // Wall down x=5 with a single gap at y=5
    let mut pf = open_grid(10, 10, 1.0);
    for y in 0..10 {
        if y != 5 {
            pf.set_cell_walkable(5, y, false);
        }
    }
    let open = pf.find_path(0.5, 0.5, 9.5, 0.5, 0.0);
    assert!(!open.is_null());
    let through_gap = pf
        .path_waypoints(open)
        .iter()
        .any(|w| pf.world_to_grid(w.x, w.y) == GridPos::new(5, 5));
    assert!(through_gap);

    pf.set_cell_walkable(5, 5, false);
    let handle = pf.find_path(0.5, 0.5, 9.5, 0.5, 0.0);
    assert_eq!(handle, PathHandle::NULL);
    assert_eq!(pf.path_status(handle), PathStatus::Failed);
    assert!(!pf.last_error().is_empty());
}

#[test]
fn enclosed_goal_terminates() {
    // Full-size grid: the search must stop at the iteration cap
    let mut pf = Pathfinder::new();
    pf.initialize();
    for (x, y) in [(99, 99), (100, 99), (101, 99), (99, 100), (101, 100), (99, 101), (100, 101), (101, 101)] {
        pf.set_cell_walkable(x, y, false);
    }
    let handle = pf.find_path(1.0, 1.0, 201.0, 201.0, 0.0);
    assert!(handle.is_null());
    assert_eq!(pf.path_status(handle), PathStatus::Failed);
    assert_eq!(pf.active_path_count(), 0);
}

#[test]
fn regions_short_circuit_disconnected_goal() {
    let mut pf = open_grid(10, 10, 1.0);
    for y in 0..10 {
        pf.set_cell_walkable(5, y, false);
    }
    assert_eq!(pf.update_regions(), 2);
    assert!(pf.find_path(0.5, 0.5, 9.5, 9.5, 0.0).is_null());
    assert!(pf.last_error().contains("disconnected"));

    pf.set_cell_walkable(5, 9, true);
    assert_eq!(pf.grid_info().regions, None);
    assert!(!pf.find_path(0.5, 0.5, 9.5, 9.5, 0.0).is_null());
}

#[test]
fn waypoints_run_start_to_goal() {
    let mut pf = open_grid(20, 20, 1.0);
    random_walls(&mut pf, 7, 0.15);
    pf.set_cell_walkable(1, 1, true);
    pf.set_cell_walkable(18, 17, true);

    let handle = pf.find_path(1.5, 1.5, 18.5, 17.5, 0.0);
    if handle.is_null() {
        // Seeded walls may disconnect the pair; that is still a clean failure
        assert_eq!(pf.path_status(handle), PathStatus::Failed);
        return;
    }
    let waypoints = pf.path_waypoints(handle);
    let first = waypoints[0];
    let last = waypoints[waypoints.len() - 1];
    assert_eq!(pf.world_to_grid(first.x, first.y), GridPos::new(1, 1));
    assert_eq!(pf.world_to_grid(last.x, last.y), GridPos::new(18, 17));
    assert!((pf.path_length(handle) - polyline_length(&waypoints)).abs() < 1e-3);
    for w in &waypoints {
        let cell = pf.world_to_grid(w.x, w.y);
        assert!(pf.is_cell_walkable(cell.x, cell.y));
    }
}

#[test]
fn cancelled_handles_stay_dead() {
    let mut pf = open_grid(10, 10, 1.0);
    let a = pf.find_path(0.5, 0.5, 5.5, 5.5, 0.0);
    let b = pf.find_path(0.5, 0.5, 9.5, 0.5, 0.0);
    let b_waypoints = pf.path_waypoints(b);

    assert!(pf.cancel_path(a));
    assert_eq!(pf.path_status(a), PathStatus::Failed);
    assert_eq!(pf.path_waypoint_count(a), 0);
    assert!(pf.path_waypoints(a).is_empty());
    assert_eq!(pf.path_length(a), 0.0);
    assert_eq!(pf.next_waypoint(a), Waypoint::default());
    assert!(!pf.advance_waypoint(a));

    // Reuses the freed slot without aliasing either handle
    let c = pf.find_path(0.5, 0.5, 0.5, 9.5, 0.0);
    assert!(!c.is_null());
    assert_ne!(c, a);
    assert_ne!(c, b);
    assert_eq!(pf.path_status(a), PathStatus::Failed);
    assert_eq!(pf.path_waypoints(b), b_waypoints);
    assert_eq!(pf.active_path_count(), 2);
}

#[test]
fn repeated_searches_are_identical() {
    for seed in 0..8u64 {
        let mut pf = open_grid(32, 32, 1.0);
        random_walls(&mut pf, seed, 0.2);
        pf.set_cell_walkable(0, 0, true);
        pf.set_cell_walkable(31, 31, true);

        let first = pf.find_path(0.5, 0.5, 31.5, 31.5, 0.0);
        let second = pf.find_path(0.5, 0.5, 31.5, 31.5, 0.0);
        assert_eq!(first.is_null(), second.is_null(), "seed {}", seed);
        assert_eq!(pf.path_waypoints(first), pf.path_waypoints(second), "seed {}", seed);
    }
}

#[test]
fn cursor_walks_the_path() {
    let mut pf = open_grid(10, 10, 1.0);
    let handle = pf.find_path(0.5, 0.5, 3.5, 0.5, 0.0);
    assert_eq!(pf.path_waypoint_count(handle), 4);

    assert_eq!(pf.next_waypoint(handle), Waypoint::new(0.5, 0.5));
    assert!(pf.advance_waypoint(handle));
    assert_eq!(pf.next_waypoint(handle), Waypoint::new(1.5, 0.5));
    while pf.advance_waypoint(handle) {}
    assert_eq!(pf.next_waypoint(handle), Waypoint::default());
    assert!(pf.reset_waypoints(handle));
    assert_eq!(pf.next_waypoint(handle), Waypoint::new(0.5, 0.5));
}

#[test]
fn smoothing_strategy_is_swappable() {
    let mut pf = open_grid(10, 10, 1.0);
    let handle = pf.find_path(0.5, 0.5, 9.5, 3.5, 0.0);
    let raw = pf.path_waypoint_count(handle);

    // Default strategy leaves the path alone
    assert!(pf.smooth_path(handle));
    assert_eq!(pf.path_waypoint_count(handle), raw);

    pf.set_smoother(Box::new(LineOfSightSmoother::default()));
    assert!(pf.smooth_path(handle));
    assert_eq!(pf.path_waypoint_count(handle), 2);
    let straight = ((9.0f32 * 9.0) + (3.0 * 3.0)).sqrt();
    assert!((pf.path_length(handle) - straight).abs() < 1e-3);
    assert!(!pf.smooth_path(PathHandle::NULL));
}

#[test]
fn unit_follows_path_to_goal() {
    let mut pf = open_grid(16, 16, 1.0);
    for y in 0..12 {
        pf.set_cell_walkable(8, y, false);
    }
    let handle = pf.find_path(1.5, 1.5, 14.5, 1.5, 0.0);
    assert!(!handle.is_null());
    assert!(pf.add_unit(1, 1.5, 1.5, 4.0, 8.0, 0.3));

    let mut ticks = 0;
    loop {
        if pf.unit_state(1) != MovementState::Moving {
            assert_ne!(pf.unit_state(1), MovementState::Blocked);
            let info = pf.path_info(handle).unwrap();
            if info.current_waypoint >= info.waypoints {
                break;
            }
            let next = pf.next_waypoint(handle);
            assert!(pf.set_unit_target(1, next.x, next.y));
            pf.advance_waypoint(handle);
        }
        pf.update(0.05);
        ticks += 1;
        assert!(ticks < 4000, "unit never arrived");
    }
    assert_eq!(pf.unit_position(1), Some(Vec2::new(14.5, 1.5)));
}

#[test]
fn movement_ramp_matches_kinematics() {
    let mut pf = open_grid(100, 100, 2.0);
    assert!(pf.add_unit(1, 1.0, 1.0, 5.0, 2.0, 0.5));
    assert!(pf.set_unit_speed(1, 5.0));
    assert!(pf.set_unit_target(1, 190.0, 1.0));

    let mut speeds = Vec::new();
    for _ in 0..4 {
        pf.update(1.0);
        let speed = pf.unit_speed(1);
        assert!(speed <= 5.0 + 1e-4);
        speeds.push(speed);
    }
    let expected = [2.0, 4.0, 5.0, 5.0];
    for (got, want) in speeds.iter().zip(expected) {
        assert!((got - want).abs() < 1e-4, "speeds {:?}", speeds);
    }
}

#[test]
fn formation_reaches_slots() {
    let mut pf = open_grid(64, 64, 2.0);
    // Already standing in line order: leader, right, left, far right
    let starts = [(1, 13.0), (2, 10.0), (3, 16.0), (4, 7.0)];
    for (id, y) in starts {
        assert!(pf.add_unit(id, 10.0, y, 4.0, 4.0, 0.5));
    }
    assert!(pf.create_formation(FormationType::Line, &[1, 2, 3, 4]));
    assert!(pf.set_formation_spacing(FormationType::Line, 3.0));
    assert!(pf.move_formation(1, 60.0, 13.0));

    for _ in 0..2000 {
        pf.update(0.05);
        if (1..=4).all(|id| pf.unit_state(id) == MovementState::AtDestination) {
            break;
        }
    }
    for (id, y) in starts {
        assert_eq!(pf.unit_state(id), MovementState::AtDestination, "unit {}", id);
        assert_eq!(pf.unit_position(id), Some(Vec2::new(60.0, y)));
    }
    assert!(pf.disband_formation());
}

#[test]
fn unknown_ids_are_neutral() {
    let mut pf = open_grid(8, 8, 1.0);
    assert_eq!(pf.unit_state(5), MovementState::Idle);
    assert_eq!(pf.unit_position(5), None);
    assert_eq!(pf.unit_speed(5), 0.0);
    assert_eq!(pf.avoid_collision(5), Vec2::ZERO);
    assert!(pf.nearby_units(5, 10.0, 4).is_empty());
    assert!(!pf.remove_unit(5));
    assert!(!pf.apply_steering(5, 1.0, 0.0, 1.0));
    assert!(!pf.create_formation(FormationType::Box, &[5, 6]));
    assert!(pf.clear_errors() >= 3);
}
