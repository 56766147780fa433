use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pathgrid_core::astar::AStar;
use pathgrid_core::collision::check_collision;
use pathgrid_core::grid::{GridPos, NavGrid};
use pathgrid_core::path::{polyline_length, Waypoint};

fn seeded_grid(seed: u64, width: u32, height: u32, density: f64) -> NavGrid {
    let mut grid = NavGrid::with_dimensions(width, height, 1.0).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    for y in 0..height {
        for x in 0..width {
            if rng.gen_bool(density) {
                grid.set_walkable(x, y, false);
            }
        }
    }
    grid
}

proptest! {
    /// Property: every valid cell survives grid -> world -> grid
    #[test]
    fn cell_round_trip(
        width in 1u32..=256,
        height in 1u32..=256,
        cell_size in 0.25f32..8.0,
        fx in 0.0f64..1.0,
        fy in 0.0f64..1.0,
    ) {
        let grid = NavGrid::with_dimensions(width, height, cell_size).unwrap();
        let cell = GridPos::new(
            ((width as f64 - 1.0) * fx) as u32,
            ((height as f64 - 1.0) * fy) as u32,
        );
        let world = grid.grid_to_world(cell);
        prop_assert_eq!(grid.world_to_grid(world.x, world.y), cell);
    }

    /// Property: world_to_grid never leaves the grid, whatever the input
    #[test]
    fn world_to_grid_clamps(x in any::<f32>(), y in any::<f32>()) {
        let grid = NavGrid::with_dimensions(40, 30, 2.0).unwrap();
        let cell = grid.world_to_grid(x, y);
        prop_assert!(cell.x < 40 && cell.y < 30);
    }

    /// Property: found routes are contiguous, walkable, and measured correctly
    #[test]
    fn routes_are_well_formed(
        seed in any::<u64>(),
        sx in 0u32..24, sy in 0u32..24,
        gx in 0u32..24, gy in 0u32..24,
    ) {
        let mut grid = seeded_grid(seed, 24, 24, 0.25);
        grid.set_walkable(sx, sy, true);
        grid.set_walkable(gx, gy, true);

        let mut astar = AStar::default();
        let mut out: Vec<Waypoint> = Vec::new();
        let start = GridPos::new(sx, sy);
        let goal = GridPos::new(gx, gy);

        if let Ok(report) = astar.search(&grid, start, goal, 256, &mut out) {
            prop_assert!(report.reached_goal);
            prop_assert!(!out.is_empty());

            let cells: Vec<GridPos> = out.iter().map(|w| grid.world_to_grid(w.x, w.y)).collect();
            prop_assert_eq!(cells[0], start);
            prop_assert_eq!(*cells.last().unwrap(), goal);
            for pair in cells.windows(2) {
                let dx = (pair[0].x as i64 - pair[1].x as i64).abs();
                let dy = (pair[0].y as i64 - pair[1].y as i64).abs();
                prop_assert!(dx <= 1 && dy <= 1 && dx + dy > 0);
            }
            for c in &cells {
                prop_assert!(grid.is_walkable(c.x, c.y));
            }
            prop_assert!((report.route_cost - polyline_length(&out)).abs() < 1e-2);
        }
    }

    /// Property: identical inputs give identical routes
    #[test]
    fn search_is_deterministic(seed in any::<u64>()) {
        let mut grid = seeded_grid(seed, 20, 20, 0.2);
        grid.set_walkable(0, 0, true);
        grid.set_walkable(19, 19, true);

        let mut astar = AStar::default();
        let (mut a, mut b) = (Vec::new(), Vec::new());
        let ra = astar.search(&grid, GridPos::new(0, 0), GridPos::new(19, 19), 256, &mut a);
        let rb = astar.search(&grid, GridPos::new(0, 0), GridPos::new(19, 19), 256, &mut b);
        prop_assert_eq!(ra.is_ok(), rb.is_ok());
        prop_assert_eq!(a, b);
    }

    /// Property: the overlap test is symmetric
    #[test]
    fn collision_is_symmetric(
        x1 in -50.0f32..50.0, y1 in -50.0f32..50.0, r1 in 0.0f32..5.0,
        x2 in -50.0f32..50.0, y2 in -50.0f32..50.0, r2 in 0.0f32..5.0,
    ) {
        prop_assert_eq!(
            check_collision(x1, y1, r1, x2, y2, r2),
            check_collision(x2, y2, r2, x1, y1, r1)
        );
    }
}
