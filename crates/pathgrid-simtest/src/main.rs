//! pathgrid Headless Scenario Harness
//!
//! Drives the `Pathfinder` facade through scripted and seeded scenarios and
//! checks search, path table, movement, formation and persistence behavior.
//! Runs entirely in-process, no engine or rendering.
//!
//! Usage:
//!   cargo run -p pathgrid-simtest
//!   cargo run -p pathgrid-simtest -- --verbose
//!   RUST_LOG=debug cargo run -p pathgrid-simtest

use pathgrid_core::config::NavConfig;
use pathgrid_core::path::polyline_length;
use pathgrid_core::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

// ── Scenario manifest ───────────────────────────────────────────────────
const SCENARIOS_JSON: &str = include_str!("../data/scenarios.json");

#[derive(Debug, Deserialize)]
struct Manifest {
    config: NavConfig,
    scenarios: Vec<SearchScenario>,
}

#[derive(Debug, Deserialize)]
struct SearchScenario {
    name: String,
    width: u32,
    height: u32,
    cell_size: f32,
    /// Inclusive cell rectangles `[x0, y0, x1, y1]` made unwalkable
    walls: Vec<[u32; 4]>,
    start: [f32; 2],
    goal: [f32; 2],
    #[serde(default)]
    update_regions: bool,
    expect: Expect,
    length: Option<f32>,
    #[serde(default = "default_tolerance")]
    tolerance: f32,
    min_length: Option<f32>,
    via: Option<[u32; 2]>,
    error_contains: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Expect {
    Found,
    Failed,
}

fn default_tolerance() -> f32 {
    0.01
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    println!("=== pathgrid Scenario Harness ===\n");

    let manifest: Manifest = match serde_json::from_str(SCENARIOS_JSON) {
        Ok(m) => m,
        Err(e) => {
            println!("  ✗ manifest_parse: JSON parse error: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Configuration
    results.extend(validate_config(&manifest.config, verbose));

    // 2. Grid coordinates and regions
    results.extend(validate_grid(verbose));

    // 3. Scripted searches
    results.extend(validate_search_scenarios(&manifest, verbose));

    // 4. Path table
    results.extend(validate_path_table(&manifest.config, verbose));

    // 5. Movement
    results.extend(validate_movement(verbose));

    // 6. Formations
    results.extend(validate_formations(verbose));

    // 7. Persistence
    results.extend(validate_persistence(verbose));

    // 8. Seeded stress
    results.extend(validate_seeded_stress(&manifest.config, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn pathfinder(config: &NavConfig, width: u32, height: u32, cell_size: f32) -> Option<Pathfinder> {
    let mut pf = Pathfinder::with_config(config.clone()).ok()?;
    pf.initialize();
    pf.set_grid_dimensions(width, height, cell_size).then_some(pf)
}

fn fill_walls(pf: &mut Pathfinder, walls: &[[u32; 4]]) {
    for &[x0, y0, x1, y1] in walls {
        for y in y0..=y1 {
            for x in x0..=x1 {
                pf.set_cell_walkable(x, y, false);
            }
        }
    }
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_config(config: &NavConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    let problems = config.validate();
    results.push(TestResult {
        name: "config_manifest_valid".into(),
        passed: problems.is_empty(),
        detail: if problems.is_empty() {
            format!(
                "{} paths, {} units, {} iterations",
                config.max_paths, config.max_units, config.max_iterations
            )
        } else {
            problems.join("; ")
        },
    });

    let defaults = NavConfig::default();
    let round_trip = defaults
        .to_json_string()
        .and_then(|json| NavConfig::from_json_str(&json));
    results.push(TestResult {
        name: "config_json_round_trip".into(),
        passed: matches!(&round_trip, Ok(c) if *c == defaults),
        detail: "default config survives JSON".into(),
    });

    let bad = NavConfig::from_json_str(r#"{ "max_paths": 0, "arrival_epsilon": -1.0 }"#);
    results.push(TestResult {
        name: "config_rejects_bad_values".into(),
        passed: bad.is_err(),
        detail: match bad {
            Err(e) => e.to_string(),
            Ok(_) => "bad config accepted".into(),
        },
    });

    results.push(TestResult {
        name: "config_instance_rejects_bad_values".into(),
        passed: Pathfinder::with_config(NavConfig {
            max_units: 0,
            ..NavConfig::default()
        })
        .is_err(),
        detail: "max_units = 0 refused".into(),
    });

    results
}

// ── 2. Grid ─────────────────────────────────────────────────────────────

fn validate_grid(_verbose: bool) -> Vec<TestResult> {
    println!("--- Grid ---");
    let mut results = Vec::new();

    let mut pf = Pathfinder::new();
    pf.initialize();

    results.push(TestResult {
        name: "grid_default_size".into(),
        passed: pf.grid().width() == 256 && pf.grid().height() == 256,
        detail: format!("{}x{}", pf.grid().width(), pf.grid().height()),
    });

    let clamped = pf.set_grid_dimensions(300, 10, 1.0) && pf.grid().width() == 256;
    results.push(TestResult {
        name: "grid_dimensions_bounded".into(),
        passed: clamped && !pf.set_grid_dimensions(10, 10, 0.0),
        detail: format!(
            "300 wide clamps to {}, zero cell size refused",
            pf.grid().width()
        ),
    });

    pf.set_grid_dimensions(37, 23, 1.5);
    let mut mismatches = 0;
    for y in 0..23 {
        for x in 0..37 {
            let world = pf.grid_to_world(x, y);
            if pf.world_to_grid(world.x, world.y) != GridPos::new(x, y) {
                mismatches += 1;
            }
        }
    }
    results.push(TestResult {
        name: "grid_cell_round_trip".into(),
        passed: mismatches == 0,
        detail: format!("{} of {} cells mismatched", mismatches, 37 * 23),
    });

    let far = pf.world_to_grid(-100.0, 1e6);
    results.push(TestResult {
        name: "grid_world_clamps".into(),
        passed: far == GridPos::new(0, 22),
        detail: format!("(-100, 1e6) -> ({}, {})", far.x, far.y),
    });

    for y in 0..23 {
        pf.set_cell_walkable(18, y, false);
    }
    let regions = pf.update_regions();
    results.push(TestResult {
        name: "grid_regions_split".into(),
        passed: regions == 2,
        detail: format!("full wall gives {} regions", regions),
    });

    pf.set_cell_cost(3, 3, 5);
    results.push(TestResult {
        name: "grid_cell_cost".into(),
        passed: pf.cell_cost(3, 3) == 5 && pf.cell_cost(4, 4) == 1 && pf.cell_cost(99, 99) == u8::MAX,
        detail: "set, default and out-of-range costs".into(),
    });

    results.push(TestResult {
        name: "grid_navmesh_unsupported".into(),
        passed: !pf.build_navigation_mesh() && pf.last_error().contains("Unsupported"),
        detail: pf.last_error().to_string(),
    });

    results
}

// ── 3. Search Scenarios ─────────────────────────────────────────────────

fn validate_search_scenarios(manifest: &Manifest, verbose: bool) -> Vec<TestResult> {
    println!("--- Search Scenarios ---");
    let mut results = Vec::new();

    for s in &manifest.scenarios {
        let Some(mut pf) = pathfinder(&manifest.config, s.width, s.height, s.cell_size) else {
            results.push(TestResult {
                name: format!("search_{}", s.name),
                passed: false,
                detail: "grid setup refused".into(),
            });
            continue;
        };
        fill_walls(&mut pf, &s.walls);
        if s.update_regions {
            pf.update_regions();
        }

        let handle = pf.find_path(s.start[0], s.start[1], s.goal[0], s.goal[1], 0.5);
        let status = pf.path_status(handle);
        let mut checks: Vec<(bool, String)> = Vec::new();

        match s.expect {
            Expect::Found => {
                checks.push((
                    status == PathStatus::Found,
                    format!("status {:?}", status),
                ));
                let waypoints = pf.path_waypoints(handle);
                let length = pf.path_length(handle);
                checks.push((
                    (length - polyline_length(&waypoints)).abs() < 1e-3,
                    format!("length {:.2}", length),
                ));
                if let Some(expected) = s.length {
                    checks.push((
                        (length - expected).abs() <= s.tolerance,
                        format!("expected {:.2} ± {:.2}", expected, s.tolerance),
                    ));
                }
                if let Some(min) = s.min_length {
                    checks.push((length >= min, format!("at least {:.1}", min)));
                }
                if let Some([vx, vy]) = s.via {
                    let through = waypoints
                        .iter()
                        .any(|w| pf.world_to_grid(w.x, w.y) == GridPos::new(vx, vy));
                    checks.push((through, format!("via ({}, {})", vx, vy)));
                }
            }
            Expect::Failed => {
                checks.push((
                    handle.is_null() && status == PathStatus::Failed,
                    format!("handle {} status {:?}", handle.raw(), status),
                ));
                checks.push((pf.active_path_count() == 0, "no slot used".into()));
                if let Some(needle) = &s.error_contains {
                    checks.push((
                        pf.last_error().contains(needle.as_str()),
                        format!("error \"{}\"", pf.last_error()),
                    ));
                }
            }
        }

        if verbose {
            if let Some(info) = pf.path_info(handle) {
                println!("{}", info);
            }
        }

        results.push(TestResult {
            name: format!("search_{}", s.name),
            passed: checks.iter().all(|(ok, _)| *ok),
            detail: checks
                .into_iter()
                .map(|(ok, d)| if ok { d } else { format!("FAILED {}", d) })
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    results
}

// ── 4. Path Table ───────────────────────────────────────────────────────

fn validate_path_table(config: &NavConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Path Table ---");
    let mut results = Vec::new();

    let Some(mut pf) = pathfinder(config, 16, 16, 1.0) else {
        results.push(TestResult {
            name: "table_setup".into(),
            passed: false,
            detail: "grid setup refused".into(),
        });
        return results;
    };

    let handles: Vec<PathHandle> = (0..config.max_paths)
        .map(|i| pf.find_path(0.5, 0.5, 15.5, (i % 16) as f32 + 0.5, 0.0))
        .collect();
    let live = handles.iter().filter(|h| !h.is_null()).count();
    results.push(TestResult {
        name: "table_fills_to_capacity".into(),
        passed: live == config.max_paths && pf.active_path_count() == config.max_paths,
        detail: format!("{} / {} live", live, config.max_paths),
    });

    let overflow = pf.find_path(0.5, 0.5, 2.5, 2.5, 0.0);
    results.push(TestResult {
        name: "table_full_rejects".into(),
        passed: overflow.is_null() && pf.last_error().contains("full"),
        detail: pf.last_error().to_string(),
    });

    let victim = handles[0];
    let survivor = handles[1];
    let survivor_waypoints = pf.path_waypoints(survivor);
    let cancelled = pf.cancel_path(victim);
    let reused = pf.find_path(0.5, 0.5, 4.5, 4.5, 0.0);
    results.push(TestResult {
        name: "table_slot_reuse".into(),
        passed: cancelled
            && !reused.is_null()
            && !handles.contains(&reused)
            && pf.path_status(victim) == PathStatus::Failed
            && pf.path_waypoints(survivor) == survivor_waypoints,
        detail: format!("cancelled {} reused as {}", victim.raw(), reused.raw()),
    });

    results.push(TestResult {
        name: "table_double_cancel".into(),
        passed: !pf.cancel_path(victim) && !pf.cancel_path(PathHandle::NULL),
        detail: "dead and null handles refused".into(),
    });

    pf.shutdown();
    pf.shutdown();
    results.push(TestResult {
        name: "table_shutdown_clears".into(),
        passed: pf.active_path_count() == 0 && !pf.is_initialized(),
        detail: "shutdown is idempotent".into(),
    });

    results
}

// ── 5. Movement ─────────────────────────────────────────────────────────

fn validate_movement(_verbose: bool) -> Vec<TestResult> {
    println!("--- Movement ---");
    let mut results = Vec::new();

    // Kinematic ramp: accel 2, max 5, dt 1 -> speeds 2, 4, 5, 5
    let mut pf = Pathfinder::new();
    pf.initialize();
    pf.set_grid_dimensions(100, 100, 2.0);
    pf.add_unit(1, 1.0, 1.0, 5.0, 2.0, 0.5);
    pf.set_unit_target(1, 190.0, 1.0);
    let mut speeds = Vec::new();
    for _ in 0..4 {
        pf.update(1.0);
        speeds.push(pf.unit_speed(1));
    }
    let expected = [2.0, 4.0, 5.0, 5.0];
    results.push(TestResult {
        name: "movement_speed_ramp".into(),
        passed: speeds
            .iter()
            .zip(expected)
            .all(|(got, want)| (got - want).abs() < 1e-4),
        detail: format!("speeds {:?}", speeds),
    });

    // Arrival without overshoot
    pf.add_unit(2, 10.0, 10.0, 3.0, 6.0, 0.5);
    pf.set_unit_target(2, 20.0, 10.0);
    let mut overshoot = false;
    for _ in 0..200 {
        pf.update(0.05);
        if pf.unit_position(2).map_or(false, |p| p.x > 20.0 + 1e-4) {
            overshoot = true;
        }
        if pf.unit_state(2) == MovementState::AtDestination {
            break;
        }
    }
    results.push(TestResult {
        name: "movement_arrives".into(),
        passed: !overshoot
            && pf.unit_state(2) == MovementState::AtDestination
            && pf.unit_position(2) == Some(Vec2::new(20.0, 10.0)),
        detail: format!("state {:?}", pf.unit_state(2)),
    });

    // A wall across the route leaves the unit Blocked on the near side
    let mut pf = Pathfinder::new();
    pf.initialize();
    pf.set_grid_dimensions(64, 64, 2.0);
    for y in 0..64 {
        pf.set_cell_walkable(3, y, false);
    }
    pf.add_unit(1, 3.0, 10.0, 5.0, 2.0, 0.5);
    pf.set_unit_target(1, 20.0, 10.0);
    for _ in 0..20 {
        pf.update(0.25);
    }
    let x = pf.unit_position(1).map_or(f32::NAN, |p| p.x);
    results.push(TestResult {
        name: "movement_wall_blocks".into(),
        passed: pf.unit_state(1) == MovementState::Blocked && x < 6.0,
        detail: format!("state {:?} at x={:.2}", pf.unit_state(1), x),
    });

    // Stop and unknown ids
    pf.stop_unit(1);
    results.push(TestResult {
        name: "movement_stop".into(),
        passed: pf.unit_state(1) == MovementState::Idle && pf.unit_speed(1) == 0.0,
        detail: "stopped unit is idle".into(),
    });
    results.push(TestResult {
        name: "movement_unknown_unit".into(),
        passed: pf.unit_state(999) == MovementState::Idle
            && pf.unit_position(999).is_none()
            && !pf.set_unit_target(999, 1.0, 1.0),
        detail: "unknown id reads neutral".into(),
    });

    // Overlapping units push apart once moving
    let mut pf = Pathfinder::new();
    pf.initialize();
    pf.add_unit(1, 50.0, 50.0, 4.0, 8.0, 1.0);
    pf.add_unit(2, 50.5, 50.0, 4.0, 8.0, 1.0);
    let before = pf.stats().overlapping_units;
    let push = pf.avoid_collision(1);
    results.push(TestResult {
        name: "movement_avoidance_direction".into(),
        passed: before == 1 && push.x < 0.0,
        detail: format!("{} overlapping, push ({:.2}, {:.2})", before, push.x, push.y),
    });

    results
}

// ── 6. Formations ───────────────────────────────────────────────────────

fn validate_formations(verbose: bool) -> Vec<TestResult> {
    println!("--- Formations ---");
    let mut results = Vec::new();

    let mut pf = Pathfinder::new();
    pf.initialize();
    pf.set_grid_dimensions(64, 64, 2.0);
    let starts = [(1, 13.0), (2, 10.0), (3, 16.0), (4, 7.0)];
    for (id, y) in starts {
        pf.add_unit(id, 10.0, y, 4.0, 4.0, 0.5);
    }

    results.push(TestResult {
        name: "formation_rejects_empty".into(),
        passed: !pf.create_formation(FormationType::Line, &[42, 43]),
        detail: pf.last_error().to_string(),
    });

    let created = pf.create_formation(FormationType::Line, &[1, 2, 3, 4]);
    let spaced = pf.set_formation_spacing(FormationType::Line, 3.0);
    let moved = pf.move_formation(1, 60.0, 13.0);
    results.push(TestResult {
        name: "formation_setup".into(),
        passed: created && spaced && moved && !pf.move_formation(2, 0.0, 0.0),
        detail: "only the leader may move the formation".into(),
    });

    let mut ticks = 0;
    while ticks < 2000 {
        pf.update(0.05);
        ticks += 1;
        if (1..=4).all(|id| pf.unit_state(id) == MovementState::AtDestination) {
            break;
        }
    }
    let misplaced: Vec<u32> = starts
        .iter()
        .filter(|(id, y)| pf.unit_position(*id) != Some(Vec2::new(60.0, *y)))
        .map(|(id, _)| *id)
        .collect();
    if verbose {
        for (id, _) in starts {
            if let Some(info) = pf.unit_info(id) {
                println!("{}", info);
            }
        }
    }
    results.push(TestResult {
        name: "formation_reaches_slots".into(),
        passed: misplaced.is_empty(),
        detail: format!("{} ticks, misplaced {:?}", ticks, misplaced),
    });

    results.push(TestResult {
        name: "formation_disband".into(),
        passed: pf.disband_formation() && !pf.disband_formation(),
        detail: "second disband is a no-op".into(),
    });

    results
}

// ── 7. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut pf = Pathfinder::new();
    pf.initialize();
    pf.set_grid_dimensions(32, 24, 1.5);
    fill_walls(&mut pf, &[[10, 0, 10, 20], [3, 3, 6, 4]]);
    pf.set_cell_cost(20, 20, 7);
    pf.add_unit(7, 2.0, 2.0, 3.0, 1.0, 0.4);
    pf.add_unit(8, 30.0, 30.0, 3.0, 1.0, 0.4);
    pf.set_unit_target(8, 40.0, 30.0);

    let mut bytes = Vec::new();
    if let Err(e) = pf.save(&mut bytes) {
        results.push(TestResult {
            name: "persist_save".into(),
            passed: false,
            detail: e.to_string(),
        });
        return results;
    }

    let mut restored = Pathfinder::new();
    restored.initialize();
    let loaded = restored.load(bytes.as_slice());
    let original = pf.grid_info();
    let copy = restored.grid_info();
    results.push(TestResult {
        name: "persist_grid".into(),
        passed: loaded.is_ok()
            && copy.width == original.width
            && copy.height == original.height
            && copy.walkable_cells == original.walkable_cells
            && restored.cell_cost(20, 20) == 7,
        detail: format!("{} walkable of {}", copy.walkable_cells, copy.total_cells),
    });

    results.push(TestResult {
        name: "persist_units".into(),
        passed: restored.unit_count() == 2
            && restored.unit_position(7) == pf.unit_position(7)
            && restored.unit_state(8) == MovementState::Moving,
        detail: format!("{} units restored", restored.unit_count()),
    });

    let mut broken = Pathfinder::new();
    results.push(TestResult {
        name: "persist_rejects_garbage".into(),
        passed: broken.load(&[1u8, 2, 3][..]).is_err(),
        detail: "truncated snapshot refused".into(),
    });

    results
}

// ── 8. Seeded Stress ────────────────────────────────────────────────────

fn validate_seeded_stress(config: &NavConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Seeded Stress ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(0x5EED);

    let Some(mut pf) = pathfinder(config, 64, 64, 1.0) else {
        results.push(TestResult {
            name: "stress_setup".into(),
            passed: false,
            detail: "grid setup refused".into(),
        });
        return results;
    };
    for y in 0..64 {
        for x in 0..64 {
            if rng.gen_bool(0.25) {
                pf.set_cell_walkable(x, y, false);
            }
        }
    }

    let (mut found, mut failed, mut malformed, mut nondeterministic) = (0, 0, 0, 0);
    for _ in 0..200 {
        let start = GridPos::new(rng.gen_range(0..64), rng.gen_range(0..64));
        let goal = GridPos::new(rng.gen_range(0..64), rng.gen_range(0..64));
        if !pf.is_cell_walkable(start.x, start.y) {
            continue;
        }
        let (s, g) = (pf.grid_to_world(start.x, start.y), pf.grid_to_world(goal.x, goal.y));

        let first = pf.find_path(s.x, s.y, g.x, g.y, 0.0);
        if first.is_null() {
            if pf.path_status(first) == PathStatus::Failed {
                failed += 1;
            } else {
                malformed += 1;
            }
            continue;
        }
        found += 1;

        let waypoints = pf.path_waypoints(first);
        let cells: Vec<GridPos> = waypoints.iter().map(|w| pf.world_to_grid(w.x, w.y)).collect();
        let contiguous = cells.windows(2).all(|p| {
            let dx = p[0].x.abs_diff(p[1].x);
            let dy = p[0].y.abs_diff(p[1].y);
            dx <= 1 && dy <= 1 && dx + dy > 0
        });
        let walkable = cells.iter().all(|c| pf.is_cell_walkable(c.x, c.y));
        let endpoints = cells.first() == Some(&start) && cells.last() == Some(&goal);
        if !(contiguous && walkable && endpoints) {
            malformed += 1;
        }

        let second = pf.find_path(s.x, s.y, g.x, g.y, 0.0);
        if pf.path_waypoints(second) != waypoints {
            nondeterministic += 1;
        }
        pf.cancel_path(first);
        pf.cancel_path(second);
    }

    if verbose {
        println!("  {} found, {} failed", found, failed);
    }
    results.push(TestResult {
        name: "stress_routes_well_formed".into(),
        passed: malformed == 0 && found > 0,
        detail: format!("{} found, {} failed, {} malformed", found, failed, malformed),
    });
    results.push(TestResult {
        name: "stress_deterministic".into(),
        passed: nondeterministic == 0,
        detail: format!("{} differing repeats", nondeterministic),
    });
    results.push(TestResult {
        name: "stress_no_leaked_paths".into(),
        passed: pf.active_path_count() == 0,
        detail: format!("{} paths left", pf.active_path_count()),
    });

    // Crowd on an open grid: motion stays finite, bounded and within speed
    let Some(mut crowd) = pathfinder(config, 64, 64, 1.0) else {
        return results;
    };
    for id in 0..50u32 {
        let (x, y) = (rng.gen_range(1.0..63.0), rng.gen_range(1.0..63.0));
        crowd.add_unit(id, x, y, 4.0, 8.0, 0.4);
        crowd.set_unit_target(id, rng.gen_range(1.0..63.0), rng.gen_range(1.0..63.0));
    }
    let mut violations = 0;
    for _ in 0..300 {
        crowd.update(1.0 / 30.0);
        for id in 0..50u32 {
            let ok = match crowd.unit_position(id) {
                Some(p) => {
                    p.is_finite()
                        && (0.0..64.0).contains(&p.x)
                        && (0.0..64.0).contains(&p.y)
                        && crowd.unit_speed(id) <= 4.0 + 1e-3
                }
                None => false,
            };
            if !ok {
                violations += 1;
            }
        }
    }
    results.push(TestResult {
        name: "stress_crowd_bounded".into(),
        passed: violations == 0,
        detail: format!(
            "{} violations, {} still moving ({})",
            violations,
            crowd.moving_unit_count(),
            crowd.stats()
        ),
    });

    results
}
