//! C FFI bindings for the pathgrid pathfinding and movement core
//!
//! This crate exposes the `Pathfinder` facade through a C-compatible API so
//! game engines (Godot, Unity, Unreal) or any language with C FFI support
//! can drive grid search and unit movement.
//!
//! Every function accepts a null handle and returns the failure value
//! (`0`, `false` or a zeroed struct) instead of crashing.
//!
//! # Basic Usage (C)
//! ```c
//! #include "pathgrid.h"
//!
//! PathgridHandle pf = pathgrid_create();
//! pathgrid_initialize(pf);
//! pathgrid_set_grid_dimensions(pf, 64, 64, 1.0f);
//!
//! uint64_t path = pathgrid_find_path(pf, 0.5f, 0.5f, 40.5f, 12.5f, 0.5f);
//! if (path == 0) {
//!     char msg[256];
//!     pathgrid_last_error(pf, msg, sizeof msg);
//! }
//!
//! pathgrid_add_unit(pf, 1, 0.5f, 0.5f, 5.0f, 10.0f, 0.5f);
//! while (running) {
//!     PathgridWaypoint next;
//!     if (pathgrid_unit_state(pf, 1) != 1 && pathgrid_next_waypoint(pf, path, &next)) {
//!         pathgrid_set_unit_target(pf, 1, next.x, next.y);
//!         pathgrid_advance_waypoint(pf, path);
//!     }
//!     pathgrid_update(pf, delta_time);
//! }
//!
//! pathgrid_destroy(pf);
//! ```

use std::os::raw::c_char;
use std::slice;

use pathgrid_core::config::NavConfig;
use pathgrid_core::formation::FormationType;
use pathgrid_core::math::Vec2;
use pathgrid_core::path::PathHandle;
use pathgrid_core::pathfinder::Pathfinder;
use pathgrid_core::smoothing::{LineOfSightSmoother, NoSmoothing};

/// Opaque handle to a pathfinder instance
pub type PathgridHandle = *mut Pathfinder;

/// Waypoint returned to C
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PathgridWaypoint {
    /// World X coordinate
    pub x: f32,
    /// World Y coordinate
    pub y: f32,
}

/// Grid cell coordinate returned to C
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PathgridCell {
    pub x: u32,
    pub y: u32,
}

/// Unit snapshot returned to C
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PathgridUnit {
    /// Caller-assigned unit id
    pub unit_id: u32,
    /// 0 idle, 1 moving, 2 at destination, 3 blocked, 4 waiting
    pub state: u32,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub max_speed: f32,
    pub radius: f32,
}

/// Instance statistics
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PathgridStats {
    /// Seconds simulated by `pathgrid_update`
    pub sim_time: f64,
    pub active_paths: u32,
    pub path_capacity: u32,
    pub units: u32,
    pub unit_capacity: u32,
    pub moving_units: u32,
    /// Pairs of units currently overlapping
    pub overlapping_units: u32,
    /// Errors recorded since the last `pathgrid_clear_errors`
    pub error_count: u32,
}

// ============================================================================
// Lifecycle Functions
// ============================================================================

/// Create a pathfinder with the default configuration (256x256 grid)
///
/// Returns a handle that must be freed with `pathgrid_destroy`
#[no_mangle]
pub extern "C" fn pathgrid_create() -> PathgridHandle {
    Box::into_raw(Box::new(Pathfinder::new()))
}

/// Create a pathfinder from a JSON configuration of `len` bytes
///
/// Returns null if the JSON is malformed or the configuration is invalid.
#[no_mangle]
pub extern "C" fn pathgrid_create_with_config(json: *const c_char, len: usize) -> PathgridHandle {
    if json.is_null() {
        return std::ptr::null_mut();
    }

    let bytes = unsafe { slice::from_raw_parts(json as *const u8, len) };
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => return std::ptr::null_mut(),
    };
    match NavConfig::from_json_str(text).and_then(Pathfinder::with_config) {
        Ok(pf) => Box::into_raw(Box::new(pf)),
        Err(e) => {
            log::warn!("rejected pathfinder config: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Destroy a pathfinder and free its memory
#[no_mangle]
pub extern "C" fn pathgrid_destroy(handle: PathgridHandle) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle));
        }
    }
}

/// Prepare the instance for use; a no-op when already initialized
#[no_mangle]
pub extern "C" fn pathgrid_initialize(handle: PathgridHandle) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.initialize();
    true
}

/// Drop all paths and units; safe to call repeatedly
#[no_mangle]
pub extern "C" fn pathgrid_shutdown(handle: PathgridHandle) {
    if handle.is_null() {
        return;
    }

    let pf = unsafe { &mut *handle };
    pf.shutdown();
}

#[no_mangle]
pub extern "C" fn pathgrid_is_initialized(handle: PathgridHandle) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    pf.is_initialized()
}

// ============================================================================
// Grid Functions
// ============================================================================

/// Resize the grid (at most 256x256); all cells become walkable
#[no_mangle]
pub extern "C" fn pathgrid_set_grid_dimensions(
    handle: PathgridHandle,
    width: u32,
    height: u32,
    cell_size: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.set_grid_dimensions(width, height, cell_size)
}

#[no_mangle]
pub extern "C" fn pathgrid_set_cell_walkable(
    handle: PathgridHandle,
    x: u32,
    y: u32,
    walkable: bool,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.set_cell_walkable(x, y, walkable)
}

#[no_mangle]
pub extern "C" fn pathgrid_set_cell_cost(handle: PathgridHandle, x: u32, y: u32, cost: u8) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.set_cell_cost(x, y, cost)
}

#[no_mangle]
pub extern "C" fn pathgrid_is_cell_walkable(handle: PathgridHandle, x: u32, y: u32) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    pf.is_cell_walkable(x, y)
}

#[no_mangle]
pub extern "C" fn pathgrid_get_cell_cost(handle: PathgridHandle, x: u32, y: u32) -> u8 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &*handle };
    pf.cell_cost(x, y)
}

/// Convert a world position to the (clamped) cell containing it
#[no_mangle]
pub extern "C" fn pathgrid_world_to_grid(
    handle: PathgridHandle,
    world_x: f32,
    world_y: f32,
    cell: *mut PathgridCell,
) -> bool {
    if handle.is_null() || cell.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    let pos = pf.world_to_grid(world_x, world_y);
    let out = unsafe { &mut *cell };
    out.x = pos.x;
    out.y = pos.y;
    true
}

/// Convert a cell to the world position of its centre
#[no_mangle]
pub extern "C" fn pathgrid_grid_to_world(
    handle: PathgridHandle,
    grid_x: u32,
    grid_y: u32,
    point: *mut PathgridWaypoint,
) -> bool {
    if handle.is_null() || point.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    let world = pf.grid_to_world(grid_x, grid_y);
    let out = unsafe { &mut *point };
    out.x = world.x;
    out.y = world.y;
    true
}

/// Recompute connected regions; returns the region count
#[no_mangle]
pub extern "C" fn pathgrid_update_regions(handle: PathgridHandle) -> u16 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &mut *handle };
    pf.update_regions()
}

/// Not supported; always returns false and records an error
#[no_mangle]
pub extern "C" fn pathgrid_build_navigation_mesh(handle: PathgridHandle) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.build_navigation_mesh()
}

// ============================================================================
// Path Functions
// ============================================================================

/// Search for a path between two world positions
///
/// Returns the path handle, or 0 on failure (see `pathgrid_last_error`).
#[no_mangle]
pub extern "C" fn pathgrid_find_path(
    handle: PathgridHandle,
    start_x: f32,
    start_y: f32,
    goal_x: f32,
    goal_y: f32,
    unit_radius: f32,
) -> u64 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &mut *handle };
    pf.find_path(start_x, start_y, goal_x, goal_y, unit_radius).raw()
}

/// Same as `pathgrid_find_path`; `obstacles` holds `count` points and is
/// currently ignored by the search
#[no_mangle]
pub extern "C" fn pathgrid_find_path_avoiding_objects(
    handle: PathgridHandle,
    start_x: f32,
    start_y: f32,
    goal_x: f32,
    goal_y: f32,
    unit_radius: f32,
    obstacles: *const PathgridWaypoint,
    count: u32,
) -> u64 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &mut *handle };
    let points = read_points(obstacles, count);
    pf.find_path_avoiding_objects(start_x, start_y, goal_x, goal_y, unit_radius, &points)
        .raw()
}

#[no_mangle]
pub extern "C" fn pathgrid_cancel_path(handle: PathgridHandle, path: u64) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.cancel_path(PathHandle(path))
}

/// Path status: 0 idle, 1 finding, 2 found, 3 partial, 4 failed
#[no_mangle]
pub extern "C" fn pathgrid_path_status(handle: PathgridHandle, path: u64) -> u32 {
    if handle.is_null() {
        return 4;
    }

    let pf = unsafe { &*handle };
    pf.path_status(PathHandle(path)) as u32
}

#[no_mangle]
pub extern "C" fn pathgrid_path_waypoint_count(handle: PathgridHandle, path: u64) -> u32 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &*handle };
    pf.path_waypoint_count(PathHandle(path)) as u32
}

/// Copy up to `capacity` waypoints into `buffer`
///
/// Returns the number of waypoints written.
#[no_mangle]
pub extern "C" fn pathgrid_get_path_waypoints(
    handle: PathgridHandle,
    path: u64,
    buffer: *mut PathgridWaypoint,
    capacity: u32,
) -> u32 {
    if handle.is_null() || buffer.is_null() {
        return 0;
    }

    let pf = unsafe { &*handle };
    let waypoints = pf.path_waypoints(PathHandle(path));
    let n = waypoints.len().min(capacity as usize);
    let out = unsafe { slice::from_raw_parts_mut(buffer, n) };
    for (dst, src) in out.iter_mut().zip(&waypoints) {
        dst.x = src.x;
        dst.y = src.y;
    }
    n as u32
}

#[no_mangle]
pub extern "C" fn pathgrid_path_length(handle: PathgridHandle, path: u64) -> f32 {
    if handle.is_null() {
        return 0.0;
    }

    let pf = unsafe { &*handle };
    pf.path_length(PathHandle(path))
}

/// Read the waypoint under the path cursor
///
/// Returns false once the cursor has passed the last waypoint.
#[no_mangle]
pub extern "C" fn pathgrid_next_waypoint(
    handle: PathgridHandle,
    path: u64,
    waypoint: *mut PathgridWaypoint,
) -> bool {
    if handle.is_null() || waypoint.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    let next = match pf.path_info(PathHandle(path)) {
        Some(info) if info.current_waypoint < info.waypoints => pf.next_waypoint(PathHandle(path)),
        _ => return false,
    };
    let out = unsafe { &mut *waypoint };
    out.x = next.x;
    out.y = next.y;
    true
}

#[no_mangle]
pub extern "C" fn pathgrid_advance_waypoint(handle: PathgridHandle, path: u64) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.advance_waypoint(PathHandle(path))
}

#[no_mangle]
pub extern "C" fn pathgrid_reset_waypoints(handle: PathgridHandle, path: u64) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.reset_waypoints(PathHandle(path))
}

/// Milliseconds the search for `path` took
#[no_mangle]
pub extern "C" fn pathgrid_path_compute_time(handle: PathgridHandle, path: u64) -> f32 {
    if handle.is_null() {
        return 0.0;
    }

    let pf = unsafe { &*handle };
    pf.path_compute_time(PathHandle(path))
}

#[no_mangle]
pub extern "C" fn pathgrid_active_path_count(handle: PathgridHandle) -> u32 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &*handle };
    pf.active_path_count() as u32
}

/// Select the smoothing strategy: 0 none, 1 line of sight
#[no_mangle]
pub extern "C" fn pathgrid_set_smoother(handle: PathgridHandle, kind: u32) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    match kind {
        0 => pf.set_smoother(Box::new(NoSmoothing)),
        1 => pf.set_smoother(Box::new(LineOfSightSmoother::default())),
        _ => return false,
    }
    true
}

#[no_mangle]
pub extern "C" fn pathgrid_smooth_path(handle: PathgridHandle, path: u64) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.smooth_path(PathHandle(path))
}

#[no_mangle]
pub extern "C" fn pathgrid_simplify_path(
    handle: PathgridHandle,
    path: u64,
    max_deviation: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.simplify_path(PathHandle(path), max_deviation)
}

// ============================================================================
// Unit Functions
// ============================================================================

#[no_mangle]
pub extern "C" fn pathgrid_add_unit(
    handle: PathgridHandle,
    unit_id: u32,
    x: f32,
    y: f32,
    max_speed: f32,
    acceleration: f32,
    radius: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.add_unit(unit_id, x, y, max_speed, acceleration, radius)
}

#[no_mangle]
pub extern "C" fn pathgrid_remove_unit(handle: PathgridHandle, unit_id: u32) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.remove_unit(unit_id)
}

#[no_mangle]
pub extern "C" fn pathgrid_set_unit_target(
    handle: PathgridHandle,
    unit_id: u32,
    x: f32,
    y: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.set_unit_target(unit_id, x, y)
}

#[no_mangle]
pub extern "C" fn pathgrid_stop_unit(handle: PathgridHandle, unit_id: u32) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.stop_unit(unit_id)
}

#[no_mangle]
pub extern "C" fn pathgrid_set_unit_speed(handle: PathgridHandle, unit_id: u32, speed: f32) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.set_unit_speed(unit_id, speed)
}

#[no_mangle]
pub extern "C" fn pathgrid_set_unit_max_speed(
    handle: PathgridHandle,
    unit_id: u32,
    max_speed: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.set_unit_max_speed(unit_id, max_speed)
}

#[no_mangle]
pub extern "C" fn pathgrid_set_unit_acceleration(
    handle: PathgridHandle,
    unit_id: u32,
    acceleration: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.set_unit_acceleration(unit_id, acceleration)
}

#[no_mangle]
pub extern "C" fn pathgrid_set_collision_radius(
    handle: PathgridHandle,
    unit_id: u32,
    radius: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.set_collision_radius(unit_id, radius)
}

/// Movement state: 0 idle, 1 moving, 2 at destination, 3 blocked, 4 waiting
#[no_mangle]
pub extern "C" fn pathgrid_unit_state(handle: PathgridHandle, unit_id: u32) -> u32 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &*handle };
    pf.unit_state(unit_id) as u32
}

/// Write the unit position into `x` / `y` (either may be null)
#[no_mangle]
pub extern "C" fn pathgrid_get_unit_position(
    handle: PathgridHandle,
    unit_id: u32,
    x: *mut f32,
    y: *mut f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    match pf.unit_position(unit_id) {
        Some(pos) => {
            write_pair(pos, x, y);
            true
        }
        None => false,
    }
}

#[no_mangle]
pub extern "C" fn pathgrid_get_unit_velocity(
    handle: PathgridHandle,
    unit_id: u32,
    vx: *mut f32,
    vy: *mut f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    match pf.unit_velocity(unit_id) {
        Some(vel) => {
            write_pair(vel, vx, vy);
            true
        }
        None => false,
    }
}

#[no_mangle]
pub extern "C" fn pathgrid_unit_speed(handle: PathgridHandle, unit_id: u32) -> f32 {
    if handle.is_null() {
        return 0.0;
    }

    let pf = unsafe { &*handle };
    pf.unit_speed(unit_id)
}

/// Fill `unit` with a full snapshot of one unit
#[no_mangle]
pub extern "C" fn pathgrid_get_unit(
    handle: PathgridHandle,
    unit_id: u32,
    unit: *mut PathgridUnit,
) -> bool {
    if handle.is_null() || unit.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    let info = match pf.unit_info(unit_id) {
        Some(i) => i,
        None => return false,
    };

    let out = unsafe { &mut *unit };
    out.unit_id = info.unit_id;
    out.state = info.state as u32;
    out.x = info.position.x;
    out.y = info.position.y;
    out.velocity_x = info.velocity.x;
    out.velocity_y = info.velocity.y;
    out.max_speed = info.max_speed;
    out.radius = info.radius;
    true
}

#[no_mangle]
pub extern "C" fn pathgrid_unit_count(handle: PathgridHandle) -> u32 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &*handle };
    pf.unit_count() as u32
}

#[no_mangle]
pub extern "C" fn pathgrid_moving_unit_count(handle: PathgridHandle) -> u32 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &*handle };
    pf.moving_unit_count() as u32
}

/// Copy ids of units within `radius` of `unit_id` into `buffer`
///
/// Returns the number of ids written (at most `capacity`).
#[no_mangle]
pub extern "C" fn pathgrid_get_nearby_units(
    handle: PathgridHandle,
    unit_id: u32,
    radius: f32,
    buffer: *mut u32,
    capacity: u32,
) -> u32 {
    if handle.is_null() || buffer.is_null() {
        return 0;
    }

    let pf = unsafe { &*handle };
    let ids = pf.nearby_units(unit_id, radius, capacity as usize);
    let out = unsafe { slice::from_raw_parts_mut(buffer, ids.len()) };
    out.copy_from_slice(&ids);
    ids.len() as u32
}

// ============================================================================
// Collision and Steering
// ============================================================================

#[no_mangle]
pub extern "C" fn pathgrid_check_collision(
    handle: PathgridHandle,
    x1: f32,
    y1: f32,
    r1: f32,
    x2: f32,
    y2: f32,
    r2: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    pf.check_collision(x1, y1, r1, x2, y2, r2)
}

/// Write the unit's collision-avoiding desired velocity
#[no_mangle]
pub extern "C" fn pathgrid_avoid_collision(
    handle: PathgridHandle,
    unit_id: u32,
    vx: *mut f32,
    vy: *mut f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    if pf.unit_position(unit_id).is_none() {
        return false;
    }
    write_pair(pf.avoid_collision(unit_id), vx, vy);
    true
}

#[no_mangle]
pub extern "C" fn pathgrid_apply_steering(
    handle: PathgridHandle,
    unit_id: u32,
    steer_x: f32,
    steer_y: f32,
    magnitude: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.apply_steering(unit_id, steer_x, steer_y, magnitude)
}

#[no_mangle]
pub extern "C" fn pathgrid_apply_seek_behavior(
    handle: PathgridHandle,
    unit_id: u32,
    target_x: f32,
    target_y: f32,
    max_force: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.apply_seek_behavior(unit_id, target_x, target_y, max_force)
}

/// Push `unit_id` away from `count` obstacle points
#[no_mangle]
pub extern "C" fn pathgrid_apply_avoidance_behavior(
    handle: PathgridHandle,
    unit_id: u32,
    obstacles: *const PathgridWaypoint,
    count: u32,
    max_force: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    let points = read_points(obstacles, count);
    pf.apply_avoidance_behavior(unit_id, &points, max_force)
}

// ============================================================================
// Formations
// ============================================================================

/// Group `count` units into a formation; the first id leads
///
/// `kind`: 0 none, 1 line, 2 column, 3 wedge, 4 box
#[no_mangle]
pub extern "C" fn pathgrid_create_formation(
    handle: PathgridHandle,
    kind: u32,
    unit_ids: *const u32,
    count: u32,
) -> bool {
    if handle.is_null() || unit_ids.is_null() {
        return false;
    }

    let kind = match FormationType::from_u32(kind) {
        Some(k) => k,
        None => return false,
    };
    let pf = unsafe { &mut *handle };
    let ids = unsafe { slice::from_raw_parts(unit_ids, count as usize) };
    pf.create_formation(kind, ids)
}

#[no_mangle]
pub extern "C" fn pathgrid_move_formation(
    handle: PathgridHandle,
    leader_id: u32,
    target_x: f32,
    target_y: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.move_formation(leader_id, target_x, target_y)
}

#[no_mangle]
pub extern "C" fn pathgrid_set_formation_spacing(
    handle: PathgridHandle,
    kind: u32,
    spacing: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let kind = match FormationType::from_u32(kind) {
        Some(k) => k,
        None => return false,
    };
    let pf = unsafe { &mut *handle };
    pf.set_formation_spacing(kind, spacing)
}

#[no_mangle]
pub extern "C" fn pathgrid_disband_formation(handle: PathgridHandle) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &mut *handle };
    pf.disband_formation()
}

// ============================================================================
// Spatial Queries
// ============================================================================

#[no_mangle]
pub extern "C" fn pathgrid_is_path_obstructed(
    handle: PathgridHandle,
    start_x: f32,
    start_y: f32,
    end_x: f32,
    end_y: f32,
    radius: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    pf.is_path_obstructed(start_x, start_y, end_x, end_y, radius)
}

#[no_mangle]
pub extern "C" fn pathgrid_line_of_sight(
    handle: PathgridHandle,
    from_x: f32,
    from_y: f32,
    to_x: f32,
    to_y: f32,
    radius: f32,
) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    pf.line_of_sight(from_x, from_y, to_x, to_y, radius)
}

// ============================================================================
// Simulation Control
// ============================================================================

/// Advance the simulation by `delta_seconds`
#[no_mangle]
pub extern "C" fn pathgrid_update(handle: PathgridHandle, delta_seconds: f32) {
    if handle.is_null() {
        return;
    }

    let pf = unsafe { &mut *handle };
    pf.update(delta_seconds);
}

/// Advance unit movement only
#[no_mangle]
pub extern "C" fn pathgrid_update_movement(handle: PathgridHandle, delta_seconds: f32) {
    if handle.is_null() {
        return;
    }

    let pf = unsafe { &mut *handle };
    pf.update_movement(delta_seconds);
}

// ============================================================================
// Errors and Diagnostics
// ============================================================================

/// Copy the last error message (NUL-terminated, truncated to fit) into
/// `buffer`
///
/// Returns the full message length in bytes, excluding the terminator;
/// 0 when no error is recorded.
#[no_mangle]
pub extern "C" fn pathgrid_last_error(
    handle: PathgridHandle,
    buffer: *mut c_char,
    capacity: usize,
) -> usize {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &*handle };
    let message = pf.last_error().as_bytes();
    if !buffer.is_null() && capacity > 0 {
        let n = message.len().min(capacity - 1);
        let out = unsafe { slice::from_raw_parts_mut(buffer as *mut u8, n + 1) };
        out[..n].copy_from_slice(&message[..n]);
        out[n] = 0;
    }
    message.len()
}

/// Clear the last error; returns how many errors were recorded
#[no_mangle]
pub extern "C" fn pathgrid_clear_errors(handle: PathgridHandle) -> u32 {
    if handle.is_null() {
        return 0;
    }

    let pf = unsafe { &mut *handle };
    pf.clear_errors()
}

#[no_mangle]
pub extern "C" fn pathgrid_get_stats(handle: PathgridHandle, stats: *mut PathgridStats) -> bool {
    if handle.is_null() || stats.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    let s = pf.stats();
    let out = unsafe { &mut *stats };

    out.sim_time = pf.sim_time();
    out.active_paths = s.active_paths as u32;
    out.path_capacity = s.path_capacity as u32;
    out.units = s.units as u32;
    out.unit_capacity = s.unit_capacity as u32;
    out.moving_units = s.moving_units as u32;
    out.overlapping_units = s.overlapping_units as u32;
    out.error_count = s.error_count;

    true
}

/// Log the grid summary at info level
#[no_mangle]
pub extern "C" fn pathgrid_print_grid_info(handle: PathgridHandle) {
    if handle.is_null() {
        return;
    }

    let pf = unsafe { &*handle };
    log::info!("{}", pf.grid_info());
}

/// Log one path's summary at info level. Returns false for an unknown path.
#[no_mangle]
pub extern "C" fn pathgrid_print_path_info(handle: PathgridHandle, path: u64) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    match pf.path_info(PathHandle(path)) {
        Some(info) => {
            log::info!("{}", info);
            true
        }
        None => false,
    }
}

/// Log one unit's summary at info level. Returns false for an unknown unit.
#[no_mangle]
pub extern "C" fn pathgrid_print_unit_info(handle: PathgridHandle, unit_id: u32) -> bool {
    if handle.is_null() {
        return false;
    }

    let pf = unsafe { &*handle };
    match pf.unit_info(unit_id) {
        Some(info) => {
            log::info!("{}", info);
            true
        }
        None => false,
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn read_points(points: *const PathgridWaypoint, count: u32) -> Vec<Vec2> {
    if points.is_null() || count == 0 {
        return Vec::new();
    }
    let raw = unsafe { slice::from_raw_parts(points, count as usize) };
    raw.iter().map(|p| Vec2::new(p.x, p.y)).collect()
}

fn write_pair(v: Vec2, x: *mut f32, y: *mut f32) {
    if !x.is_null() {
        unsafe {
            *x = v.x;
        }
    }
    if !y.is_null() {
        unsafe {
            *y = v.y;
        }
    }
}
