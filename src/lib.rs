//! # Grid Waypoint Execution
//! This crate drives an aerial vehicle from its current cell to an operator-supplied goal
//! over a 2D occupancy grid.
//! It ingests occupancy maps and goal requests, runs a grid path search and then feeds the
//! resulting waypoints to the vehicle one at a time, advancing only when the vehicle reports
//! that it reached the current target.
//! ## Features
//! - Occupancy grid ingest with epoch based plan invalidation
//! - First-wins goal admission in grid-local coordinates
//! - A* path search with a configurable safety margin
//! - Arrival gated trajectory executor with content based trajectory change detection
//! - Fixed-rate tokio control loop behind a pluggable transport
//! - Seeded map generator and simulated vehicle for closed loop runs
//! ## Example
//! ```
//! use nalgebra::Vector2;
//! use peng_waypoint::{OccupancyGrid, SharedState};
//! let grid = OccupancyGrid::new(10, 10, Vector2::new(0.0, 0.0), &[0; 100], 50).unwrap();
//! let shared = SharedState::new();
//! shared.ingest_map(grid);
//! assert!(shared.request_goal(Vector2::new(5.0, 0.0)).is_ok());
//! ```
pub mod arrival;
pub mod config;
pub mod environment;
pub mod executor;
pub mod goal;
pub mod map;
pub mod node;
pub mod planners;
pub mod sync;
pub mod vehicle;

pub use arrival::ArrivalMonitor;
pub use executor::{Cycle, ExecutorEvent, Invalidation, PlanState, TrajectoryExecutor};
pub use goal::{Goal, GoalAdmission, GoalRegistry};
pub use map::{Cell, MapSnapshot, MapState, OccupancyGrid, Position};
pub use node::{LogTransport, Node, Transport};
pub use planners::{AStarPlanner, PathSearch};
pub use sync::SharedState;
pub use vehicle::SimulatedVehicle;

#[derive(thiserror::Error, Debug)]
/// Represents errors that can occur while planning or executing a trajectory
/// # Example
/// ```
/// use peng_waypoint::NavigationError;
/// let error = NavigationError::MapShape { expected: 100, actual: 99 };
/// assert_eq!(error.to_string(), "Map shape error: expected 100 cells, got 99");
/// ```
pub enum NavigationError {
    /// The cell array does not match the advertised dimensions
    #[error("Map shape error: expected {expected} cells, got {actual}")]
    MapShape { expected: usize, actual: usize },
    /// A map with a zero dimension
    #[error("Map has zero width or height")]
    EmptyMap,
    /// A goal was requested before any map provided an origin
    #[error("No map received yet, cannot convert goal to grid coordinates")]
    NoMap,
    /// Error raised by an outbound transport
    #[error("Transport error: {0}")]
    Transport(String),
    /// Error reading a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error parsing the configuration
    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),
    /// Other general errors
    #[error("Other error: {0}")]
    OtherError(String),
}

/// Flatten a waypoint sequence into the `[x0, y0, x1, y1, ...]` layout used by the
/// trajectory signal
/// # Arguments
/// * `waypoints` - The waypoints to flatten
/// # Returns
/// * The flattened coordinates
/// # Example
/// ```
/// use peng_waypoint::{flatten_trajectory, Position};
/// let flat = flatten_trajectory(&[Position::new(1, 2), Position::new(3, 4)]);
/// assert_eq!(flat, vec![1, 2, 3, 4]);
/// ```
pub fn flatten_trajectory(waypoints: &[Position]) -> Vec<i32> {
    waypoints.iter().flat_map(|p| [p.x, p.y]).collect()
}
