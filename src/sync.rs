//! State shared between the transport boundary and the control loop
//!
//! Inbound updates (map, goal, arrival) land here from any task. Each piece supports whole
//! value replacement, so the control loop only ever reads consistent snapshots.
use crate::arrival::ArrivalMonitor;
use crate::goal::{GoalAdmission, GoalRegistry};
use crate::map::{MapState, OccupancyGrid};
use crate::NavigationError;
use nalgebra::Vector2;

/// Map, goal and arrival state, shared behind an `Arc`
#[derive(Default)]
pub struct SharedState {
    pub map: MapState,
    pub goals: GoalRegistry,
    pub arrival: ArrivalMonitor,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the occupancy grid, returning the new map epoch
    pub fn ingest_map(&self, grid: OccupancyGrid) -> u64 {
        self.map.ingest(grid)
    }

    /// Request a goal in world coordinates
    /// # Errors
    /// * `NoMap` if no map has been ingested yet, there is no origin to convert against
    /// # Example
    /// ```
    /// use nalgebra::Vector2;
    /// use peng_waypoint::{NavigationError, SharedState};
    /// let shared = SharedState::new();
    /// assert!(matches!(
    ///     shared.request_goal(Vector2::new(1.0, 1.0)),
    ///     Err(NavigationError::NoMap)
    /// ));
    /// ```
    pub fn request_goal(&self, world: Vector2<f32>) -> Result<GoalAdmission, NavigationError> {
        let origin = self.map.origin().ok_or(NavigationError::NoMap)?;
        Ok(self.goals.request(world, origin))
    }

    /// Store the latest arrival flag
    pub fn set_arrival(&self, at_waypoint: bool) {
        self.arrival.set(at_waypoint);
    }
}
