use crate::map::{OccupancyGrid, Position};

mod astar;

pub use astar::AStarPlanner;

/// Grid path search engine consumed by the trajectory executor
///
/// The executor calls `plan` synchronously, at most once per control cycle, and treats `None`
/// as "no path for this goal on this map". Implementations must be deterministic for identical
/// inputs.
/// # Example
/// ```
/// use peng_waypoint::{OccupancyGrid, PathSearch, Position};
/// struct StraightLine;
/// impl PathSearch for StraightLine {
///     fn plan(
///         &self,
///         _grid: &OccupancyGrid,
///         start: Position,
///         goal: Position,
///     ) -> Option<Vec<Position>> {
///         (start.y == goal.y && start.x <= goal.x)
///             .then(|| (start.x + 1..=goal.x).map(|x| Position::new(x, goal.y)).collect())
///     }
/// }
/// let grid = OccupancyGrid::new(6, 1, nalgebra::Vector2::zeros(), &[0; 6], 50).unwrap();
/// let path = StraightLine.plan(&grid, Position::new(0, 0), Position::new(3, 0)).unwrap();
/// assert_eq!(path.last(), Some(&Position::new(3, 0)));
/// ```
pub trait PathSearch: Send {
    /// Plan a path between two grid-local cells
    /// # Arguments
    /// * `grid` - The occupancy grid to search
    /// * `start` - The vehicle cell, not included in the result
    /// * `goal` - The goal cell, the last element of the result
    /// # Returns
    /// * The ordered waypoints, or `None` if the goal cannot be reached
    fn plan(&self, grid: &OccupancyGrid, start: Position, goal: Position)
        -> Option<Vec<Position>>;
}
