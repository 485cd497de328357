use crate::map::{Cell, OccupancyGrid, Position};
use crate::planners::PathSearch;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

static ORTHOGONAL_MOVES: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
static DIAGONAL_MOVES: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Grid A* planner that keeps a minimum clearance from occupied cells
///
/// A cell is traversable when it is free and no occupied cell lies within `safety_margin` cells
/// of it (Chebyshev distance). Unknown cells are never entered. The start cell is exempt from
/// the clearance check so a vehicle parked close to an obstacle can still leave.
/// # Example
/// ```
/// use nalgebra::Vector2;
/// use peng_waypoint::{AStarPlanner, OccupancyGrid, PathSearch, Position};
/// let grid = OccupancyGrid::new(8, 3, Vector2::zeros(), &[0; 24], 50).unwrap();
/// let planner = AStarPlanner::new(1);
/// let path = planner.plan(&grid, Position::new(0, 0), Position::new(5, 0)).unwrap();
/// assert_eq!(path.first(), Some(&Position::new(1, 0)));
/// assert_eq!(path.last(), Some(&Position::new(5, 0)));
/// ```
#[derive(Clone, Debug)]
pub struct AStarPlanner {
    /// Minimum clearance from occupied cells, in cells
    pub safety_margin: u32,
    /// Allow 8-connected moves, otherwise only 4-connected
    pub allow_diagonal: bool,
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    index: usize,
    f_score: f32,
    g_score: f32,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchNode {}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f, ties go to the node furthest along, then the lower index
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| self.g_score.total_cmp(&other.g_score))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AStarPlanner {
    /// Create a new 8-connected planner
    /// # Arguments
    /// * `safety_margin` - Minimum clearance from occupied cells
    pub fn new(safety_margin: u32) -> Self {
        Self {
            safety_margin,
            allow_diagonal: true,
        }
    }

    /// Enable or disable diagonal moves
    pub fn with_diagonal(mut self, allow_diagonal: bool) -> Self {
        self.allow_diagonal = allow_diagonal;
        self
    }

    /// Traversability of every cell after inflating obstacles by the safety margin
    fn traversable(&self, grid: &OccupancyGrid) -> Vec<bool> {
        let size = grid.width() * grid.height();
        let mut mask: Vec<bool> = (0..size)
            .map(|i| grid.cell(grid.position(i)) == Some(Cell::Free))
            .collect();
        let margin = self.safety_margin as i32;
        if margin == 0 {
            return mask;
        }
        for i in 0..size {
            let p = grid.position(i);
            if grid.cell(p) != Some(Cell::Occupied) {
                continue;
            }
            for dy in -margin..=margin {
                for dx in -margin..=margin {
                    if let Some(j) = grid.index(Position::new(p.x + dx, p.y + dy)) {
                        mask[j] = false;
                    }
                }
            }
        }
        mask
    }

    fn heuristic(&self, a: Position, b: Position) -> f32 {
        let dx = (a.x - b.x).abs() as f32;
        let dy = (a.y - b.y).abs() as f32;
        if self.allow_diagonal {
            dx + dy + (std::f32::consts::SQRT_2 - 2.0) * dx.min(dy)
        } else {
            dx + dy
        }
    }

    fn moves(&self) -> impl Iterator<Item = (i32, i32, f32)> + '_ {
        let diagonal: &[(i32, i32)] = if self.allow_diagonal {
            &DIAGONAL_MOVES
        } else {
            &[]
        };
        ORTHOGONAL_MOVES
            .iter()
            .map(|&(dx, dy)| (dx, dy, 1.0))
            .chain(
                diagonal
                    .iter()
                    .map(|&(dx, dy)| (dx, dy, std::f32::consts::SQRT_2)),
            )
    }

    fn reconstruct(parent: &[Option<usize>], goal: usize, grid: &OccupancyGrid) -> Vec<Position> {
        let mut path = vec![grid.position(goal)];
        let mut current = goal;
        while let Some(previous) = parent[current] {
            current = previous;
            path.push(grid.position(current));
        }
        // Drop the start cell
        path.pop();
        path.reverse();
        path
    }
}

impl PathSearch for AStarPlanner {
    fn plan(
        &self,
        grid: &OccupancyGrid,
        start: Position,
        goal: Position,
    ) -> Option<Vec<Position>> {
        let Some(start_index) = grid.index(start) else {
            log::debug!("Start {} is outside the map", start);
            return None;
        };
        let Some(goal_index) = grid.index(goal) else {
            log::debug!("Goal {} is outside the map", goal);
            return None;
        };
        let mut mask = self.traversable(grid);
        mask[start_index] = true;
        if !mask[goal_index] {
            log::debug!("Goal {} is not traversable", goal);
            return None;
        }
        if start_index == goal_index {
            return Some(vec![goal]);
        }

        let size = mask.len();
        let mut g_score = vec![f32::INFINITY; size];
        let mut parent: Vec<Option<usize>> = vec![None; size];
        let mut closed = vec![false; size];
        let mut open_set = BinaryHeap::new();
        g_score[start_index] = 0.0;
        open_set.push(SearchNode {
            index: start_index,
            f_score: self.heuristic(start, goal),
            g_score: 0.0,
        });

        while let Some(node) = open_set.pop() {
            if closed[node.index] {
                continue;
            }
            closed[node.index] = true;
            if node.index == goal_index {
                return Some(Self::reconstruct(&parent, goal_index, grid));
            }
            let current = grid.position(node.index);
            for (dx, dy, cost) in self.moves() {
                let Some(next) = grid.index(Position::new(current.x + dx, current.y + dy)) else {
                    continue;
                };
                if closed[next] || !mask[next] {
                    continue;
                }
                if dx != 0 && dy != 0 {
                    // No cutting corners past blocked cells
                    let side_x = grid.index(Position::new(current.x + dx, current.y));
                    let side_y = grid.index(Position::new(current.x, current.y + dy));
                    if !side_x.is_some_and(|i| mask[i]) || !side_y.is_some_and(|i| mask[i]) {
                        continue;
                    }
                }
                let tentative = g_score[node.index] + cost;
                if tentative < g_score[next] {
                    g_score[next] = tentative;
                    parent[next] = Some(node.index);
                    open_set.push(SearchNode {
                        index: next,
                        f_score: tentative + self.heuristic(grid.position(next), goal),
                        g_score: tentative,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    /// Build a grid from rows of `.` (free), `#` (occupied) and `?` (unknown), row 0 first
    fn grid_from(rows: &[&str]) -> OccupancyGrid {
        let width = rows[0].len();
        let data: Vec<i8> = rows
            .iter()
            .flat_map(|row| {
                row.chars().map(|c| match c {
                    '#' => 100,
                    '?' => -1,
                    _ => 0,
                })
            })
            .collect();
        OccupancyGrid::new(width, rows.len(), Vector2::zeros(), &data, 50).unwrap()
    }

    fn is_connected(start: Position, path: &[Position]) -> bool {
        std::iter::once(&start)
            .chain(path)
            .zip(path)
            .all(|(a, b)| (a.x - b.x).abs() <= 1 && (a.y - b.y).abs() <= 1 && a != b)
    }

    #[test]
    fn straight_line_on_clear_grid() {
        let grid = grid_from(&["..........", "..........", ".........."]);
        let path = AStarPlanner::new(1)
            .plan(&grid, Position::new(0, 0), Position::new(5, 0))
            .unwrap();
        let expected: Vec<Position> = (1..=5).map(|x| Position::new(x, 0)).collect();
        assert_eq!(path, expected);
    }

    #[test]
    fn routes_through_gap_in_wall() {
        let grid = grid_from(&[
            ".......", //
            "...#...", //
            "...#...", //
            ".......", //
        ]);
        let start = Position::new(0, 1);
        let goal = Position::new(6, 1);
        let path = AStarPlanner::new(0).plan(&grid, start, goal).unwrap();
        assert_eq!(path.last(), Some(&goal));
        assert!(is_connected(start, &path));
        assert!(path.iter().all(|p| grid.cell(*p) == Some(Cell::Free)));
    }

    #[test]
    fn safety_margin_closes_narrow_gap() {
        let grid = grid_from(&[
            "...#...", //
            ".......", //
            "...#...", //
        ]);
        let start = Position::new(0, 1);
        let goal = Position::new(6, 1);
        assert!(AStarPlanner::new(0).plan(&grid, start, goal).is_some());
        assert!(AStarPlanner::new(1).plan(&grid, start, goal).is_none());
    }

    #[test]
    fn start_outside_map_is_not_found() {
        // A 3x2 map at the world origin puts the derived vehicle cell at (3, 2), off the grid
        let grid = grid_from(&["...", "..."]);
        let start = grid.initial_vehicle_position();
        assert_eq!(start, Position::new(3, 2));
        assert!(grid.index(start).is_none());
        assert!(AStarPlanner::new(0)
            .plan(&grid, start, Position::new(1, 1))
            .is_none());
    }

    #[test]
    fn occupied_or_unknown_goal_is_not_found() {
        let grid = grid_from(&["....#?"]);
        let planner = AStarPlanner::new(0);
        assert!(planner
            .plan(&grid, Position::new(0, 0), Position::new(4, 0))
            .is_none());
        assert!(planner
            .plan(&grid, Position::new(0, 0), Position::new(5, 0))
            .is_none());
        assert!(planner
            .plan(&grid, Position::new(0, 0), Position::new(9, 0))
            .is_none());
    }

    #[test]
    fn enclosed_goal_is_not_found() {
        let grid = grid_from(&[
            ".....", //
            ".###.", //
            ".#.#.", //
            ".###.", //
        ]);
        assert!(AStarPlanner::new(0)
            .plan(&grid, Position::new(0, 0), Position::new(2, 2))
            .is_none());
    }

    #[test]
    fn diagonal_moves_do_not_cut_corners() {
        let grid = grid_from(&[
            ".#", //
            "..", //
        ]);
        let path = AStarPlanner::new(0)
            .plan(&grid, Position::new(0, 0), Position::new(1, 1))
            .unwrap();
        assert_eq!(path, vec![Position::new(0, 1), Position::new(1, 1)]);
    }

    #[test]
    fn four_connected_paths_have_unit_steps() {
        let grid = grid_from(&["....", "....", "...."]);
        let start = Position::new(0, 0);
        let path = AStarPlanner::new(0)
            .with_diagonal(false)
            .plan(&grid, start, Position::new(3, 2))
            .unwrap();
        assert_eq!(path.len(), 5);
        assert!(std::iter::once(&start)
            .chain(&path)
            .zip(&path)
            .all(|(a, b)| (a.x - b.x).abs() + (a.y - b.y).abs() == 1));
    }

    #[test]
    fn start_next_to_obstacle_can_leave() {
        let grid = grid_from(&["#.....", "......", "......"]);
        let path = AStarPlanner::new(1)
            .plan(&grid, Position::new(1, 0), Position::new(5, 2))
            .unwrap();
        assert_eq!(path.last(), Some(&Position::new(5, 2)));
    }

    #[test]
    fn start_equal_to_goal_yields_goal() {
        let grid = grid_from(&["..."]);
        let path = AStarPlanner::new(0).plan(&grid, Position::new(1, 0), Position::new(1, 0));
        assert_eq!(path, Some(vec![Position::new(1, 0)]));
    }

    #[test]
    fn repeated_searches_agree() {
        let grid = grid_from(&[
            "........", //
            "..##....", //
            "....##..", //
            "........", //
        ]);
        let planner = AStarPlanner::new(0);
        let first = planner.plan(&grid, Position::new(0, 0), Position::new(7, 3));
        let second = planner.plan(&grid, Position::new(0, 0), Position::new(7, 3));
        assert!(first.is_some());
        assert_eq!(first, second);
    }
}
