use crate::config::MapConfig;
use crate::map::{OccupancyGrid, Position};
use crate::NavigationError;
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Raw occupancy value of a free cell
pub const FREE: i8 = 0;
/// Raw occupancy value of an occupied cell
pub const OCCUPIED: i8 = 100;

/// An axis aligned rectangular obstacle in grid cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Obstacle {
    /// Lower left cell of the obstacle
    pub corner: Position,
    /// Size in cells (width, height)
    pub size: (usize, usize),
}

impl Obstacle {
    /// Whether the obstacle covers the cell
    pub fn covers(&self, cell: Position) -> bool {
        cell.x >= self.corner.x
            && cell.y >= self.corner.y
            && cell.x < self.corner.x + self.size.0 as i32
            && cell.y < self.corner.y + self.size.1 as i32
    }
}

/// Generates occupancy maps with random rectangular obstacles
/// # Example
/// ```
/// use peng_waypoint::environment::MapGenerator;
/// let mut generator = MapGenerator::new(20, 20, [-10.0, -10.0], [1, 3], 42);
/// let data = generator.generate(5);
/// assert_eq!(data.len(), 400);
/// ```
#[derive(Clone, Debug)]
pub struct MapGenerator {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// World coordinates of cell (0, 0)
    pub origin: [f32; 2],
    /// The bounds of the obstacles' side length in cells
    pub obstacle_size_bounds: [usize; 2],
    /// The obstacles placed by the last call to `generate`
    pub obstacles: Vec<Obstacle>,
    /// Rng for generating random numbers
    pub rng: ChaCha8Rng,
}

impl Default for MapGenerator {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            origin: [-10.0, -10.0],
            obstacle_size_bounds: [1, 3],
            obstacles: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }
}

impl MapGenerator {
    /// Creates a new generator
    /// # Arguments
    /// * `width` - Number of columns
    /// * `height` - Number of rows
    /// * `origin` - World coordinates of cell (0, 0)
    /// * `obstacle_size_bounds` - Obstacle side length bounds in cells (min, max)
    /// * `seed` - Seed, equal seeds produce equal maps
    pub fn new(
        width: usize,
        height: usize,
        origin: [f32; 2],
        obstacle_size_bounds: [usize; 2],
        seed: u64,
    ) -> Self {
        Self {
            width,
            height,
            origin,
            obstacle_size_bounds,
            obstacles: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(
            config.width,
            config.height,
            config.origin,
            config.obstacle_size_bounds,
            config.seed,
        )
    }

    /// Vehicle start cell implied by the map extent and origin
    pub fn vehicle_cell(&self) -> Position {
        Position::new(
            (self.width as f32 + self.origin[0]) as i32,
            (self.height as f32 + self.origin[1]) as i32,
        )
    }

    /// Generates raw row-major cell data with `num_obstacles` obstacles
    ///
    /// Obstacles covering the vehicle start cell are rejected and redrawn, up to a bounded
    /// number of tries.
    pub fn generate(&mut self, num_obstacles: usize) -> Vec<i8> {
        self.obstacles.clear();
        if self.width == 0 || self.height == 0 {
            return Vec::new();
        }
        let vehicle = self.vehicle_cell();
        let min_size = self.obstacle_size_bounds[0].max(1);
        let max_size = self.obstacle_size_bounds[1].max(min_size);
        let mut tries = 0;
        while self.obstacles.len() < num_obstacles && tries < num_obstacles * 20 {
            tries += 1;
            let size = (
                self.rng.gen_range(min_size..=max_size),
                self.rng.gen_range(min_size..=max_size),
            );
            let corner = Position::new(
                self.rng.gen_range(0..self.width) as i32,
                self.rng.gen_range(0..self.height) as i32,
            );
            let obstacle = Obstacle { corner, size };
            if !obstacle.covers(vehicle) {
                self.obstacles.push(obstacle);
            }
        }
        let mut data = vec![FREE; self.width * self.height];
        for (i, cell) in data.iter_mut().enumerate() {
            let position = Position::new((i % self.width) as i32, (i / self.width) as i32);
            if self.obstacles.iter().any(|o| o.covers(position)) {
                *cell = OCCUPIED;
            }
        }
        data
    }

    /// Generates an occupancy grid
    /// # Errors
    /// * If the configured dimensions are zero
    pub fn generate_grid(
        &mut self,
        num_obstacles: usize,
        occupied_threshold: i8,
    ) -> Result<OccupancyGrid, NavigationError> {
        if self.width == 0 || self.height == 0 {
            return Err(NavigationError::EmptyMap);
        }
        let data = self.generate(num_obstacles);
        OccupancyGrid::new(
            self.width,
            self.height,
            Vector2::new(self.origin[0], self.origin[1]),
            &data,
            occupied_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Cell;

    #[test]
    fn equal_seeds_generate_equal_maps() {
        let mut a = MapGenerator::new(16, 12, [-8.0, -6.0], [1, 4], 9);
        let mut b = MapGenerator::new(16, 12, [-8.0, -6.0], [1, 4], 9);
        assert_eq!(a.generate(8), b.generate(8));
        assert_eq!(a.obstacles, b.obstacles);
    }

    #[test]
    fn vehicle_cell_stays_free() {
        for seed in 0..20 {
            let mut generator = MapGenerator::new(10, 10, [-5.0, -5.0], [2, 5], seed);
            let grid = generator.generate_grid(15, 50).unwrap();
            assert_eq!(grid.initial_vehicle_position(), generator.vehicle_cell());
            assert_eq!(grid.cell(generator.vehicle_cell()), Some(Cell::Free));
        }
    }

    #[test]
    fn obstacles_mark_cells_occupied() {
        let mut generator = MapGenerator::new(12, 12, [-6.0, -6.0], [1, 2], 3);
        let grid = generator.generate_grid(4, 50).unwrap();
        for obstacle in &generator.obstacles {
            assert_eq!(grid.cell(obstacle.corner), Some(Cell::Occupied));
        }
    }

    #[test]
    fn zero_sized_map_is_rejected() {
        let mut generator = MapGenerator::new(0, 10, [0.0, 0.0], [1, 2], 0);
        assert!(matches!(
            generator.generate_grid(1, 50),
            Err(NavigationError::EmptyMap)
        ));
    }
}
