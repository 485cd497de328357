//! Occupancy grid and the map state shared with the control loop
//!
//! A new map always supersedes the previous one wholesale. Every ingest bumps the map epoch,
//! which is how the executor learns that a plan was computed against stale geometry.
use crate::NavigationError;
use nalgebra::Vector2;
use std::sync::Arc;
use tokio::sync::watch;

/// Integer cell coordinate pair
/// # Example
/// ```
/// use peng_waypoint::Position;
/// let position = Position::new(3, -2);
/// assert_eq!((position.x, position.y), (3, -2));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Occupancy state of a single cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Free,
    Occupied,
    Unknown,
}

impl Cell {
    /// Classify a raw occupancy value, negative values are unknown
    /// # Example
    /// ```
    /// use peng_waypoint::Cell;
    /// assert_eq!(Cell::from_raw(-1, 50), Cell::Unknown);
    /// assert_eq!(Cell::from_raw(0, 50), Cell::Free);
    /// assert_eq!(Cell::from_raw(100, 50), Cell::Occupied);
    /// ```
    pub fn from_raw(value: i8, occupied_threshold: i8) -> Self {
        if value < 0 {
            Cell::Unknown
        } else if value >= occupied_threshold {
            Cell::Occupied
        } else {
            Cell::Free
        }
    }
}

/// A 2D occupancy grid with a world frame origin
/// # Example
/// ```
/// use nalgebra::Vector2;
/// use peng_waypoint::{Cell, OccupancyGrid, Position};
/// let mut data = vec![0; 12];
/// data[5] = 100;
/// let grid = OccupancyGrid::new(4, 3, Vector2::new(-2.0, -1.0), &data, 50).unwrap();
/// assert_eq!(grid.cell(Position::new(1, 1)), Some(Cell::Occupied));
/// assert_eq!(grid.cell(Position::new(4, 0)), None);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    origin: Vector2<f32>,
    cells: Vec<Cell>,
}

impl OccupancyGrid {
    /// Build a grid from a row-major raw cell array
    /// # Arguments
    /// * `width` - Number of columns
    /// * `height` - Number of rows
    /// * `origin` - World coordinates of cell (0, 0)
    /// * `data` - Raw occupancy values, `data[y * width + x]`
    /// * `occupied_threshold` - Values at or above this are occupied
    /// # Errors
    /// * `EmptyMap` if a dimension is zero
    /// * `MapShape` if the data length does not match the dimensions
    pub fn new(
        width: usize,
        height: usize,
        origin: Vector2<f32>,
        data: &[i8],
        occupied_threshold: i8,
    ) -> Result<Self, NavigationError> {
        if width == 0 || height == 0 {
            return Err(NavigationError::EmptyMap);
        }
        let expected = width * height;
        if data.len() != expected {
            return Err(NavigationError::MapShape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            origin,
            cells: data
                .iter()
                .map(|&v| Cell::from_raw(v, occupied_threshold))
                .collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn origin(&self) -> Vector2<f32> {
        self.origin
    }

    /// Whether the position lies inside the grid
    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as usize) < self.width
            && (position.y as usize) < self.height
    }

    /// Row-major index of an in-bounds position
    pub fn index(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| position.y as usize * self.width + position.x as usize)
    }

    /// Position of a row-major index
    pub fn position(&self, index: usize) -> Position {
        Position::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Cell state at a position, `None` when out of bounds
    pub fn cell(&self, position: Position) -> Option<Cell> {
        self.index(position).map(|i| self.cells[i])
    }

    /// Convert a world coordinate to grid-local by subtracting the origin and rounding to the
    /// nearest cell
    /// # Example
    /// ```
    /// use nalgebra::Vector2;
    /// use peng_waypoint::{OccupancyGrid, Position};
    /// let grid = OccupancyGrid::new(20, 20, Vector2::new(-10.0, -10.0), &[0; 400], 50).unwrap();
    /// assert_eq!(grid.to_grid(Vector2::new(2.4, -3.6)), Position::new(12, 6));
    /// ```
    pub fn to_grid(&self, world: Vector2<f32>) -> Position {
        world_to_grid(world, self.origin)
    }

    /// Convert a grid-local position to world coordinates by adding the origin
    pub fn to_world(&self, position: Position) -> Position {
        grid_to_world(position, self.origin)
    }

    /// Vehicle start cell implied by the map extent and origin
    ///
    /// The vehicle is assumed to sit at `(width + origin.x, height + origin.y)`, truncated,
    /// which is the grid centre for maps centred on the world origin.
    /// # Example
    /// ```
    /// use nalgebra::Vector2;
    /// use peng_waypoint::{OccupancyGrid, Position};
    /// let grid = OccupancyGrid::new(20, 10, Vector2::new(-10.0, -5.0), &[0; 200], 50).unwrap();
    /// assert_eq!(grid.initial_vehicle_position(), Position::new(10, 5));
    /// ```
    pub fn initial_vehicle_position(&self) -> Position {
        Position::new(
            (self.width as f32 + self.origin.x) as i32,
            (self.height as f32 + self.origin.y) as i32,
        )
    }
}

/// World to grid-local conversion against an explicit origin
pub fn world_to_grid(world: Vector2<f32>, origin: Vector2<f32>) -> Position {
    Position::new(
        (world.x - origin.x).round() as i32,
        (world.y - origin.y).round() as i32,
    )
}

/// Grid-local to world conversion against an explicit origin
pub fn grid_to_world(position: Position, origin: Vector2<f32>) -> Position {
    Position::new(
        (position.x as f32 + origin.x).round() as i32,
        (position.y as f32 + origin.y).round() as i32,
    )
}

/// A consistent view of the latest map
#[derive(Clone, Debug)]
pub struct MapSnapshot {
    /// The grid itself
    pub grid: Arc<OccupancyGrid>,
    /// Incremented on every ingest, starting at 1
    pub epoch: u64,
    /// Vehicle start cell derived from this map
    pub vehicle: Position,
}

/// Holds the latest occupancy grid, replaced atomically on every ingest
pub struct MapState {
    latest: watch::Sender<Option<MapSnapshot>>,
}

impl Default for MapState {
    fn default() -> Self {
        Self::new()
    }
}

impl MapState {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self { latest }
    }

    /// Replace the stored map, returning the new epoch
    /// # Example
    /// ```
    /// use nalgebra::Vector2;
    /// use peng_waypoint::{MapState, OccupancyGrid};
    /// let state = MapState::new();
    /// let grid = OccupancyGrid::new(2, 2, Vector2::zeros(), &[0; 4], 50).unwrap();
    /// assert_eq!(state.ingest(grid.clone()), 1);
    /// assert_eq!(state.ingest(grid), 2);
    /// ```
    pub fn ingest(&self, grid: OccupancyGrid) -> u64 {
        let vehicle = grid.initial_vehicle_position();
        let grid = Arc::new(grid);
        let mut epoch = 0;
        self.latest.send_modify(|slot| {
            epoch = slot.as_ref().map_or(0, |s| s.epoch) + 1;
            *slot = Some(MapSnapshot {
                grid,
                epoch,
                vehicle,
            });
        });
        log::info!("Map epoch {} ingested, vehicle at {}", epoch, vehicle);
        epoch
    }

    /// The latest map, if any has been received
    pub fn snapshot(&self) -> Option<MapSnapshot> {
        self.latest.borrow().clone()
    }

    /// Origin of the latest map
    pub fn origin(&self) -> Option<Vector2<f32>> {
        self.latest.borrow().as_ref().map(|s| s.grid.origin())
    }

    /// Subscribe to map replacements
    pub fn subscribe(&self) -> watch::Receiver<Option<MapSnapshot>> {
        self.latest.subscribe()
    }
}
