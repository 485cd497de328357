//! Configuration module
//!
//! This module contains the configuration for the control loop, path planner, simulated map,
//! simulated vehicle and mission.
//! The configuration is loaded from a YAML file using the serde library.
//! Every section has defaults, so a partial file only overrides what it names.

use crate::executor::DEFAULT_TARGET_ALTITUDE;
use crate::NavigationError;

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
/// Configuration for a waypoint run
pub struct Config {
    /// Control loop configuration
    pub control: ControlConfig,
    /// Path planner configuration
    pub planner: PlannerConfig,
    /// Simulated map configuration
    pub map: MapConfig,
    /// Simulated vehicle configuration
    pub vehicle: VehicleConfig,
    /// Mission configuration
    pub mission: MissionConfig,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
/// Configuration for the control loop
pub struct ControlConfig {
    /// Control loop rate in Hz
    pub rate_hz: f32,
    /// Altitude of every published target
    pub target_altitude: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            rate_hz: 3.0,
            target_altitude: DEFAULT_TARGET_ALTITUDE,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
/// Configuration for the path planner
pub struct PlannerConfig {
    /// Minimum clearance from occupied cells, in cells
    pub safety_margin: u32,
    /// Raw cell values at or above this are occupied
    pub occupied_threshold: i8,
    /// Allow diagonal moves
    pub allow_diagonal: bool,
    /// Consecutive failed searches before a goal is abandoned, `null` retries forever
    pub max_failed_attempts: Option<u32>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            safety_margin: 1,
            occupied_threshold: 50,
            allow_diagonal: true,
            max_failed_attempts: Some(5),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
/// Configuration for the simulated occupancy map
pub struct MapConfig {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// World coordinates of cell (0, 0)
    pub origin: [f32; 2],
    /// Number of rectangular obstacles
    pub num_obstacles: usize,
    /// Obstacle side length bounds in cells (min, max)
    pub obstacle_size_bounds: [usize; 2],
    /// Seed for the obstacle generator
    pub seed: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            width: 20,
            height: 20,
            origin: [-10.0, -10.0],
            num_obstacles: 6,
            obstacle_size_bounds: [1, 3],
            seed: 0,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
/// Configuration for the simulated vehicle
pub struct VehicleConfig {
    /// Control cycles the vehicle needs to reach a new target
    pub ticks_per_waypoint: u32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        VehicleConfig {
            ticks_per_waypoint: 2,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
/// Configuration for the mission
pub struct MissionConfig {
    /// Goals in world coordinates, requested one after another
    pub goals: Vec<[f32; 2]>,
    /// Seconds between goal requests while a goal is pending
    pub goal_retry_interval: f32,
    /// Run duration in seconds, `null` runs until interrupted
    pub duration: Option<f32>,
}

impl Default for MissionConfig {
    fn default() -> Self {
        MissionConfig {
            goals: Vec::new(),
            goal_retry_interval: 1.0,
            duration: None,
        }
    }
}

/// Implementation of the Config struct
impl Config {
    /// Load configuration from a YAML file.
    /// # Arguments
    /// * `filename` - The name of the file to load.
    /// # Returns
    /// * The configuration object.
    /// # Errors
    /// * If the file cannot be read or the YAML cannot be parsed.
    pub fn from_yaml(filename: &str) -> Result<Self, NavigationError> {
        let contents = std::fs::read_to_string(filename)?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}
