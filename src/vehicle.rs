//! Simulated vehicle
//!
//! Stands in for the flight stack on the far side of the transport. It flies to each target
//! in a fixed number of control cycles and reports arrival through the shared state.
use crate::node::Transport;
use crate::sync::SharedState;
use crate::NavigationError;
use async_trait::async_trait;
use nalgebra::Vector3;
use std::sync::Arc;

/// Vehicle that reaches a target after it was published `ticks_per_waypoint` more times
/// # Example
/// ```
/// use futures::executor::block_on;
/// use nalgebra::Vector3;
/// use peng_waypoint::{SharedState, SimulatedVehicle, Transport};
/// use std::sync::Arc;
/// let shared = Arc::new(SharedState::new());
/// let mut vehicle = SimulatedVehicle::new(shared.clone(), 1);
/// let target = Vector3::new(1.0, 2.0, 2.5);
/// block_on(vehicle.publish_target(target)).unwrap();
/// assert!(!shared.arrival.at_waypoint());
/// block_on(vehicle.publish_target(target)).unwrap();
/// assert!(shared.arrival.at_waypoint());
/// ```
pub struct SimulatedVehicle {
    shared: Arc<SharedState>,
    ticks_per_waypoint: u32,
    target: Option<Vector3<f32>>,
    ticks_left: u32,
    reached: Vec<Vector3<f32>>,
    trajectory: Option<Vec<i32>>,
}

impl SimulatedVehicle {
    /// Create a new simulated vehicle
    /// # Arguments
    /// * `shared` - State receiving the arrival flag
    /// * `ticks_per_waypoint` - Repeated publishes of a target before it counts as reached
    pub fn new(shared: Arc<SharedState>, ticks_per_waypoint: u32) -> Self {
        Self {
            shared,
            ticks_per_waypoint,
            target: None,
            ticks_left: 0,
            reached: Vec::new(),
            trajectory: None,
        }
    }

    /// Targets reached so far, in order
    pub fn reached(&self) -> &[Vector3<f32>] {
        &self.reached
    }

    /// Last trajectory received
    pub fn trajectory(&self) -> Option<&[i32]> {
        self.trajectory.as_deref()
    }

    /// Last reached target, the vehicle hovers there
    pub fn position(&self) -> Option<Vector3<f32>> {
        self.reached.last().copied()
    }
}

#[async_trait]
impl Transport for SimulatedVehicle {
    async fn publish_target(&mut self, target: Vector3<f32>) -> Result<(), NavigationError> {
        let was_arrived = if self.target == Some(target) {
            let arrived = self.ticks_left == 0;
            self.ticks_left = self.ticks_left.saturating_sub(1);
            arrived
        } else {
            log::debug!("Vehicle heading to ({}, {})", target.x, target.y);
            self.target = Some(target);
            self.ticks_left = self.ticks_per_waypoint;
            false
        };
        let arrived = self.ticks_left == 0;
        if arrived && !was_arrived {
            log::debug!("Vehicle reached ({}, {})", target.x, target.y);
            self.reached.push(target);
        }
        self.shared.set_arrival(arrived);
        Ok(())
    }

    async fn publish_trajectory(&mut self, trajectory: &[i32]) -> Result<(), NavigationError> {
        self.trajectory = Some(trajectory.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_target_lowers_arrival_flag() -> Result<(), NavigationError> {
        let shared = Arc::new(SharedState::new());
        shared.set_arrival(true);
        let mut vehicle = SimulatedVehicle::new(shared.clone(), 2);
        vehicle.publish_target(Vector3::new(1.0, 0.0, 2.5)).await?;
        assert!(!shared.arrival.at_waypoint());
        Ok(())
    }

    #[tokio::test]
    async fn counts_down_repeated_targets() -> Result<(), NavigationError> {
        let shared = Arc::new(SharedState::new());
        let mut vehicle = SimulatedVehicle::new(shared.clone(), 2);
        let target = Vector3::new(3.0, 4.0, 2.5);
        vehicle.publish_target(target).await?;
        vehicle.publish_target(target).await?;
        assert!(!shared.arrival.at_waypoint());
        vehicle.publish_target(target).await?;
        assert!(shared.arrival.at_waypoint());
        vehicle.publish_target(target).await?;
        assert!(shared.arrival.at_waypoint());
        assert_eq!(vehicle.reached(), &[target]);
        assert_eq!(vehicle.position(), Some(target));
        Ok(())
    }

    #[tokio::test]
    async fn zero_ticks_arrives_immediately() -> Result<(), NavigationError> {
        let shared = Arc::new(SharedState::new());
        let mut vehicle = SimulatedVehicle::new(shared.clone(), 0);
        vehicle.publish_target(Vector3::new(1.0, 1.0, 2.5)).await?;
        assert!(shared.arrival.at_waypoint());
        vehicle.publish_target(Vector3::new(2.0, 1.0, 2.5)).await?;
        assert_eq!(vehicle.reached().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn keeps_last_trajectory() -> Result<(), NavigationError> {
        let shared = Arc::new(SharedState::new());
        let mut vehicle = SimulatedVehicle::new(shared, 1);
        assert_eq!(vehicle.trajectory(), None);
        vehicle.publish_trajectory(&[1, 2, 3, 4]).await?;
        vehicle.publish_trajectory(&[3, 4]).await?;
        assert_eq!(vehicle.trajectory(), Some(&[3, 4][..]));
        Ok(())
    }
}
