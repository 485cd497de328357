//! Control loop node
//!
//! The node owns the trajectory executor and an outbound transport. It steps the executor at a
//! fixed rate and publishes what each cycle produced, the full trajectory first and the
//! immediate target second.
use crate::executor::{Cycle, TrajectoryExecutor};
use crate::sync::SharedState;
use crate::{flatten_trajectory, NavigationError};
use async_trait::async_trait;
use nalgebra::Vector3;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Outbound signals of the control loop
#[async_trait]
pub trait Transport: Send {
    /// Publish the immediate target, world coordinates plus altitude
    async fn publish_target(&mut self, target: Vector3<f32>) -> Result<(), NavigationError>;
    /// Publish the remaining trajectory flattened as `[x0, y0, x1, y1, ...]`
    async fn publish_trajectory(&mut self, trajectory: &[i32]) -> Result<(), NavigationError>;
}

/// Transport that only writes the outbound signals to the log
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn publish_target(&mut self, target: Vector3<f32>) -> Result<(), NavigationError> {
        log::info!(
            "Target: ({:.1}, {:.1}, {:.1})",
            target.x,
            target.y,
            target.z
        );
        Ok(())
    }

    async fn publish_trajectory(&mut self, trajectory: &[i32]) -> Result<(), NavigationError> {
        log::info!("Trajectory: {:?}", trajectory);
        Ok(())
    }
}

/// Fixed-rate control loop around a trajectory executor
/// # Example
/// ```
/// use futures::executor::block_on;
/// use nalgebra::Vector2;
/// use peng_waypoint::*;
/// use std::sync::Arc;
/// let shared = Arc::new(SharedState::new());
/// shared.ingest_map(OccupancyGrid::new(8, 8, Vector2::new(-8.0, -8.0), &[0; 64], 50).unwrap());
/// shared.request_goal(Vector2::new(-4.0, -4.0)).unwrap();
/// let executor = TrajectoryExecutor::new(Box::new(AStarPlanner::new(1)), 2.5, None);
/// let mut node = Node::new(shared, executor, LogTransport, 3.0).unwrap();
/// block_on(node.tick()).unwrap();
/// let cycle = block_on(node.tick()).unwrap();
/// assert!(cycle.target.is_some());
/// ```
pub struct Node<T: Transport> {
    shared: Arc<SharedState>,
    executor: TrajectoryExecutor,
    transport: T,
    period: Duration,
}

impl<T: Transport> Node<T> {
    /// Create a new node
    /// # Arguments
    /// * `shared` - State written by the inbound handlers
    /// * `executor` - The trajectory executor
    /// * `transport` - Outbound signal sink
    /// * `rate_hz` - Control loop rate
    /// # Errors
    /// * If the rate is not a positive finite number, or its period is zero or unrepresentable
    pub fn new(
        shared: Arc<SharedState>,
        executor: TrajectoryExecutor,
        transport: T,
        rate_hz: f32,
    ) -> Result<Self, NavigationError> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(NavigationError::OtherError(format!(
                "Control rate must be positive, got {}",
                rate_hz
            )));
        }
        let period = Duration::try_from_secs_f32(1.0 / rate_hz).map_err(|e| {
            NavigationError::OtherError(format!("Invalid control rate {}: {}", rate_hz, e))
        })?;
        if period.is_zero() {
            return Err(NavigationError::OtherError(format!(
                "Control rate {} is too high, the period rounds to zero",
                rate_hz
            )));
        }
        Ok(Self {
            shared,
            executor,
            transport,
            period,
        })
    }

    pub fn executor(&self) -> &TrajectoryExecutor {
        &self.executor
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one control cycle and publish its signals
    /// # Returns
    /// * The cycle, after its signals were handed to the transport
    /// # Errors
    /// * If the transport fails to publish
    pub async fn tick(&mut self) -> Result<Cycle, NavigationError> {
        let cycle = self.executor.step(&self.shared);
        if let Some(trajectory) = &cycle.trajectory {
            self.transport
                .publish_trajectory(&flatten_trajectory(trajectory))
                .await?;
        }
        if let Some(target) = cycle.target {
            self.transport.publish_target(target).await?;
        }
        Ok(cycle)
    }

    /// Run the control loop until `shutdown` resolves
    ///
    /// A cycle that overruns its period delays the following ones instead of bursting to
    /// catch up.
    /// # Errors
    /// * The first transport error, which ends the loop
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), NavigationError>
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        log::info!("Starting control loop at {:?} per cycle", self.period);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Control loop stopped");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.tick().await?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::OccupancyGrid;
    use crate::planners::AStarPlanner;
    use nalgebra::Vector2;

    /// Records every publish in call order
    #[derive(Default)]
    struct RecordingTransport {
        calls: Vec<String>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn publish_target(&mut self, target: Vector3<f32>) -> Result<(), NavigationError> {
            if self.fail {
                return Err(NavigationError::Transport("link down".to_string()));
            }
            self.calls.push(format!("target {} {}", target.x, target.y));
            Ok(())
        }

        async fn publish_trajectory(
            &mut self,
            trajectory: &[i32],
        ) -> Result<(), NavigationError> {
            if self.fail {
                return Err(NavigationError::Transport("link down".to_string()));
            }
            self.calls.push(format!("trajectory {:?}", trajectory));
            Ok(())
        }
    }

    fn node_with(transport: RecordingTransport) -> Node<RecordingTransport> {
        let shared = Arc::new(SharedState::new());
        let grid = OccupancyGrid::new(4, 2, Vector2::new(-4.0, -1.0), &[0; 8], 50).unwrap();
        shared.ingest_map(grid);
        shared.request_goal(Vector2::new(-2.0, 0.0)).unwrap();
        let executor = TrajectoryExecutor::new(Box::new(AStarPlanner::new(0)), 2.5, None);
        Node::new(shared, executor, transport, 50.0).unwrap()
    }

    #[test]
    fn rejects_invalid_rate() {
        for rate_hz in [0.0, -3.0, f32::NAN, f32::INFINITY, 1e-39, 1e10] {
            let executor = TrajectoryExecutor::new(Box::new(AStarPlanner::new(1)), 2.5, None);
            let shared = Arc::new(SharedState::new());
            assert!(
                matches!(
                    Node::new(shared, executor, LogTransport, rate_hz),
                    Err(NavigationError::OtherError(_))
                ),
                "rate {} accepted",
                rate_hz
            );
        }
    }

    #[test]
    fn period_follows_rate() {
        let executor = TrajectoryExecutor::new(Box::new(AStarPlanner::new(1)), 2.5, None);
        let shared = Arc::new(SharedState::new());
        let node = Node::new(shared, executor, LogTransport, 4.0).unwrap();
        assert_eq!(node.period(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn publishes_trajectory_before_target() -> Result<(), NavigationError> {
        let mut node = node_with(RecordingTransport::default());
        // Vehicle starts at cell (0, 1), the goal is cell (2, 1)
        let planned = node.tick().await?;
        assert!(planned.trajectory.is_none());
        assert!(node.transport().calls.is_empty());

        node.tick().await?;
        let calls = &node.transport().calls;
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("trajectory"));
        assert!(calls[1].starts_with("target"));
        Ok(())
    }

    #[tokio::test]
    async fn tick_reports_transport_errors() {
        let mut node = node_with(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        assert!(node.tick().await.is_ok());
        assert!(matches!(
            node.tick().await,
            Err(NavigationError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn run_ends_on_transport_error() {
        let mut node = node_with(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let result = node.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(NavigationError::Transport(_))));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() -> Result<(), NavigationError> {
        let mut node = node_with(RecordingTransport::default());
        node.run(tokio::time::sleep(Duration::from_millis(200)))
            .await?;
        assert!(!node.transport().calls.is_empty());
        Ok(())
    }
}
