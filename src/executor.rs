//! Trajectory executor
//!
//! The executor is the only owner of the active trajectory. Once per control cycle it either
//! tries to plan (no active plan) or drives the vehicle one waypoint at a time (executing),
//! advancing only on cycles where the arrival flag is raised.
use crate::goal::Goal;
use crate::map::{MapSnapshot, Position};
use crate::planners::PathSearch;
use crate::sync::SharedState;
use nalgebra::Vector3;
use std::collections::VecDeque;

/// Altitude of every published target
pub const DEFAULT_TARGET_ALTITUDE: f32 = 2.5;

/// Planning state of the executor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanState {
    /// Waiting for a map, a vehicle position and a goal, or retrying a failed search
    NoPlan,
    /// Feeding waypoints to the vehicle
    Executing,
}

/// Why an active plan was dropped before completion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalidation {
    /// A new map superseded the one the plan was computed on
    NewMap,
    /// The goal was cleared or replaced
    GoalCleared,
}

/// State machine transitions reported by a single cycle
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutorEvent {
    Invalidated(Invalidation),
    Planned { waypoints: usize },
    PlanNotFound { attempts: u32 },
    GoalAbandoned { goal: Position },
    Advanced { remaining: usize },
    Completed { goal: Position },
}

/// Outbound signals and events produced by one control cycle
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cycle {
    /// Full remaining trajectory in world coordinates, present only when it changed
    pub trajectory: Option<Vec<Position>>,
    /// Immediate target for the vehicle
    pub target: Option<Vector3<f32>>,
    /// Transitions taken during the cycle
    pub events: Vec<ExecutorEvent>,
}

struct ActivePlan {
    goal: Goal,
    waypoints: VecDeque<Position>,
}

/// Consecutive search failures for one (map epoch, goal generation) pair
#[derive(Default)]
struct FailureCount {
    key: Option<(u64, u64)>,
    attempts: u32,
}

/// Plans towards the held goal and executes the resulting trajectory
/// # Example
/// ```
/// use nalgebra::Vector2;
/// use peng_waypoint::{AStarPlanner, OccupancyGrid, PlanState, SharedState, TrajectoryExecutor};
/// let shared = SharedState::new();
/// let grid = OccupancyGrid::new(10, 3, Vector2::new(-10.0, -3.0), &[0; 30], 50).unwrap();
/// shared.ingest_map(grid);
/// shared.request_goal(Vector2::new(-5.0, -3.0)).unwrap();
/// let mut executor = TrajectoryExecutor::new(Box::new(AStarPlanner::new(1)), 2.5, Some(5));
/// executor.step(&shared);
/// assert_eq!(executor.state(), PlanState::Executing);
/// let cycle = executor.step(&shared);
/// assert_eq!(cycle.target.map(|t| t.z), Some(2.5));
/// ```
pub struct TrajectoryExecutor {
    planner: Box<dyn PathSearch>,
    target_altitude: f32,
    max_failed_attempts: Option<u32>,
    plan: Option<ActivePlan>,
    vehicle: Option<Position>,
    map_epoch: Option<u64>,
    last_published: Option<Vec<Position>>,
    target_sent: bool,
    failures: FailureCount,
}

impl TrajectoryExecutor {
    /// Create a new executor around a path search engine
    /// # Arguments
    /// * `planner` - The path search engine
    /// * `target_altitude` - Altitude attached to every target
    /// * `max_failed_attempts` - Consecutive not-found results after which the goal is
    ///   abandoned, `None` retries forever
    pub fn new(
        planner: Box<dyn PathSearch>,
        target_altitude: f32,
        max_failed_attempts: Option<u32>,
    ) -> Self {
        Self {
            planner,
            target_altitude,
            max_failed_attempts,
            plan: None,
            vehicle: None,
            map_epoch: None,
            last_published: None,
            target_sent: false,
            failures: FailureCount::default(),
        }
    }

    pub fn state(&self) -> PlanState {
        if self.plan.is_some() {
            PlanState::Executing
        } else {
            PlanState::NoPlan
        }
    }

    /// Tracked vehicle cell, grid-local
    pub fn vehicle(&self) -> Option<Position> {
        self.vehicle
    }

    /// Waypoints not yet reached, world coordinates
    pub fn remaining(&self) -> Vec<Position> {
        self.plan
            .as_ref()
            .map(|plan| plan.waypoints.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Run one control cycle against the latest shared state
    /// # Arguments
    /// * `shared` - Map, goal and arrival state
    /// # Returns
    /// * The signals to publish and the transitions taken
    pub fn step(&mut self, shared: &SharedState) -> Cycle {
        let mut cycle = Cycle::default();
        let map = shared.map.snapshot();
        if let Some(map) = &map {
            if self.map_epoch != Some(map.epoch) {
                if self.plan.take().is_some() {
                    log::info!("Map epoch {} received, dropping current plan", map.epoch);
                    cycle
                        .events
                        .push(ExecutorEvent::Invalidated(Invalidation::NewMap));
                }
                self.map_epoch = Some(map.epoch);
                self.vehicle = Some(map.vehicle);
            }
        }

        let goal = shared.goals.current();
        let held = goal.map(|g| g.generation);
        if self
            .plan
            .as_ref()
            .is_some_and(|plan| held != Some(plan.goal.generation))
        {
            log::info!("Goal cleared, dropping current plan");
            self.plan = None;
            cycle
                .events
                .push(ExecutorEvent::Invalidated(Invalidation::GoalCleared));
        }

        if self.plan.is_some() {
            self.execute(shared, &mut cycle);
        } else if let (Some(map), Some(goal)) = (map, goal) {
            self.try_plan(shared, &map, goal, &mut cycle);
        }
        cycle
    }

    fn try_plan(
        &mut self,
        shared: &SharedState,
        map: &MapSnapshot,
        goal: Goal,
        cycle: &mut Cycle,
    ) {
        let Some(vehicle) = self.vehicle else {
            return;
        };
        log::info!("Planning trajectory from {} to {}", vehicle, goal.position);
        match self.planner.plan(&map.grid, vehicle, goal.position) {
            Some(path) if !path.is_empty() => {
                let waypoints: VecDeque<Position> =
                    path.into_iter().map(|p| map.grid.to_world(p)).collect();
                log::info!("Executing trajectory with {} waypoints", waypoints.len());
                log::debug!("Trajectory: {:?}", waypoints);
                cycle.events.push(ExecutorEvent::Planned {
                    waypoints: waypoints.len(),
                });
                self.plan = Some(ActivePlan { goal, waypoints });
                self.last_published = None;
                self.target_sent = false;
                self.failures = FailureCount::default();
            }
            _ => {
                let key = (map.epoch, goal.generation);
                if self.failures.key != Some(key) {
                    self.failures = FailureCount {
                        key: Some(key),
                        attempts: 0,
                    };
                }
                self.failures.attempts += 1;
                let attempts = self.failures.attempts;
                log::warn!(
                    "Trajectory to {} not found (attempt {}), try another goal",
                    goal.position,
                    attempts
                );
                cycle.events.push(ExecutorEvent::PlanNotFound { attempts });
                if self.max_failed_attempts.is_some_and(|max| attempts >= max) {
                    if shared.goals.clear_if(goal.generation) {
                        log::warn!(
                            "Abandoning goal {} after {} failed attempts",
                            goal.position,
                            attempts
                        );
                        cycle.events.push(ExecutorEvent::GoalAbandoned {
                            goal: goal.position,
                        });
                    }
                    self.failures = FailureCount::default();
                }
            }
        }
    }

    fn execute(&mut self, shared: &SharedState, cycle: &mut Cycle) {
        let arrived = shared.arrival.at_waypoint();
        let Some(plan) = self.plan.as_mut() else {
            return;
        };

        let remaining: Vec<Position> = plan.waypoints.iter().copied().collect();
        if self.last_published.as_ref() != Some(&remaining) {
            self.last_published = Some(remaining.clone());
            cycle.trajectory = Some(remaining);
        }

        if !arrived || !self.target_sent {
            if let Some(head) = plan.waypoints.front() {
                cycle.target = Some(Vector3::new(
                    head.x as f32,
                    head.y as f32,
                    self.target_altitude,
                ));
                self.target_sent = true;
            }
        } else {
            plan.waypoints.pop_front();
            self.target_sent = false;
            cycle.events.push(ExecutorEvent::Advanced {
                remaining: plan.waypoints.len(),
            });
        }

        if plan.waypoints.is_empty() && arrived {
            let goal = plan.goal;
            self.plan = None;
            self.vehicle = Some(goal.position);
            shared.goals.clear_if(goal.generation);
            log::info!("Reached goal {}", goal.position);
            cycle.events.push(ExecutorEvent::Completed {
                goal: goal.position,
            });
        }
    }
}
