//! Goal registry with first-wins admission
//!
//! At most one goal is held at a time. Requests arriving while a goal is held are dropped, so
//! a goal can never be overwritten mid-execution; it has to be cleared first.
use crate::map::{world_to_grid, Position};
use nalgebra::Vector2;
use tokio::sync::watch;

/// A goal accepted by the registry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Goal {
    /// Goal cell in grid-local coordinates
    pub position: Position,
    /// Admission counter, unique per accepted goal
    pub generation: u64,
}

/// Outcome of a goal request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalAdmission {
    /// The goal was stored at this grid-local position
    Accepted(Position),
    /// Another goal is held, the request was discarded
    Pending,
}

#[derive(Default)]
struct Slot {
    goal: Option<Goal>,
    generation: u64,
}

/// Holds at most one pending or active goal
/// # Example
/// ```
/// use nalgebra::Vector2;
/// use peng_waypoint::{GoalAdmission, GoalRegistry, Position};
/// let registry = GoalRegistry::new();
/// let origin = Vector2::new(-10.0, -10.0);
/// assert_eq!(
///     registry.request(Vector2::new(2.0, 3.0), origin),
///     GoalAdmission::Accepted(Position::new(12, 13))
/// );
/// assert_eq!(registry.request(Vector2::new(0.0, 0.0), origin), GoalAdmission::Pending);
/// registry.clear();
/// assert!(registry.current().is_none());
/// ```
pub struct GoalRegistry {
    slot: watch::Sender<Slot>,
}

impl Default for GoalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalRegistry {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(Slot::default());
        Self { slot }
    }

    /// Request a new goal in world coordinates
    /// # Arguments
    /// * `world` - The requested goal in the world frame
    /// * `origin` - Origin of the current map
    /// # Returns
    /// * `Accepted` with the grid-local cell, or `Pending` if a goal is already held
    pub fn request(&self, world: Vector2<f32>, origin: Vector2<f32>) -> GoalAdmission {
        let position = world_to_grid(world, origin);
        let accepted = self.slot.send_if_modified(|slot| {
            if slot.goal.is_some() {
                return false;
            }
            slot.generation += 1;
            slot.goal = Some(Goal {
                position,
                generation: slot.generation,
            });
            true
        });
        if accepted {
            log::info!("Goal accepted at grid cell {}", position);
            GoalAdmission::Accepted(position)
        } else {
            log::debug!("Goal request {:?} discarded, a goal is pending", world);
            GoalAdmission::Pending
        }
    }

    /// Drop the held goal, if any
    pub fn clear(&self) {
        self.slot.send_if_modified(|slot| slot.goal.take().is_some());
    }

    /// Drop the held goal only if it is the one admitted with `generation`
    /// # Returns
    /// * `true` if a goal was cleared
    pub fn clear_if(&self, generation: u64) -> bool {
        self.slot.send_if_modified(|slot| match slot.goal {
            Some(goal) if goal.generation == generation => {
                slot.goal = None;
                true
            }
            _ => false,
        })
    }

    /// The held goal
    pub fn current(&self) -> Option<Goal> {
        self.slot.borrow().goal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_is_discarded() {
        let origin = Vector2::new(-5.0, -5.0);
        let both = GoalRegistry::new();
        both.request(Vector2::new(1.0, 1.0), origin);
        let admission = both.request(Vector2::new(-3.0, 4.0), origin);

        let first_only = GoalRegistry::new();
        first_only.request(Vector2::new(1.0, 1.0), origin);

        assert_eq!(admission, GoalAdmission::Pending);
        assert_eq!(both.current(), first_only.current());
    }

    #[test]
    fn rounds_to_nearest_cell() {
        let registry = GoalRegistry::new();
        let admission = registry.request(Vector2::new(1.6, -0.4), Vector2::new(0.5, -2.0));
        assert_eq!(admission, GoalAdmission::Accepted(Position::new(1, 2)));
    }

    #[test]
    fn clear_reopens_admission() {
        let registry = GoalRegistry::new();
        let origin = Vector2::zeros();
        registry.request(Vector2::new(1.0, 0.0), origin);
        registry.clear();
        assert_eq!(
            registry.request(Vector2::new(2.0, 0.0), origin),
            GoalAdmission::Accepted(Position::new(2, 0))
        );
        let goal = registry.current().unwrap();
        assert_eq!(goal.generation, 2);
    }

    #[test]
    fn clear_if_ignores_other_generations() {
        let registry = GoalRegistry::new();
        registry.request(Vector2::new(1.0, 0.0), Vector2::zeros());
        let generation = registry.current().unwrap().generation;
        assert!(!registry.clear_if(generation + 1));
        assert!(registry.current().is_some());
        assert!(registry.clear_if(generation));
        assert!(registry.current().is_none());
        assert!(!registry.clear_if(generation));
    }
}
