use std::sync::atomic::{AtomicBool, Ordering};

/// Latest "at current waypoint" signal, stored verbatim
///
/// The flag is level triggered: it is never reset here, the executor re-reads it every cycle.
/// # Example
/// ```
/// use peng_waypoint::ArrivalMonitor;
/// let monitor = ArrivalMonitor::new();
/// assert!(!monitor.at_waypoint());
/// monitor.set(true);
/// assert!(monitor.at_waypoint());
/// assert!(monitor.at_waypoint());
/// ```
#[derive(Debug, Default)]
pub struct ArrivalMonitor {
    at_waypoint: AtomicBool,
}

impl ArrivalMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, at_waypoint: bool) {
        self.at_waypoint.store(at_waypoint, Ordering::SeqCst);
    }

    pub fn at_waypoint(&self) -> bool {
        self.at_waypoint.load(Ordering::SeqCst)
    }
}
