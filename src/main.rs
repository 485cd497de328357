use nalgebra::Vector2;
use peng_waypoint::config::Config;
use peng_waypoint::environment::MapGenerator;
use peng_waypoint::*;
use std::sync::Arc;
use std::time::Duration;

/// Requests the mission goals one after another, retrying each until it is admitted
async fn feed_goals(shared: Arc<SharedState>, goals: Vec<[f32; 2]>, retry: Duration) {
    for goal in goals {
        let world = Vector2::new(goal[0], goal[1]);
        loop {
            match shared.request_goal(world) {
                Ok(GoalAdmission::Accepted(cell)) => {
                    log::info!("Goal ({}, {}) accepted as cell {}", goal[0], goal[1], cell);
                    break;
                }
                Ok(GoalAdmission::Pending) => {
                    log::debug!("Goal ({}, {}) pending", goal[0], goal[1]);
                }
                Err(e) => log::warn!("Goal ({}, {}) rejected: {}", goal[0], goal[1], e),
            }
            tokio::time::sleep(retry).await;
        }
    }
    log::info!("All mission goals submitted");
}

fn seconds(value: f32, name: &str) -> Result<Duration, NavigationError> {
    Duration::try_from_secs_f32(value)
        .map_err(|e| NavigationError::OtherError(format!("Invalid {}: {}", name, e)))
}

#[tokio::main]
/// Main function for a simulated waypoint run
async fn main() -> Result<(), NavigationError> {
    env_logger::builder()
        .parse_env(env_logger::Env::default().default_filter_or("info"))
        .init();
    let mut config_str = "config/nav.yaml";
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        log::warn!("Usage: {} <config.yaml>.", args[0]);
        log::warn!("Loading default configuration: {}", config_str);
    } else {
        log::info!("Loading configuration: {}", args[1]);
        config_str = &args[1];
    }
    let config = Config::from_yaml(config_str)?;
    let retry = seconds(config.mission.goal_retry_interval, "goal retry interval")?;
    let duration = config
        .mission
        .duration
        .map(|d| seconds(d, "mission duration"))
        .transpose()?;

    let shared = Arc::new(SharedState::new());
    let mut generator = MapGenerator::from_config(&config.map);
    let grid =
        generator.generate_grid(config.map.num_obstacles, config.planner.occupied_threshold)?;
    log::info!(
        "Generated {}x{} map with {} obstacles, vehicle at cell {}",
        grid.width(),
        grid.height(),
        generator.obstacles.len(),
        grid.initial_vehicle_position()
    );
    shared.ingest_map(grid);

    let planner = AStarPlanner::new(config.planner.safety_margin)
        .with_diagonal(config.planner.allow_diagonal);
    let executor = TrajectoryExecutor::new(
        Box::new(planner),
        config.control.target_altitude,
        config.planner.max_failed_attempts,
    );
    let vehicle = SimulatedVehicle::new(shared.clone(), config.vehicle.ticks_per_waypoint);
    let mut node = Node::new(shared.clone(), executor, vehicle, config.control.rate_hz)?;

    let feeder = tokio::spawn(feed_goals(
        shared.clone(),
        config.mission.goals.clone(),
        retry,
    ));
    let shutdown = async move {
        match duration {
            Some(duration) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = tokio::time::sleep(duration) => log::info!("Mission duration elapsed"),
                }
            }
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for ctrl-c: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        }
    };
    let result = node.run(shutdown).await;
    feeder.abort();
    if let Err(e) = result {
        log::error!("Control loop failed: {}", e);
        return Err(e);
    }
    log::info!(
        "Reached {} waypoints, final position {:?}",
        node.transport().reached().len(),
        node.transport().position()
    );
    Ok(())
}
