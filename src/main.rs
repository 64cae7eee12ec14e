use std::sync::Arc;

use nalgebra::Point3;
use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use tracing_subscriber::EnvFilter;

use soulvan_sim::config::SimConfig;
use soulvan_sim::error::SimError;
use soulvan_sim::net;
use soulvan_sim::state::VehicleRole;
use soulvan_sim::vehicle::profile::VehicleProfile;
use soulvan_sim::world::HeistWorld;

#[tokio::main]
async fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = SimConfig::from_env();
    tracing::info!(?config, "starting soulvan server");

    let player_profile = config.player_profile()?;
    let mut world = HeistWorld::new(config.world_settings());

    let rival_profile = Arc::new(VehicleProfile::street_racer());
    for i in 0..config.rivals {
        let x = -6.0 - 6.0 * i as f32;
        world.spawn_vehicle(VehicleRole::Rival, Arc::clone(&rival_profile), Point3::new(x, 0.0, 10.0));
    }
    let police_profile = Arc::new(VehicleProfile::interceptor());
    for i in 0..config.police {
        let x = 8.0 * i as f32;
        world.spawn_vehicle(VehicleRole::Police, Arc::clone(&police_profile), Point3::new(x, 0.0, -60.0));
    }

    let world = Arc::new(Mutex::new(world));
    let listener = net::bind(&config.bind_addr).await?;
    tokio::spawn(net::serve(listener, Arc::clone(&world), player_profile));

    let dt = config.dt();
    let mut ticker = interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        world.lock().await.step(dt);
    }
}
