//! Soulvan heist-racing simulation core: vehicle dynamics, AI decision
//! making, tension direction and a websocket telemetry bridge.

pub mod ai;
pub mod config;
pub mod curve;
pub mod error;
pub mod events;
pub mod net;
pub mod physics;
pub mod state;
pub mod suspension_contact;
pub mod vehicle;
pub mod world;

pub use error::{SimError, SimResult};
pub use world::{HeistWorld, WorldSettings};
