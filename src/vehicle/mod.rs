//! vehicle - engine-agnostic drivetrain, aero and wear model (pure types + simulator)

pub mod aero;
pub mod arcade;
pub mod body;
pub mod drivetrain;
pub mod engine;
pub mod profile;
pub mod simulator;
pub mod state;
pub mod wear;

pub use body::{PhysicsBody, WheelContact, WheelSlip};
pub use profile::{Drivetrain, VehicleProfile};
pub use simulator::{TickReport, VehicleSimulator};
pub use state::{ControlInput, VehicleState, WheelId};
