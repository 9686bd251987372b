mod actions;
mod backends;
mod controller;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use backends::Backends;
pub use controller::TorchController;
pub use types::{ControllerStatus, ShutdownReason};
