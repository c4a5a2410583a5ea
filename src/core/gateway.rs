//! Gateway: pingora service, shared state, rotation task.

pub mod response;
pub mod rotation;
pub mod service;
pub mod state;

pub use rotation::run_rotation_loop;
pub use service::{ChameleonGateway, RequestCtx};
pub use state::GatewayState;
