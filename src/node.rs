//! Node: loads the published route artifact and serves the mutated
//! surface.

pub mod loader;
pub mod server;

pub use loader::NodeLoader;
pub use server::{DispatchTable, NodeService, run_reload_loop, serve};
