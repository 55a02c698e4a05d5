//! toolgated - tool-execution service
//!
//! Guards every side-effecting call to the supervisor API behind its own
//! confirm handshake.

pub mod backend;
pub mod executor;
pub mod gate;
pub mod middleware;
pub mod routes;
pub mod server;

pub use backend::{ApiBackend, ApiResponse, BackendError, HttpApiBackend};
pub use gate::ToolGate;
