//! HTTP and SSE surface. Route filters only translate between warp and the
//! service functions in [`handlers`]; session logic lives in
//! `session_management`.

pub mod app_state;
pub mod handlers;
pub mod routes;
pub mod types;
pub mod web_server;

pub use app_state::AppState;
pub use web_server::{bind_address, WebServer};
