//! HTTP chat API, health check and static chat page.

mod error;
mod handlers;
mod limiter;
mod router;
mod server;

pub use error::GatewayError;
pub use server::GatewayServer;
