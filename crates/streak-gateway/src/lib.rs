//! STREAK Remote Session Gateway
//!
//! Four calls against the timer service: history, active session, start and
//! end. Every call is credentialed. An unauthenticated response is reported
//! as its own error variant so callers can tell it apart from an outage.

mod error;
mod gateway;
mod http;

pub use error::GatewayError;
pub use gateway::SessionGateway;
pub use http::{GatewayConfig, HttpGateway};

pub type Result<T> = std::result::Result<T, GatewayError>;
