//! Gateway host: configuration, logging, FNE transport, and wiring.
//!
//! The daemon composes the ZelloLink crates into one process: a
//! [`zellolink_zello_core::ZelloSession`] on one side, a UDP FNE peer on
//! the other, and the [`zellolink_bridge_core::CallBridge`] between them.
//! One event loop drains all three event sources so bridge state is never
//! shared across tasks.

pub mod config;
pub mod fne;
pub mod host;
pub mod logging;

pub use config::GatewayConfig;
pub use fne::UdpFnePeer;
pub use host::GatewayHost;
