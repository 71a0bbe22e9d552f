//! Transport layer module.

pub mod mock;
pub mod network;
pub mod traits;

pub use mock::MockTransport;
pub use network::NetworkTransport;
pub use traits::{ControllerTransport, TransportError};
