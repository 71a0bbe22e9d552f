//! Controller protocol: framing, keywords and inbound messages.

pub mod constants;
pub mod framing;
pub mod message;

pub use constants::*;
pub use framing::{frame_control, frame_program, unframe_program};
pub use message::InboundMessage;
