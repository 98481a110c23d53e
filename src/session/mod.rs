// Connected editor sessions and the broadcast path to them.

pub mod hub;
pub mod registry;

pub use hub::{BroadcastHub, DeliveryReport, ServerMessage};
pub use registry::{ConnectionRegistry, Frame, SessionHandle, SessionRole};
