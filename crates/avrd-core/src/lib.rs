pub mod errors;
pub mod events;
pub mod properties;
pub mod settle;

pub use errors::{AvrError, DecodeError};
pub use events::DeviceEvent;
pub use settle::SettleCell;
