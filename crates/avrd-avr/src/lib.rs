pub mod bus;
pub mod cache;
pub mod correlator;
pub mod debounce;
pub mod decoder;
pub mod ops;
pub mod poller;
pub mod session;
pub mod subscription;

pub mod mock;

pub use bus::EventBus;
pub use cache::StatusCache;
pub use debounce::Debouncer;
pub use decoder::{FrameDecoder, FrameStream};
pub use ops::Avr;
pub use session::{CommandTransport, ConnectionState, Session};
pub use subscription::StreamSubscription;
