//! Client for a WLED lighting controller: builders that assemble the
//! controller's JSON state packets and an HTTP client that pushes them.

pub mod builder;
pub mod client;

pub use builder::{effect_index, Segment, StateUpdate, EFFECTS};
pub use client::{WledClient, WledError};
