//! # Contracts
//!
//! Frozen interface contracts shared by every pipeline stage.
//! All business crates depend on this crate only, never on each other's
//! internals.
//!
//! ## Data Model
//! - `Frame`: one routed payload chunk travelling through the ring buffer
//! - `Route`: the (source, destination) pair a producer stamps on its frames
//! - `RunBlueprint`: immutable run configuration, validated before any task starts
//! - `ByteSource` / `ByteSink`: the collaborators at both ends of the pipeline

mod blueprint;
mod error;
mod frame;
mod sink;
mod source;

pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use sink::ByteSink;
pub use source::ByteSource;
