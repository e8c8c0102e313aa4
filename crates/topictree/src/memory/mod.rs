//! In-memory notification source.
//!
//! Simulates the selection semantics of a remote topic namespace so a walk
//! can run without a server: selected topics get topic notifications, and
//! the nearest topics below a selected path get descendant notifications.

mod namespace;
mod registration;

pub use namespace::{MemoryNamespace, MemoryRegistration, SelectionRequest};
pub use registration::RegistrationEntry;
