//! Storage Adapters
//!
//! Implementations of the SessionStore port.
//!
//! - **InMemorySessionStore** - Keeps sessions in memory (driver binary, tests)

mod in_memory_session_store;

pub use in_memory_session_store::InMemorySessionStore;
