//! Infrastructure layer
//!
//! Implementations for external concerns: the Postgres cache backend and the
//! tracing subscriber.

pub mod database;
pub mod log_messages;
pub mod logging;

pub use database::PostgresCacheStore;
pub use logging::init_tracing;
