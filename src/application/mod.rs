//! Application wiring and server lifecycle

pub mod app;

pub use app::Application;
