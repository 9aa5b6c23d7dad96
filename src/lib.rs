pub mod app;
pub mod backend;
pub mod config;
pub mod runtime;
pub mod shared;
pub mod tui;
pub mod wizard;
