pub mod screens;
pub mod session;
pub mod wizard;
