pub mod clock;
pub mod config;
pub mod persist;
pub mod session;
pub mod sim;
