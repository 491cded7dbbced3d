pub mod app;
pub mod aws;
pub mod config;
pub mod duration;
pub mod exec;
#[cfg(feature = "cli")]
pub mod logging;
pub mod profile;
pub mod resolver;
pub mod retry;
pub mod rotate;
