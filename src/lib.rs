pub mod cli;
pub mod config;
pub mod device;
pub mod escape;
pub mod logging;
pub mod relay;
pub mod session;
pub mod terminal;
