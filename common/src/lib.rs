pub mod config;
pub mod error;
pub mod host;
pub mod network;
pub mod system;
pub mod utils;
pub mod vendors;
