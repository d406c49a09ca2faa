pub mod cell;
pub mod clock;
pub mod config;
pub mod grid;
pub mod monitor;
pub mod presets;
pub mod publisher;
pub mod resolver;
pub mod types;
