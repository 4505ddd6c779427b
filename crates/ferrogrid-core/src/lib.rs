pub mod actuator;
pub mod command;
pub mod config;
pub mod error;
pub mod grid;
pub mod pwm;
pub mod types;

pub use error::{FerroError, Result};
