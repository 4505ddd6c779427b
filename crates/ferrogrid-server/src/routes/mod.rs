pub mod config;
pub mod dispatch;
pub mod events;
pub mod health;
pub mod magnets;
