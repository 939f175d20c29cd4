#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod game;
pub mod messaging;
pub mod models;
pub mod providers;

pub use config::ArenaConfig;
pub use errors::{GameError, Result};
pub use game::{GameEngine, StartGame};
