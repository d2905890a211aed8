// src/config/mod.rs
pub mod app;
pub mod locations;

pub use app::{AppConfig, Endpoints};
pub use locations::{default_location, find_location, resolve_location, Location, LOCATIONS};
