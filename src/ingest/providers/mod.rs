// src/ingest/providers/mod.rs
pub mod energy;
pub mod market;
pub mod news;
pub mod weather;
