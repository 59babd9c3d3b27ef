pub mod config;
pub mod reconstruct;
