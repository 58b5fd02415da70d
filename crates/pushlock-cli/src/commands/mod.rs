pub mod challenge;
pub mod config;
mod trace;
