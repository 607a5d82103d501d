pub mod config;
pub mod wav;
