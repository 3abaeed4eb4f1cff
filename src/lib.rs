pub mod api;
pub mod app;
pub mod audio;
pub mod channel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod global;
pub mod logs;
pub mod recorder;
