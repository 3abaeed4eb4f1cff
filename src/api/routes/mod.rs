//! API route modules.

pub mod commands;
pub mod logs;
pub mod recorder;
pub mod recordings;

#[cfg(test)]
pub(crate) mod testing;
