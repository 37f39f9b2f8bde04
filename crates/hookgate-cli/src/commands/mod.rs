//! CLI command implementations for hookgate.

pub mod check;
pub mod hook;
pub mod init;
pub mod logs;
pub mod rules;
