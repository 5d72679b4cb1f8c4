//! Main module for tagql library functionality

pub mod extract;
pub mod filter;
pub mod parsing;
pub mod pipeline;
pub mod runner;
pub mod schema;
pub mod transforms;
pub mod watch;
