//! The sqlsift controller: configuration, input, scheduling and output.

pub mod config;
pub mod discovery;
pub mod dump;
pub mod output;
pub mod run;

pub use sqlsift_core::prelude;
