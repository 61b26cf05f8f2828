pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod model;
pub mod output;
pub mod parser;
pub mod scheduler;
pub mod stats;
