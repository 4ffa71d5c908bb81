pub mod average;
pub mod config;
pub mod scan;
pub mod stats;
pub mod trace;
