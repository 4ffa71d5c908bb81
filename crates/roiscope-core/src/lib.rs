pub mod catalog;
pub mod config;
pub mod consts;
pub mod error;
pub mod expr;
pub mod frame;
pub mod io;
pub mod progress;
pub mod roi;
pub mod selector;
pub mod session;
pub mod statistics;
pub mod trace;
