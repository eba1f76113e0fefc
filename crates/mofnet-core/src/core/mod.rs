//! # Core Module
//!
//! Data structures the net layer is built on: the periodic atom graph
//! ([`models`]) and small geometric helpers ([`utils`]).

pub mod models;
pub mod utils;
