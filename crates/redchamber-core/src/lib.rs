//! redchamber-core
//!
//! Domain types, configuration, corpus loading and sentence-bounded chunking
//! shared by the text, vector and engine crates.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod answer;
pub mod chunker;
pub mod config;
pub mod corpus;
pub mod error;
pub mod traits;
pub mod types;
