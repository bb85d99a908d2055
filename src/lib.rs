// src/lib.rs

//! USA Cycling legacy results client library

pub mod error;
pub mod fetch;
pub mod models;
pub mod parsers;
pub mod services;
pub mod utils;

pub use services::UsaCyclingClient;
