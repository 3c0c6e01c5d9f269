//! Database module for takeout
//!
//! This module handles all database operations using SQLx with SQLite.
//! The server database holds users and per-user state; each media
//! collection has its own catalogue database.

mod engine;
mod migrations;
pub mod tables;

pub use engine::{DbEngine, Schema};
pub use tables::*;
