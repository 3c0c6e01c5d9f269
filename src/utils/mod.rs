//! Utility modules

pub mod dates;
pub mod hashing;
pub mod parsers;
