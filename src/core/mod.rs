//! Catalogue logic shared by the routes and the scheduler

pub mod activity;
pub mod media;
pub mod music;
pub mod playlists;
pub mod progress;
pub mod resolver;
pub mod scheduler;
pub mod sync;
pub mod views;

pub use media::{Media, MediaRegistry};
pub use resolver::Resolver;
pub use scheduler::{Job, Scheduler};
