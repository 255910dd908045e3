pub mod catalog;
pub mod format;
pub mod handlers;
pub mod metrics;
pub mod repository;
pub mod seed;
