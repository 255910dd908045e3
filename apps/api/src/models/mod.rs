pub mod sponsor;
pub mod user;
