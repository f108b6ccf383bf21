pub mod auth;
pub mod common;
pub mod user_profile;
