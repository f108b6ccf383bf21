pub mod auth;
#[cfg(test)]
mod auth_test;
pub mod user_profile;
