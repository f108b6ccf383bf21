pub mod gender;
pub mod user_profile;
