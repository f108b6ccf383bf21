pub mod db;
pub mod image;
pub mod security;
pub mod session;
pub mod sqlx_utils;
pub mod storage;
#[cfg(test)]
pub mod test_utils;
pub mod utils;
