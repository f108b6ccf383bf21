pub mod error;
pub mod form;
pub mod principal;
pub mod profile_edit;
