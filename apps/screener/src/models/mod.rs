pub mod batch;
pub mod document;
pub mod profile;
