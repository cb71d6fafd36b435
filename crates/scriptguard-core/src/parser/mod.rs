pub mod document;
pub mod github;
