pub mod batch;
pub mod distance;
pub mod fetch;
pub mod parse;
pub mod render;
pub mod route;
pub mod summary;
pub mod upload;
