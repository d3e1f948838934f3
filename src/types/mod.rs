pub mod activity;
pub mod palette;
pub mod route;
