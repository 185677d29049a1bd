pub mod route;
pub mod view;
