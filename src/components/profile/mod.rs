pub mod bootstrap;
pub mod editor;
pub mod page;
pub mod route;
pub mod view;
