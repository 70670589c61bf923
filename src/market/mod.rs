pub mod loader;
pub mod returns;
