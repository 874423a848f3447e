pub mod lifecycle;
pub mod render;
