pub mod form;
pub mod presets;
pub mod render;
