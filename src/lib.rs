//! Interactive editor for typed rectangular regions laid over a template
//! image.

pub mod app;
pub mod controller;
pub mod geometry;
pub mod image_loader;
pub mod region;
pub mod registry;
pub mod render;
pub mod template;
pub mod viewport;
