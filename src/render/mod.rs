//! Tray glyph rendering

mod glyph;

pub use glyph::{GlyphImage, GlyphRenderer, RenderError};
