pub mod render;

pub use render::{Layout, SkiaDisplay, render_text_pixmap};
