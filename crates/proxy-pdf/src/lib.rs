//! Proxy sheet PDF output

mod images;
mod render;
mod types;

pub use images::{flatten_on_white, load_default_back, load_default_back_blocking};
pub use render::{footer_text, generate_pdf, generate_pdf_bytes};
pub use types::*;
