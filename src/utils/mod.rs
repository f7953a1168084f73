pub mod error;
pub mod logging;
pub mod text;

pub use error::*;
pub use text::{escape_html, mask_secret, truncate_safe};
