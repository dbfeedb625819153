//! Output boundaries: the JSON document model and plain text.

mod json;
mod text;

pub use json::{from_json, to_json, JsonFormat};
pub use text::to_text;
