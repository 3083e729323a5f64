pub mod openai;
pub mod util;

pub use openai::OpenAi;
pub use util::{extract_json_object, strip_code_blocks, truncate_to_char_boundary};
