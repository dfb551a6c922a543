pub mod parser;
pub mod types;

pub use parser::{ParsedLine, parse_line};
pub use types::{Channel, RawCode, TimeMode, build_command, raw_code_from_reply};
