pub mod string_util;

pub use string_util::{StripCodeBlock, char_len, excerpt, truncate_word_safe};
