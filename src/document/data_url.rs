use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::Result;

/// Encode raw bytes the way uploaded documents are stored.
pub fn encode(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

/// Decode stored document content. `data:` URLs yield their payload, anything
/// else is taken as literal text.
pub fn decode(content: &str) -> Result<Vec<u8>> {
    let Some(rest) = content.strip_prefix("data:") else {
        return Ok(content.as_bytes().to_vec());
    };
    let Some((header, payload)) = rest.split_once(',') else {
        return Ok(Vec::new());
    };
    if header.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        Ok(STANDARD.decode(compact)?)
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_content_decodes_back() {
        let url = encode("text/plain", "Frações equivalentes".as_bytes());
        assert!(url.starts_with("data:text/plain;base64,"));
        assert_eq!(decode(&url).unwrap(), "Frações equivalentes".as_bytes());
    }

    #[test]
    fn raw_text_passes_through() {
        assert_eq!(decode("just text").unwrap(), b"just text");
    }

    #[test]
    fn invalid_base64_is_an_error() {
        assert!(decode("data:text/plain;base64,@@@").is_err());
    }
}
