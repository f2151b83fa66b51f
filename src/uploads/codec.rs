//! Base64 encoding of upload content.
//!
//! Encoding is lossless: `decode(&encode(b)) == b` for every buffer. Content
//! bytes are never transformed, only wrapped.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Encoding task failed: {0}")]
    Task(String),
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode stored content. A `data:<mime>;base64,` prefix is tolerated.
pub fn decode(encoded: &str) -> Result<Vec<u8>, CodecError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    Ok(STANDARD.decode(payload.trim())?)
}

/// Encode on the blocking pool
pub async fn encode_off_thread(bytes: Arc<[u8]>) -> Result<String, CodecError> {
    tokio::task::spawn_blocking(move || encode(&bytes))
        .await
        .map_err(|e| CodecError::Task(e.to_string()))
}

/// Decode on the blocking pool
pub async fn decode_off_thread(encoded: String) -> Result<Vec<u8>, CodecError> {
    tokio::task::spawn_blocking(move || decode(&encoded))
        .await
        .map_err(|e| CodecError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_byte_values() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4099).collect();
        assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_round_trip_empty_and_non_utf8() {
        assert_eq!(decode(&encode(&[])).unwrap(), Vec::<u8>::new());

        let not_text = [0xff, 0xfe, 0x00, 0x0d, 0x0a, 0x80];
        assert_eq!(decode(&encode(&not_text)).unwrap(), not_text);
    }

    #[test]
    fn test_decode_accepts_data_url() {
        let encoded = format!("data:application/pdf;base64,{}", encode(b"%PDF-1.7"));
        assert_eq!(decode(&encoded).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not base64!!"), Err(CodecError::Base64(_))));
    }

    #[tokio::test]
    async fn test_off_thread_round_trip() {
        let bytes: Arc<[u8]> = Arc::from(&b"chapter one"[..]);
        let encoded = encode_off_thread(Arc::clone(&bytes)).await.unwrap();
        let decoded = decode_off_thread(encoded).await.unwrap();
        assert_eq!(&decoded[..], &bytes[..]);
    }
}
