//! Avatar payload decoding
//!
//! Clients send avatars as `data:` URIs, the form a browser produces with
//! `FileReader.readAsDataURL`:
//!
//! ```text
//! data:image/png;base64,iVBORw0KGgo...
//! ```

use base64::{Engine as _, engine::general_purpose};

use crate::error::AppError;

pub const INVALID_AVATAR_MESSAGE: &str = "Invalid avatar image";
pub const AVATAR_TOO_LARGE_MESSAGE: &str = "Avatar image is too large";

/// A decoded avatar ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarImage {
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

impl AvatarImage {
    /// Decode a `data:image/...;base64,...` URI
    ///
    /// # Errors
    /// `AppError::Validation` for anything that is not a supported,
    /// non-empty, base64 image within `max_bytes`.
    pub fn from_data_uri(uri: &str, max_bytes: usize) -> Result<Self, AppError> {
        let invalid = || AppError::Validation(INVALID_AVATAR_MESSAGE.to_string());

        let rest = uri.trim().strip_prefix("data:").ok_or_else(invalid)?;
        let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;

        let mut params = header.split(';');
        let mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
            return Err(invalid());
        }
        let content_type = canonical_content_type(&mime).ok_or_else(invalid)?;

        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

        // base64 inflates by 4/3; reject before decoding a huge body
        if compact.len() / 4 * 3 > max_bytes + 3 {
            return Err(AppError::Validation(AVATAR_TOO_LARGE_MESSAGE.to_string()));
        }

        let data = general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| invalid())?;

        if data.is_empty() {
            return Err(invalid());
        }
        if data.len() > max_bytes {
            return Err(AppError::Validation(AVATAR_TOO_LARGE_MESSAGE.to_string()));
        }

        Ok(Self { content_type, data })
    }

    /// File extension for the stored object
    pub fn extension(&self) -> &'static str {
        match self.content_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

fn canonical_content_type(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/png" => Some("image/png"),
        "image/webp" => Some("image/webp"),
        "image/gif" => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_KIB: usize = 1024;

    fn data_uri(mime: &str, bytes: &[u8]) -> String {
        format!(
            "data:{};base64,{}",
            mime,
            general_purpose::STANDARD.encode(bytes)
        )
    }

    fn validation_message(error: AppError) -> String {
        match error {
            AppError::Validation(message) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn decodes_png_data_uri() {
        let avatar =
            AvatarImage::from_data_uri(&data_uri("image/png", b"\x89PNG fake"), ONE_KIB).unwrap();
        assert_eq!(avatar.content_type, "image/png");
        assert_eq!(avatar.data, b"\x89PNG fake");
        assert_eq!(avatar.extension(), "png");
    }

    #[test]
    fn normalizes_jpg_alias_and_case() {
        let avatar = AvatarImage::from_data_uri(&data_uri("IMAGE/JPG", b"jpeg"), ONE_KIB).unwrap();
        assert_eq!(avatar.content_type, "image/jpeg");
        assert_eq!(avatar.extension(), "jpg");
    }

    #[test]
    fn rejects_non_image_and_plain_strings() {
        for input in [
            data_uri("text/plain", b"hello"),
            data_uri("image/svg+xml", b"<svg/>"),
            "https://example.com/avatar.png".to_string(),
            "data:image/png,rawbytes".to_string(),
            "data:image/png;base64".to_string(),
            "data:image/png;base64,@@@".to_string(),
            "data:image/png;base64,".to_string(),
        ] {
            let error = AvatarImage::from_data_uri(&input, ONE_KIB).unwrap_err();
            assert_eq!(validation_message(error), INVALID_AVATAR_MESSAGE, "{input}");
        }
    }

    #[test]
    fn rejects_oversized_payload() {
        let uri = data_uri("image/png", &vec![7_u8; ONE_KIB + 1]);
        let error = AvatarImage::from_data_uri(&uri, ONE_KIB).unwrap_err();
        assert_eq!(validation_message(error), AVATAR_TOO_LARGE_MESSAGE);
    }

    #[test]
    fn accepts_payload_at_limit() {
        let uri = data_uri("image/gif", &vec![7_u8; ONE_KIB]);
        let avatar = AvatarImage::from_data_uri(&uri, ONE_KIB).unwrap();
        assert_eq!(avatar.data.len(), ONE_KIB);
    }

    #[test]
    fn accepts_line_wrapped_payload_at_limit() {
        let encoded = general_purpose::STANDARD.encode(vec![7_u8; ONE_KIB]);
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        let uri = format!("data:image/png;base64,{wrapped}");

        let avatar = AvatarImage::from_data_uri(&uri, ONE_KIB).unwrap();
        assert_eq!(avatar.data.len(), ONE_KIB);
    }
}
