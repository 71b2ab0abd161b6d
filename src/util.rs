//! Small shared utilities: clock access, text decoding, cover format sniffing.

use std::borrow::Cow;

/// Current time as seconds since the Unix epoch.
pub fn time_now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Decode bytes to a string, handling various encodings.
///
/// Tries UTF-8 first (BOM handled by encoding_rs), then the hint encoding
/// from the XML declaration, then falls back to Windows-1252, which is the
/// usual culprit in old ebooks.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract encoding from an XML declaration (`<?xml ... encoding="..." ?>`).
///
/// Only the first ~100 bytes are checked.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    if after_enc.is_empty() {
        return None;
    }

    let quote = after_enc[0];
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// Image format of a cover resource, detected from path extension or
/// magic bytes. Drives the file extension the persisted cover gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Svg,
    WebP,
    Unknown,
}

impl ImageFormat {
    /// Conventional file extension for this format (no leading dot).
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Svg => "svg",
            ImageFormat::WebP => "webp",
            ImageFormat::Unknown => "bin",
        }
    }
}

/// Detect a cover image's format from its href and/or raw bytes.
///
/// Extension-based detection first (most common case), magic bytes as
/// fallback for covers with misleading or absent extensions.
pub fn detect_image_format(path: &str, data: &[u8]) -> ImageFormat {
    let path_lower = path.to_lowercase();

    if path_lower.ends_with(".jpg") || path_lower.ends_with(".jpeg") {
        return ImageFormat::Jpeg;
    }
    if path_lower.ends_with(".png") {
        return ImageFormat::Png;
    }
    if path_lower.ends_with(".gif") {
        return ImageFormat::Gif;
    }
    if path_lower.ends_with(".svg") {
        return ImageFormat::Svg;
    }
    if path_lower.ends_with(".webp") {
        return ImageFormat::WebP;
    }

    if data.len() >= 4 {
        // JPEG: FF D8
        if data[0] == 0xFF && data[1] == 0xD8 {
            return ImageFormat::Jpeg;
        }
        // PNG: 89 50 4E 47
        if data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47 {
            return ImageFormat::Png;
        }
        // GIF: 47 49 46
        if data[0] == 0x47 && data[1] == 0x49 && data[2] == 0x46 {
            return ImageFormat::Gif;
        }
        // RIFF....WEBP
        if data.len() >= 12
            && &data[0..4] == b"RIFF"
            && &data[8..12] == b"WEBP"
        {
            return ImageFormat::WebP;
        }
    }

    ImageFormat::Unknown
}

/// Strip UTF-8 BOM (byte order mark) if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_image_format_by_extension() {
        assert_eq!(detect_image_format("cover.jpg", &[]), ImageFormat::Jpeg);
        assert_eq!(detect_image_format("cover.JPEG", &[]), ImageFormat::Jpeg);
        assert_eq!(detect_image_format("cover.png", &[]), ImageFormat::Png);
        assert_eq!(detect_image_format("cover.webp", &[]), ImageFormat::WebP);
        assert_eq!(detect_image_format("cover", &[]), ImageFormat::Unknown);
    }

    #[test]
    fn test_detect_image_format_by_magic_bytes() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(detect_image_format("cover", &jpeg), ImageFormat::Jpeg);

        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_image_format("cover", &png), ImageFormat::Png);
    }

    #[test]
    fn test_decode_text_utf8() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
    }

    #[test]
    fn test_decode_text_windows_1252_fallback() {
        // 0xE9 is 'é' in Windows-1252, invalid as standalone UTF-8
        let bytes = b"caf\xe9";
        assert_eq!(decode_text(bytes, None), "café");
    }

    #[test]
    fn test_extract_xml_encoding() {
        let xml = br#"<?xml version="1.0" encoding="ISO-8859-1"?><root/>"#;
        assert_eq!(extract_xml_encoding(xml), Some("ISO-8859-1"));
        assert_eq!(extract_xml_encoding(b"<root/>"), None);
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom(&[0xEF, 0xBB, 0xBF, b'a']), b"a");
        assert_eq!(strip_bom(b"abc"), b"abc");
    }
}
