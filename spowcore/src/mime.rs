//! MIME type to file extension lookup for saved attachments.

/// Extension used when a MIME type is missing or unknown.
pub const FALLBACK_EXTENSION: &str = ".bin";

/// Extensions that win over the registry's alphabetical order.
const PREFERRED: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("audio/ogg", "ogg"),
];

/// Known extensions (with leading dot) for a MIME type, preferred first.
///
/// Parameters such as `; codecs=opus` are ignored and the match is case
/// insensitive.
pub fn extensions_by_type(mime: &str) -> Vec<String> {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let preferred = PREFERRED
        .iter()
        .find(|(ty, _)| *ty == essence)
        .map(|(_, ext)| *ext);
    let known = mime_guess::get_mime_extensions_str(&essence).unwrap_or(&[]);

    preferred
        .into_iter()
        .chain(known.iter().copied().filter(|ext| Some(*ext) != preferred))
        .map(|ext| format!(".{ext}"))
        .collect()
}

/// The preferred extension (with leading dot) for a MIME type.
pub fn extension_for(mime: Option<&str>) -> String {
    mime.map(extensions_by_type)
        .and_then(|exts| exts.into_iter().next())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg_prefers_jpg() {
        assert_eq!(extension_for(Some("image/jpeg")), ".jpg");
        let exts = extensions_by_type("image/jpeg");
        assert_eq!(exts[0], ".jpg");
        assert!(exts.iter().any(|ext| ext == ".jpeg"));
        assert_eq!(exts.iter().filter(|ext| *ext == ".jpg").count(), 1);
        assert_eq!(extension_for(Some("image/jpg")), ".jpg");
    }

    #[test]
    fn test_parameters_and_case_are_ignored() {
        assert_eq!(extension_for(Some("IMAGE/PNG")), ".png");
        assert_eq!(extension_for(Some("audio/ogg; codecs=opus")), ".ogg");
    }

    #[test]
    fn test_registry_covers_less_common_types() {
        assert_eq!(extension_for(Some("video/x-matroska")), ".mkv");
        assert_eq!(extension_for(Some("application/pdf")), ".pdf");
        assert_eq!(extension_for(Some("image/webp")), ".webp");
    }

    #[test]
    fn test_unknown_or_missing_falls_back() {
        assert!(extensions_by_type("application/x-unknown").is_empty());
        assert_eq!(extension_for(Some("application/x-unknown")), FALLBACK_EXTENSION);
        assert_eq!(extension_for(None), FALLBACK_EXTENSION);
    }
}
