//! Turns the dataset documents of a product folder into [`DescriptionFile`]s.

use crate::types::datapoint::DescriptionFile;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const GERMAN_PREFIX: &str = "BESCHREIBUNG";
const ENGLISH_PREFIX: &str = "DESCRIPTION";
const OCTET_STREAM: &str = "application/octet-stream";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Display name of a document: a fixed title for the German and English
/// dataset descriptions, otherwise the file name up to its first dot.
pub fn display_name(file_name: &str) -> String {
    if file_name.starts_with(GERMAN_PREFIX) {
        return "[DE] Datensatzbeschreibung".to_string();
    }
    if file_name.starts_with(ENGLISH_PREFIX) {
        return "[EN] Dataset Description".to_string();
    }
    file_name
        .split_once('.')
        .map_or(file_name, |(stem, _)| stem)
        .to_string()
}

/// Detects the MIME type of a document from its leading bytes, falling back
/// to the file extension and then to what the server announced.
pub fn sniff_mime_type(file_name: &str, content: &[u8], announced: Option<&str>) -> String {
    if let Some(kind) = infer::get(content) {
        return kind.mime_type().to_string();
    }
    if let Some(mime) = mime_guess::from_path(file_name).first_raw() {
        return mime.to_string();
    }
    match announced {
        Some(mime) if !mime.is_empty() && mime != OCTET_STREAM => mime.to_string(),
        _ if std::str::from_utf8(content).is_ok() => PLAIN_TEXT.to_string(),
        _ => OCTET_STREAM.to_string(),
    }
}

pub fn describe(file_name: &str, content: &[u8], announced: Option<&str>) -> DescriptionFile {
    DescriptionFile {
        name: display_name(file_name),
        mime_type: sniff_mime_type(file_name, content, announced),
        content: STANDARD.encode(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_language_prefixes() {
        assert_eq!(
            display_name("BESCHREIBUNG_obsgermany_climate_hourly_tu_de.pdf"),
            "[DE] Datensatzbeschreibung"
        );
        assert_eq!(
            display_name("DESCRIPTION_obsgermany_climate_hourly_tu_en.pdf"),
            "[EN] Dataset Description"
        );
        assert_eq!(display_name("TU_Stundenwerte_Beschreibung_Stationen.txt"), "TU_Stundenwerte_Beschreibung_Stationen");
        assert_eq!(display_name("README"), "README");
    }

    #[test]
    fn content_wins_over_extension() {
        assert_eq!(sniff_mime_type("doc.txt", b"%PDF-1.7\n", None), "application/pdf");
        assert_eq!(sniff_mime_type("doc.pdf", b"\x00\x01", None), "application/pdf");
        assert_eq!(sniff_mime_type("list.txt", b"\x00\x01", None), "text/plain");
        assert_eq!(
            sniff_mime_type("scan.bin", b"\x89PNG\r\n\x1a\n\x00", Some("text/plain")),
            "image/png"
        );
        assert_eq!(
            sniff_mime_type("doc", b"\xff\xfe\x00", Some("application/msword")),
            "application/msword"
        );
        assert_eq!(sniff_mime_type("doc", b"plain words", None), PLAIN_TEXT);
        assert_eq!(sniff_mime_type("doc", b"\xfe\x00", None), OCTET_STREAM);
    }

    #[test]
    fn content_is_base64() {
        let file = describe("DESCRIPTION_x.pdf", b"%PDF-1.4", Some("application/pdf"));
        assert_eq!(file.content, "JVBERi0xLjQ=");
        assert_eq!(file.mime_type, "application/pdf");
    }
}
