//! Decoding of the Windows-1252 text the provider publishes.

use encoding_rs::WINDOWS_1252;

/// Decodes Windows-1252 bytes. Every byte maps to a character, so this cannot fail.
pub fn decode_windows_1252(bytes: &[u8]) -> String {
    WINDOWS_1252
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_umlauts_and_specials() {
        assert_eq!(decode_windows_1252(b"Baden-W\xfcrttemberg"), "Baden-Württemberg");
        assert_eq!(decode_windows_1252(b"\x80 \x96 \xb0C"), "€ – °C");
        assert_eq!(decode_windows_1252(b"plain;ascii"), "plain;ascii");
    }
}
