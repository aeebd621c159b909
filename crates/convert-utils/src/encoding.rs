//! Decoding of PDF text strings.

/// Decode a PDF text string to UTF-8.
///
/// PDF text strings are either UTF-16BE (with a `FE FF` byte order mark),
/// UTF-8 (with an `EF BB BF` mark, PDF 2.0), or PDFDocEncoding. Windows-1252
/// agrees with PDFDocEncoding on every printable code point that shows up in
/// practice, so it is used for the last case.
pub fn decode_pdf_string(raw: &[u8]) -> String {
    if raw.starts_with(&[0xFE, 0xFF]) {
        let (result, _, _) = encoding_rs::UTF_16BE.decode(raw);
        return result.into_owned();
    }
    if raw.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(&raw[3..]).into_owned();
    }
    if raw.is_ascii() {
        return String::from_utf8_lossy(raw).into_owned();
    }

    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (result, _, _) = encoding_rs::WINDOWS_1252.decode(raw);
            result.into_owned()
        }
    }
}

/// Decode the bytes of a shown string when the font encoding is unknown.
///
/// Same as [`decode_pdf_string`] except that NUL bytes, which two-byte
/// encodings leave behind for ASCII glyphs, are dropped.
pub fn decode_shown_text(raw: &[u8]) -> String {
    decode_pdf_string(raw).replace('\0', "")
}
