//! Character encoding resolution for fetched bodies.
//!
//! Order: byte-order mark, `Content-Type` charset, `<meta>` declaration in the first KB,
//! then statistical detection. Decoding is lossy and never fails.

use encoding_rs::Encoding;
use serde::Serialize;

/// How much of the body is scanned for a `<meta>` charset declaration.
const META_SNIFF_BYTES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingSource {
    Bom,
    Header,
    Meta,
    Detected,
}

#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
    pub source: EncodingSource,
    /// True if malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

pub fn charset_from_content_type(ct: Option<&str>) -> Option<&'static Encoding> {
    let ct = ct?;
    for param in ct.split(';').skip(1) {
        let Some((k, v)) = param.split_once('=') else {
            continue;
        };
        if k.trim().eq_ignore_ascii_case("charset") {
            let label = v.trim().trim_matches(|c| c == '"' || c == '\'');
            return Encoding::for_label(label.as_bytes());
        }
    }
    None
}

/// Find `charset=` inside a `<meta ...>` tag near the start of the document.
///
/// Covers both `<meta charset="gbk">` and
/// `<meta http-equiv="Content-Type" content="text/html; charset=gbk">`.
pub fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = bytes[..bytes.len().min(META_SNIFF_BYTES)].to_ascii_lowercase();
    let mut rest: &[u8] = &head;
    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start..];
        let end = tag.iter().position(|&b| b == b'>').unwrap_or(tag.len());
        let tag = &tag[..end];
        if let Some(enc) = charset_in_tag(tag) {
            // A meta tag can't truthfully declare UTF-16 in an ASCII-compatible prefix.
            if enc == encoding_rs::UTF_16LE || enc == encoding_rs::UTF_16BE {
                return Some(encoding_rs::UTF_8);
            }
            return Some(enc);
        }
        rest = &rest[start + end.max(1)..];
    }
    None
}

fn charset_in_tag(tag: &[u8]) -> Option<&'static Encoding> {
    let pos = find(tag, b"charset")?;
    let mut i = pos + b"charset".len();
    while i < tag.len() && tag[i].is_ascii_whitespace() {
        i += 1;
    }
    if tag.get(i) != Some(&b'=') {
        return None;
    }
    i += 1;
    while i < tag.len() && (tag[i].is_ascii_whitespace() || tag[i] == b'"' || tag[i] == b'\'') {
        i += 1;
    }
    let label_end = tag[i..]
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'/' | b' ' | b'\t' | b'\n' | b'\r'))
        .map(|p| i + p)
        .unwrap_or(tag.len());
    Encoding::for_label(&tag[i..label_end])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Top-level domain of a URL, used as a hint for detection (`.cn` favors GBK, `.tw` Big5, ...).
fn tld_hint(url: Option<&str>) -> Option<String> {
    let u = url::Url::parse(url?).ok()?;
    let host = u.host_str()?;
    let tld = host.rsplit('.').next()?;
    (!tld.is_empty() && tld.chars().all(|c| c.is_ascii_alphabetic())).then(|| tld.to_string())
}

pub fn detect(bytes: &[u8], url: Option<&str>) -> &'static Encoding {
    let mut det = chardetng::EncodingDetector::new();
    det.feed(bytes, true);
    let tld = tld_hint(url);
    det.guess(tld.as_deref().map(str::as_bytes), true)
}

/// Resolve the encoding of `bytes` and decode them.
pub fn decode(bytes: &[u8], content_type: Option<&str>, url: Option<&str>) -> Decoded {
    let (encoding, source, body) = if let Some((enc, bom_len)) = Encoding::for_bom(bytes) {
        (enc, EncodingSource::Bom, &bytes[bom_len..])
    } else if let Some(enc) = charset_from_content_type(content_type) {
        (enc, EncodingSource::Header, bytes)
    } else if let Some(enc) = charset_from_meta(bytes) {
        (enc, EncodingSource::Meta, bytes)
    } else {
        (detect(bytes, url), EncodingSource::Detected, bytes)
    };
    let (text, had_errors) = encoding.decode_without_bom_handling(body);
    log::debug!(
        "decoded bytes={} encoding={} source={source:?} had_errors={had_errors}",
        bytes.len(),
        encoding.name()
    );
    Decoded {
        text: text.into_owned(),
        encoding,
        source,
        had_errors,
    }
}
