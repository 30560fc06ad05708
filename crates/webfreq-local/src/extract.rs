use html_scraper::node::Node;
use webfreq_core::{media_type, Error, NormalizedText, RawDocument, Result};

/// Elements whose whole subtree is dropped before text extraction.
pub const NON_VISUAL_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// How far into a body we look for binary markers.
const SNIFF_BYTES: usize = 1024;

/// Best-effort sniff for PDF bytes (magic header).
pub fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Best-effort guess for whether bytes are HTML-ish.
pub fn bytes_look_like_html(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let rest = bytes[start..]
        .iter()
        .take(16)
        .map(u8::to_ascii_lowercase)
        .collect::<Vec<u8>>();
    // Common prefixes; keep it conservative.
    [
        b"<!doctype".as_slice(),
        b"<html".as_slice(),
        b"<head".as_slice(),
        b"<body".as_slice(),
        b"<meta".as_slice(),
        b"<!--".as_slice(),
    ]
    .iter()
    .any(|p| rest.starts_with(p))
}

/// Best-effort sniff for common image formats.
pub fn bytes_look_like_image(bytes: &[u8]) -> bool {
    bytes.starts_with(b"\x89PNG\r\n\x1a\n")
        || bytes.starts_with(b"\xff\xd8\xff")
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || (bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
}

fn is_binary_media_type(mt: &str) -> bool {
    mt.starts_with("image/")
        || mt.starts_with("audio/")
        || mt.starts_with("video/")
        || mt == "application/pdf"
        || mt == "application/octet-stream"
        || mt == "application/zip"
}

/// Reject bodies that are not text (before decoding them).
pub fn ensure_textual(bytes: &[u8], content_type: Option<&str>) -> Result<()> {
    let mt = media_type(content_type);
    if is_binary_media_type(&mt) {
        return Err(Error::Extraction(format!("unsupported content type: {mt}")));
    }
    if bytes_look_like_pdf(bytes) {
        return Err(Error::Extraction("body is a PDF document".to_string()));
    }
    if bytes_look_like_image(bytes) {
        return Err(Error::Extraction("body is an image".to_string()));
    }
    // UTF-16 bodies legitimately contain NULs; everything else here shouldn't.
    let head = &bytes[..bytes.len().min(SNIFF_BYTES)];
    let utf16_bom = head.starts_with(&[0xFF, 0xFE]) || head.starts_with(&[0xFE, 0xFF]);
    if !utf16_bom && head.contains(&0) {
        return Err(Error::Extraction("body looks binary (NUL bytes)".to_string()));
    }
    Ok(())
}

fn is_non_visual(name: &str) -> bool {
    NON_VISUAL_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// Concatenate every visible text node in document order.
///
/// Non-visual subtrees are pruned before their text is reached; comments, doctypes and
/// processing instructions never contribute.
pub fn visible_text(html: &str) -> String {
    let doc = html_scraper::Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 2);
    // Explicit stack: deeply nested markup must not overflow the call stack.
    let mut stack = vec![doc.tree.root()];
    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) if is_non_visual(el.name()) => {}
            Node::Document | Node::Fragment | Node::Element(_) => {
                let mut child = node.last_child();
                while let Some(c) = child {
                    stack.push(c);
                    child = c.prev_sibling();
                }
            }
            _ => {}
        }
    }
    out
}

/// Convert HTML to normalized text (parse, prune, concatenate, clean).
pub fn html_to_text(html: &str) -> NormalizedText {
    NormalizedText::clean(&visible_text(html))
}

/// Extract normalized text from a decoded document.
///
/// `text/plain` bodies skip the markup stage. Everything else is parsed as HTML; the parser
/// recovers from malformed markup, so the only failures are non-text payloads.
pub fn extract_text(doc: &RawDocument) -> Result<NormalizedText> {
    let mt = doc.media_type();
    if is_binary_media_type(&mt) {
        return Err(Error::Extraction(format!("unsupported content type: {mt}")));
    }
    if doc.markup.chars().take(SNIFF_BYTES).any(|c| c == '\0') {
        return Err(Error::Extraction("markup contains NUL characters".to_string()));
    }
    let is_plain = mt == "text/plain" && !bytes_look_like_html(doc.markup.as_bytes());
    let text = if is_plain {
        NormalizedText::clean(&doc.markup)
    } else {
        html_to_text(&doc.markup)
    };
    log::debug!(
        "extracted media_type={mt:?} markup_bytes={} text_chars={}",
        doc.markup.len(),
        text.char_count()
    );
    Ok(text)
}
