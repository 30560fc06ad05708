//! Segmentation capability.

/// Tokens borrowed from the segmented text.
pub type Tokens<'a> = Box<dyn Iterator<Item = &'a str> + 'a>;

/// Splits continuous text into tokens.
///
/// Implementations must be deterministic for a fixed input and fixed segmenter state, and must
/// never fail: empty input yields no tokens. Calling `segment` again restarts the sequence.
pub trait Segmenter: Send + Sync {
    fn name(&self) -> &'static str;
    fn segment<'a>(&'a self, text: &'a str) -> Tokens<'a>;
}

/// Splits on Unicode whitespace. Useful for pre-segmented input.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceSegmenter;

impl Segmenter for WhitespaceSegmenter {
    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn segment<'a>(&'a self, text: &'a str) -> Tokens<'a> {
        Box::new(text.split_whitespace())
    }
}
