//! Snippet of text surrounding a selection, used as the selection context
//! of span annotations.

/// Characters of context kept on each side of the selection.
pub const CONTEXT_WINDOW: usize = 50;

/// Text around `selection` starting at character offset `start` of `content`.
///
/// The window is widened by [`CONTEXT_WINDOW`] characters on each side and
/// then shrunk to whole words, unless it already touches the start or end of
/// the content. Offsets outside the content are clamped.
pub fn selection_context(content: &str, selection: &str, start: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    let len = chars.len();
    let start = start.min(len);
    let end = (start + selection.chars().count()).min(len);

    let mut from = start.saturating_sub(CONTEXT_WINDOW);
    let mut to = (end + CONTEXT_WINDOW).min(len);

    if from > 0 {
        // drop the partial word at the left edge
        if let Some(space) = chars[from..start].iter().position(|c| c.is_whitespace()) {
            from += space + 1;
        }
    }
    if to < len {
        if let Some(space) = chars[end..to].iter().rposition(|c| c.is_whitespace()) {
            to = end + space;
        }
    }

    chars[from..to].iter().collect::<String>().trim().to_string()
}
