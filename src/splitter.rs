//! Recursive boundary-aware text splitter.
//!
//! Splits document text into chunks of at most `chunk_size` bytes, preferring
//! to cut at paragraph boundaries (`\n\n`), then line boundaries (`\n`), then
//! word boundaries (` `), and only falling back to a hard character cut when
//! a single word exceeds the limit. Consecutive chunks of the same document
//! repeat `chunk_overlap` trailing bytes of the previous chunk so that
//! meaning spanning a cut survives retrieval.
//!
//! All cuts land on `char` boundaries.

use crate::models::{Chunk, SourceDocument};

/// Boundary preference order. The empty-string fallback is handled by
/// [`hard_cut`] rather than a separator entry.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split a document into chunks with contiguous indices starting at 0.
pub fn split_document(doc: &SourceDocument, chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    split_text(&doc.text, chunk_size, chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk::new(&doc.source, i as i64, &text))
        .collect()
}

/// Split text into overlapping chunks of at most `chunk_size` bytes.
///
/// Whitespace-only input produces no chunks. Requires
/// `chunk_overlap < chunk_size`, which config validation enforces.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    debug_assert!(chunk_overlap < chunk_size);

    if text.trim().is_empty() {
        return Vec::new();
    }

    let fragments = fragment(text, chunk_size, &SEPARATORS);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    // Whether anything beyond the overlap seed landed in `current` since the
    // last flush; a seed-only tail would duplicate the previous chunk.
    let mut appended = false;

    for frag in fragments {
        if !current.is_empty() && current.len() + frag.len() > chunk_size {
            // Seed from the untrimmed buffer so the separator between the
            // last kept word and the next fragment survives the overlap.
            let mut seed = tail(&current, chunk_overlap).to_string();

            let flushed = current.trim();
            if !flushed.is_empty() {
                chunks.push(flushed.to_string());
            }

            // Shrink the overlap seed when the next fragment alone nearly
            // fills the chunk budget.
            if seed.len() + frag.len() > chunk_size {
                let budget = chunk_size.saturating_sub(frag.len());
                seed = tail(&seed, budget).to_string();
            }
            current = seed;
            appended = false;
        }
        current.push_str(frag);
        if !frag.trim().is_empty() {
            appended = true;
        }
    }

    let last = current.trim();
    if appended && !last.is_empty() {
        chunks.push(last.to_string());
    }

    chunks
}

/// Break text into fragments no longer than `max` bytes, preferring earlier
/// separators. Separators stay attached to the preceding fragment so that
/// reassembly preserves the original spacing.
fn fragment<'a>(text: &'a str, max: usize, separators: &[&str]) -> Vec<&'a str> {
    if text.len() <= max {
        return vec![text];
    }

    let Some((sep, rest)) = separators.split_first() else {
        return hard_cut(text, max);
    };

    let mut out = Vec::new();
    for piece in split_keep_separator(text, sep) {
        if piece.len() <= max {
            out.push(piece);
        } else {
            out.extend(fragment(piece, max, rest));
        }
    }
    out
}

/// Split on `sep`, keeping each separator glued to the piece before it.
fn split_keep_separator<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for (idx, matched) in text.match_indices(sep) {
        let end = idx + matched.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

/// Last-resort split at `char` boundaries into slices of at most `max` bytes.
fn hard_cut(text: &str, max: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let mut end = max.min(rest.len());
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // A single char wider than the budget; take it whole.
            end = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        out.push(&rest[..end]);
        rest = &rest[end..];
    }

    out
}

/// The trailing at-most-`n` bytes of `s`, snapped back to a `char` boundary.
fn tail(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    if s.len() <= n {
        return s;
    }
    let mut start = s.len() - n;
    while start > 0 && !s.is_char_boundary(start) {
        start -= 1;
    }
    &s[start..]
}
