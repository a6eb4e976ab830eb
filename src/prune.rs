//! Prune spans: `<...>` delimited text that may be dropped to shorten output.
//!
//! Spans are matched flat. Each `<` pairs with the nearest following `>`, so
//! a `<` inside a span is plain content and spans never nest. A span does not
//! cross a line break: a `<` with no `>` before the next `\n` is left as
//! literal text and scanning moves on.

use std::ops::Range;

use log::trace;
use rand::Rng;

const OPEN: char = '<';
const CLOSE: char = '>';

fn is_delimiter(c: char) -> bool {
    c == OPEN || c == CLOSE
}

/// Character count of `text` excluding span delimiters
pub fn effective_len(text: &str) -> usize {
    text.chars().filter(|c| !is_delimiter(*c)).count()
}

/// Remove every `<` and `>`, keeping span content
pub fn strip_delimiters(text: &str) -> String {
    text.chars().filter(|c| !is_delimiter(*c)).collect()
}

/// Byte ranges of the prune spans in `text`, left to right, delimiters included
pub fn prune_spans(text: &str) -> Vec<Range<usize>> {
    // delimiters and '\n' are ASCII, so byte offsets always land on char boundaries
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == OPEN as u8 {
            let close = bytes[i + 1..]
                .iter()
                .position(|&b| b == CLOSE as u8 || b == b'\n')
                .map(|offset| i + 1 + offset)
                .filter(|&j| bytes[j] == CLOSE as u8);
            if let Some(j) = close {
                spans.push(i..j + 1);
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }

    spans
}

/// Shorten `text` to `max_len` characters by deleting random prune spans.
///
/// While spans remain and the effective length is over budget, one span is
/// chosen uniformly among the current spans and removed with its content.
/// Whatever spans survive keep their content; all delimiters are stripped
/// from the result. The result can still exceed `max_len` when deleting
/// every span is not enough.
pub fn prune<R: Rng + ?Sized>(text: &str, max_len: usize, rng: &mut R) -> String {
    let mut out = text.to_string();

    loop {
        let spans = prune_spans(&out);
        if spans.is_empty() || effective_len(&out) <= max_len {
            break;
        }

        let idx = rng.gen_range(0..spans.len());
        let span = spans[idx].clone();
        trace!(
            "pruning span {} of {}: {:?}",
            idx + 1,
            spans.len(),
            &out[span.clone()]
        );
        out.replace_range(span, "");
    }

    strip_delimiters(&out)
}
