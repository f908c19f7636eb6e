//! LaTeX delimiter normalization for Kramdown + MathJax.
//!
//! Jupyter writes inline math as `$...$` and display math as `$$...$$`.
//! Kramdown only knows `$$...$$`: inside a paragraph it is inline math, and
//! on lines of its own, separated from the surrounding text by blank lines,
//! it is a display block.
//!
//! The normalizer makes a single left-to-right pass over a markdown cell:
//!
//! - every unescaped `$...$` span becomes `$$...$$`
//! - a math span that starts at the beginning of a line and ends at the end
//!   of a line is a display block and gets a blank line on each side
//! - `\$` is never a delimiter
//! - fenced code blocks and inline code spans are copied verbatim, and no
//!   math span extends into one
//! - an inline `$...$` span does not cross a blank line
//! - an opener without a partner leaves the rest of the cell untouched and
//!   is reported through [`NormalizedMath::unmatched`]
//!
//! The output is a fixed point: normalizing it again changes nothing.

use regex::Regex;
use std::sync::LazyLock;

// Opening line of a fenced code block: up to three spaces, then ``` or ~~~
static RE_FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})").expect("valid fence regex"));

/// Result of normalizing one markdown cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMath {
    /// Normalized text
    pub text: String,
    /// Byte offset (in the input) of a delimiter that has no partner
    pub unmatched: Option<usize>,
}

/// Normalize math delimiters, discarding the unmatched-delimiter report
#[must_use]
pub fn normalize_math(text: &str) -> String {
    normalize_math_with_report(text).text
}

/// Normalize math delimiters in one markdown cell
#[must_use]
pub fn normalize_math_with_report(text: &str) -> NormalizedMath {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut unmatched = None;
    let mut i = 0;

    while i < bytes.len() {
        if is_line_start(bytes, i) {
            if let Some(end) = fenced_block_end(text, i) {
                out.push_str(&text[i..end]);
                i = end;
                continue;
            }
        }

        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'$') => {
                out.push_str("\\$");
                i += 2;
            }
            b'`' => {
                let end = code_span_end(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
            }
            b'$' => {
                let open_len = if bytes.get(i + 1) == Some(&b'$') { 2 } else { 1 };
                let Some(close) = find_closing(text, i + open_len, open_len) else {
                    log::debug!("Unmatched math delimiter at byte {i}");
                    unmatched = Some(i);
                    out.push_str(&text[i..]);
                    break;
                };
                let body = &text[i + open_len..close];
                let after = close + open_len;
                i = emit_math(&mut out, text, i, body, after);
            }
            b'\n' => {
                out.push('\n');
                i += 1;
            }
            _ => {
                let end = bytes[i + 1..]
                    .iter()
                    .position(|b| matches!(b, b'\\' | b'`' | b'$' | b'\n'))
                    .map_or(bytes.len(), |p| i + 1 + p);
                out.push_str(&text[i..end]);
                i = end;
            }
        }
    }

    NormalizedMath {
        text: out,
        unmatched,
    }
}

/// Write one math span and return the input position to continue at
fn emit_math(out: &mut String, text: &str, open: usize, body: &str, after: usize) -> usize {
    let bytes = text.as_bytes();
    let line_start = text[..open].rfind('\n').map_or(0, |p| p + 1);
    let line_end = text[after..].find('\n').map_or(text.len(), |p| after + p);

    let is_block = is_blank(&text[line_start..open]) && is_blank(&text[after..line_end]);
    if !is_block {
        out.push_str("$$");
        out.push_str(body);
        out.push_str("$$");
        return after;
    }

    // The indentation before the opener has already been copied to `out`
    let indent_start = out.len() - (open - line_start);
    if needs_blank_before(&out[..indent_start]) {
        out.insert(indent_start, '\n');
    }

    out.push_str("$$");
    out.push_str(body);
    out.push_str("$$");
    out.push_str(&text[after..line_end]);

    if line_end == bytes.len() {
        return line_end;
    }
    out.push('\n');

    let next_start = line_end + 1;
    let next_end = text[next_start..]
        .find('\n')
        .map_or(text.len(), |p| next_start + p);
    if next_start < bytes.len() && !is_blank(&text[next_start..next_end]) {
        out.push('\n');
    }
    next_start
}

/// Position of the closing delimiter for a span whose body starts at `from`
///
/// Inline spans close at the next unescaped `$`. Display spans close at the
/// next unescaped `$$`; a lone `$` inside them is content. No span reaches
/// into a code span or a fenced block, and inline spans end at a blank line.
fn find_closing(text: &str, from: usize, open_len: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut j = from;
    while j < bytes.len() {
        if is_line_start(bytes, j) {
            let line_end = text[j..].find('\n').map_or(text.len(), |p| j + p);
            if open_len == 1 && is_blank(&text[j..line_end]) {
                return None;
            }
            if fenced_block_end(text, j).is_some() {
                return None;
            }
        }

        match bytes[j] {
            b'\\' if bytes.get(j + 1) == Some(&b'$') => j += 2,
            b'`' => {
                let run = backtick_run(bytes, j);
                if code_span_end(bytes, j) > j + run {
                    return None;
                }
                j += run;
            }
            b'$' if open_len == 1 => return Some(j),
            b'$' if bytes.get(j + 1) == Some(&b'$') => return Some(j),
            _ => j += 1,
        }
    }
    None
}

/// End of an inline code span starting with the backtick run at `start`
///
/// A run without a closing run of the same length is plain text.
fn code_span_end(bytes: &[u8], start: usize) -> usize {
    let run = backtick_run(bytes, start);
    let mut j = start + run;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let len = backtick_run(bytes, j);
            if len == run {
                return j + len;
            }
            j += len;
        } else {
            j += 1;
        }
    }
    start + run
}

fn backtick_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|&&b| b == b'`').count()
}

/// End (exclusive) of a fenced code block opening at `start`, if one does
///
/// An unclosed fence runs to the end of the text, as in CommonMark.
fn fenced_block_end(text: &str, start: usize) -> Option<usize> {
    let first_line_end = text[start..].find('\n').map_or(text.len(), |p| start + p);
    let captures = RE_FENCE_OPEN.captures(&text[start..first_line_end])?;
    let fence = captures.get(1)?.as_str();
    let fence_char = fence.chars().next()?;
    let fence_len = fence.len();

    let mut line_start = first_line_end + 1;
    while line_start < text.len() {
        let line_end = text[line_start..]
            .find('\n')
            .map_or(text.len(), |p| line_start + p);
        let line = &text[line_start..line_end];
        let indent = line.len() - line.trim_start_matches(' ').len();
        let marker = line.trim_start_matches(' ');
        let run = marker.chars().take_while(|&c| c == fence_char).count();
        if indent <= 3 && run >= fence_len && is_blank(&marker[run..]) {
            return Some((line_end + 1).min(text.len()));
        }
        line_start = line_end + 1;
    }
    Some(text.len())
}

#[inline]
fn is_line_start(bytes: &[u8], i: usize) -> bool {
    i == 0 || bytes[i - 1] == b'\n'
}

#[inline]
fn is_blank(s: &str) -> bool {
    s.chars().all(|c| c == ' ' || c == '\t' || c == '\r')
}

/// Whether the line before a display block needs to be separated from it
fn needs_blank_before(preceding: &str) -> bool {
    if preceding.is_empty() {
        return false;
    }
    let body = preceding.strip_suffix('\n').unwrap_or(preceding);
    let last_line = body.rsplit('\n').next().unwrap_or("");
    !is_blank(last_line)
}
