// src/scratchpad.rs
//
// Marker scanning over decoded token text: finding scratchpad regions,
// stripping them from the visible answer, and rebuilding the code an agent
// has written so far.

use std::ops::Range;

use crate::tokenizer::{ControlTokens, TokenId};

/// A matched `[SP] ... [ESP]` span in decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Byte range of the whole region, markers included.
    pub span: Range<usize>,
    /// Byte range of the text between the markers.
    pub body: Range<usize>,
}

/// Finds every well-formed region in document order.
///
/// A start marker pairs with the next end marker. When another start marker
/// comes first, the earlier one is left unmatched and scanning resumes from
/// the later one. Unmatched markers are ordinary text.
pub fn regions(text: &str, start: &str, end: &str) -> Vec<Region> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(start) {
        let open = cursor + offset;
        let body_start = open + start.len();
        let Some(close_offset) = text[body_start..].find(end) else {
            break;
        };
        let close = body_start + close_offset;

        match text[body_start..close].find(start) {
            Some(inner) => cursor = body_start + inner,
            None => {
                found.push(Region {
                    span: open..close + end.len(),
                    body: body_start..close,
                });
                cursor = close + end.len();
            }
        }
    }

    found
}

/// Removes every well-formed region, leaving what the agent said outside
/// its scratchpad.
pub fn strip_regions(text: &str, start: &str, end: &str) -> String {
    let mut visible = String::with_capacity(text.len());
    let mut cursor = 0;
    for region in regions(text, start, end) {
        visible.push_str(&text[cursor..region.span.start]);
        cursor = region.span.end;
    }
    visible.push_str(&text[cursor..]);
    visible
}

/// True while a region is open and the newest token is the execute marker.
pub fn should_execute(tokens: &[TokenId], control: &ControlTokens) -> bool {
    let count = |id: TokenId| tokens.iter().filter(|&&t| t == id).count();

    tokens.last() == Some(&control.execute.id)
        && count(control.scratchpad_start.id) > count(control.scratchpad_end.id)
}

/// Rebuilds the code to run from decoded text ending in an open region.
///
/// The bodies of all earlier closed regions are concatenated with the text
/// after the last start marker. That blob is cut into statements at line
/// breaks and execute markers. An execute marker also drops the interpreter
/// output that follows it, through the next line break, provided the line
/// break comes before the next execute marker.
pub fn extract_code(text: &str, control: &ControlTokens) -> String {
    let start = control.scratchpad_start.text.as_str();
    let end = control.scratchpad_end.text.as_str();

    let (prior, current) = match text.rfind(start) {
        Some(at) => (&text[..at], &text[at + start.len()..]),
        None => ("", text),
    };

    let mut blob: String = regions(prior, start, end)
        .into_iter()
        .map(|region| &prior[region.body])
        .collect();
    blob.push_str(current);

    statements(&blob, &control.line_break.text, &control.execute.text).join("\n")
}

fn statements<'a>(blob: &'a str, line_break: &str, execute: &str) -> Vec<&'a str> {
    let mut fragments = Vec::new();
    let mut cursor = 0;

    loop {
        let rest = &blob[cursor..];
        let next_break = rest.find(line_break);
        let next_execute = rest.find(execute);

        let (at, is_execute) = match (next_break, next_execute) {
            (None, None) => {
                fragments.push(rest);
                break;
            }
            (Some(b), Some(e)) if e < b => (e, true),
            (Some(b), _) => (b, false),
            (None, Some(e)) => (e, true),
        };

        fragments.push(&rest[..at]);

        cursor += if is_execute {
            let after = at + execute.len();
            let output = &rest[after..];
            match (output.find(line_break), output.find(execute)) {
                (Some(b), Some(e)) if e < b => after,
                (Some(b), _) => after + b + line_break.len(),
                (None, _) => after,
            }
        } else {
            at + line_break.len()
        };
    }

    fragments.retain(|fragment| !fragment.is_empty());
    fragments
}
