//! Escape/decoder (`spec.md` §4.C), grounded on the original's
//! `string_utils.EscapeStrings.unescape` (import available only as a stub
//! in `examples/original_source`; the replacement table is fully specified
//! in `spec.md` and is followed literally here). Applied once, to raw
//! string literals, before any grave/percent scanning in `crate::transform`.

/// Decodes MODL escape sequences in a single left-to-right pass.
/// Idempotent on fully-decoded text: an unescaped `~`/`\` with no
/// recognised successor is copied through verbatim, so re-running `decode`
/// on its own output is a no-op.
pub fn decode(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if (c == '~' || c == '\\') && i + 1 < chars.len() {
            let next = chars[i + 1];
            let replacement = match next {
                '"' => Some('"'),
                '=' => Some('='),
                ':' => Some(':'),
                ';' => Some(';'),
                '(' => Some('('),
                ')' => Some(')'),
                '[' => Some('['),
                ']' => Some(']'),
                '&' => Some('&'),
                'n' if c == '\\' => Some('\n'),
                '~' if c == '~' => Some('~'),
                '\\' if c == '\\' => Some('\\'),
                _ => None,
            };
            if let Some(rep) = replacement {
                out.push(rep);
                i += 2;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }

    out
}
