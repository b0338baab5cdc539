//! String transformer (`spec.md` §4.E), grounded on the original's
//! `string_transformer.py`: grave scanning, percent scanning, reference
//! resolution (with nested `>` paths and `.method` chains), and splicing.
//!
//! Operates on an already escape-decoded string (`crate::escape::decode`
//! runs first, during lowering of the literal). Returns a `Value`: usually
//! `String`, but a bare reference that is the *entire* transform input and
//! resolves to a non-string value is returned as that value, unwrapped —
//! this is how a pair value like `fav=%1` can pull in a whole array.

use crate::environment::Environment;
use crate::methods::MethodRegistry;
use crate::value::Value;
use crate::{err_msg, ModlError};

/// A no-op default for the punycode collaborator hook (`spec.md` §6).
pub fn identity_hook(text: &str) -> String {
    text.to_string()
}

pub fn transform(
    input: &str,
    env: &Environment,
    methods: &MethodRegistry,
    punycode: &dyn Fn(&str) -> String,
) -> Result<Value, ModlError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Ok(Value::True);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Ok(Value::False);
    }

    let chars: Vec<char> = input.chars().collect();
    let grave_ranges = find_grave_ranges(&chars);
    let is_standalone = grave_ranges.is_empty();
    let solo_grave =
        grave_ranges.len() == 1 && grave_ranges[0].0 == 0 && grave_ranges[0].1 == chars.len().saturating_sub(1);

    let mut result = String::new();
    let mut cursor = 0;
    let mut sole_value: Option<Value> = None;

    for &(open, close) in &grave_ranges {
        if cursor < open {
            let (text, _) = scan_and_resolve_percent(&chars[cursor..open], false, env, methods)?;
            result.push_str(&text);
        }
        let content: Vec<char> = chars[open + 1..close].to_vec();
        if content.first() == Some(&'%') {
            let expr_text: String = content[1..].iter().collect();
            match resolve_reference_expr(&expr_text, env, methods) {
                Some(value) => {
                    if solo_grave {
                        sole_value = Some(value.clone());
                    }
                    result.push_str(&value.stringify_scalar());
                }
                None if solo_grave => {
                    return Err(err_msg!(InvalidReference, reference: expr_text));
                }
                None => {
                    result.push('`');
                    result.push('%');
                    result.push_str(&expr_text);
                    result.push('`');
                }
            }
        } else {
            let text: String = content.iter().collect();
            result.push_str(&punycode(&text));
        }
        cursor = close + 1;
    }

    if cursor < chars.len() {
        let (text, sole) = scan_and_resolve_percent(&chars[cursor..], is_standalone, env, methods)?;
        result.push_str(&text);
        sole_value = sole_value.or(sole);
    }

    if let Some(value) = sole_value {
        return Ok(value);
    }
    Ok(Value::String(result))
}

fn is_escaped(chars: &[char], idx: usize) -> bool {
    idx > 0 && (chars[idx - 1] == '~' || chars[idx - 1] == '\\')
}

/// Finds non-nesting, unescaped back-tick-delimited ranges, as
/// `(open_index, close_index)` (both inclusive, pointing at the ticks
/// themselves). An unterminated opening tick leaves the rest of the input
/// untouched, same as the original's linear scan.
fn find_grave_ranges(chars: &[char]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '`' && !is_escaped(chars, i) {
            let mut j = i + 1;
            let mut close = None;
            while j < chars.len() {
                if chars[j] == '`' && !is_escaped(chars, j) {
                    close = Some(j);
                    break;
                }
                j += 1;
            }
            match close {
                Some(close_idx) => {
                    ranges.push((i, close_idx));
                    i = close_idx + 1;
                    continue;
                }
                None => break,
            }
        }
        i += 1;
    }
    ranges
}

/// Finds every non-space `%`-prefixed match in `chars`, per the extension
/// rules in `spec.md` §4.E.3.
fn find_percent_matches(chars: &[char], methods: &MethodRegistry) -> Vec<(usize, usize)> {
    let mut matches = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '%' {
            let start = i;
            let mut pos = i + 1;
            if pos < chars.len() && chars[pos].is_ascii_digit() {
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                pos = scan_dotted_method_chain_boundary(chars, pos, methods);
            } else if pos < chars.len() && chars[pos].is_alphabetic() {
                while pos < chars.len() && chars[pos] != ' ' && chars[pos] != ':' {
                    pos += 1;
                }
            }
            matches.push((start, pos));
            i = pos.max(start + 1);
        } else {
            i += 1;
        }
    }
    matches
}

/// Boundary scan for a digit-led reference's trailing `.method` chain,
/// mirroring the original's `get_end_of_number`: builds the candidate
/// method name one letter at a time, only continuing to extend it while the
/// accumulated prefix is *itself* already a complete registered method name.
/// The first letter that breaks an in-progress match ends the scan right
/// there — `spec.md` §4.E.3's "stop at the first `.` where no prefix of the
/// remaining letters forms a registered method" means exactly this
/// letter-by-letter short-circuit, not "scan the whole alphabetic run, then
/// check membership once": `%0.trim` only ever consumes `.t` (a complete
/// alias on its own), stranding `rim` as literal trailing text, because
/// `tr` is never itself a registered name. Two consecutive dots restart the
/// candidate and keep scanning (`%0.t.u` consumes the whole chain).
fn scan_dotted_method_chain_boundary(chars: &[char], dot_pos: usize, methods: &MethodRegistry) -> usize {
    if dot_pos >= chars.len() || chars[dot_pos] != '.' {
        return dot_pos;
    }
    let mut pos = dot_pos;
    let mut new_method = String::new();
    loop {
        pos += 1;
        if pos >= chars.len() {
            return pos;
        }
        let next_char = chars[pos];
        if next_char == '.' {
            if !new_method.is_empty() {
                new_method.clear();
            } else {
                return pos;
            }
        } else if !next_char.is_alphabetic() {
            return pos;
        } else {
            let mut candidate = new_method.clone();
            candidate.push(next_char);
            if methods.contains(&candidate) {
                new_method = candidate;
            } else if !new_method.is_empty() {
                return pos;
            } else {
                return pos - 1;
            }
        }
    }
}

/// Resolves and splices every percent match within `chars`. `is_standalone`
/// means this slice is the entire transform input with no graves in play —
/// only then can a whole-slice single match become a "sole value" result or
/// an `InvalidReference` error; otherwise a miss is left verbatim.
fn scan_and_resolve_percent(
    chars: &[char],
    is_standalone: bool,
    env: &Environment,
    methods: &MethodRegistry,
) -> Result<(String, Option<Value>), ModlError> {
    let matches = find_percent_matches(chars, methods);
    if matches.is_empty() {
        return Ok((chars.iter().collect(), None));
    }

    let mut out = String::new();
    let mut cursor = 0;
    let mut sole_value = None;

    for &(start, end) in &matches {
        out.push_str(&chars[cursor..start].iter().collect::<String>());
        let expr_text: String = chars[start + 1..end].iter().collect();
        let whole_span = is_standalone && start == 0 && end == chars.len() && matches.len() == 1;

        match resolve_reference_expr(&expr_text, env, methods) {
            Some(value) => {
                if whole_span {
                    sole_value = Some(value.clone());
                }
                out.push_str(&value.stringify_scalar());
            }
            None => {
                if whole_span {
                    return Err(err_msg!(InvalidReference, reference: expr_text));
                }
                out.push_str(&chars[start..end].iter().collect::<String>());
            }
        }
        cursor = end;
    }
    out.push_str(&chars[cursor..].iter().collect::<String>());
    Ok((out, sole_value))
}

/// Resolves `SUBJ ( '.' METHOD )*`: a head/path subject, with each
/// subsequent dotted segment applied as a method call (if registered) or
/// folded back into the subject text literally (if not).
fn resolve_reference_expr(expr: &str, env: &Environment, methods: &MethodRegistry) -> Option<Value> {
    let mut segments = expr.split('.');
    let subject_part = segments.next().unwrap_or("");
    let mut current = resolve_subject_path(subject_part, env)?;

    for seg in segments {
        if seg.is_empty() {
            continue;
        }
        let (name, params) = split_method_call(seg);
        if methods.contains(&name) {
            let base = current.stringify_scalar();
            let input = match &params {
                Some(p) => format!("{base},{p}"),
                None => base,
            };
            let out = methods.apply(&name, &input).unwrap_or(input);
            current = Value::String(out);
        } else {
            let base = current.stringify_scalar();
            current = Value::String(match &params {
                Some(p) => format!("{base}.{name}({p})"),
                None => format!("{base}.{name}"),
            });
        }
    }
    Some(current)
}

fn split_method_call(seg: &str) -> (String, Option<String>) {
    match seg.find('(') {
        Some(idx) => {
            let name = seg[..idx].to_string();
            let params = seg[idx + 1..seg.len().saturating_sub(1)].to_string();
            (name, Some(params))
        }
        None => (seg.to_string(), None),
    }
}

/// Resolves `head ( '>' segment )*` against the environment and, for each
/// nested segment, the matching capability predicate on the current value.
/// Shared with `crate::conditional`, which resolves a condition atom's key
/// through the same nested-path walk.
pub(crate) fn resolve_subject_path(subject: &str, env: &Environment) -> Option<Value> {
    let mut segments = subject.split('>');
    let head = segments.next().unwrap_or("");
    let mut current = env.resolve_head(head)?.clone();
    for seg in segments {
        current = child_at(&current, seg)?;
    }
    Some(current)
}

fn child_at(value: &Value, seg: &str) -> Option<Value> {
    if let Ok(index) = seg.parse::<usize>() {
        match value {
            Value::Pair(p) => (index == 0).then(|| p.value.as_deref().cloned()).flatten(),
            _ => value.child_by_index(index).cloned(),
        }
    } else {
        match value {
            Value::Pair(p) => (p.key == seg).then(|| p.value.as_deref().cloned()).flatten(),
            _ => value.child_by_name(seg).cloned(),
        }
    }
}
