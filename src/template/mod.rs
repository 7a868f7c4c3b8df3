//! Variable substitution for command templates.
//!
//! Two placeholder shapes are recognized:
//! - `$name`, where `name` is the longest run of identifier characters
//! - `${reference}`, where the reference runs up to the first `}`
//!
//! Substitution is fail-soft: a placeholder that is malformed or names
//! nothing in scope is left in the output exactly as written.

pub mod engine;
pub mod lookup;

pub use engine::{
    has_expression, ExpressionRenderer, MiniJinjaRenderer, TemplateError, TemplateResult,
};
pub use lookup::{lookup, parse_reference, LookupError, Reference, Segment};

use tracing::trace;

use crate::vars::{display_value, Variables};
use lookup::is_ident_char;

/// Substitute `$name` and `${reference}` placeholders in `text`.
pub fn render(text: &str, scope: &Variables) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            let Some(close) = braced.find('}') else {
                // No closing brace anywhere: the remainder is literal
                out.push_str(&rest[pos..]);
                return out;
            };
            let content = &braced[..close];
            match substitute(content, scope) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push_str("${");
                    out.push_str(content);
                    out.push('}');
                }
            }
            rest = &braced[close + 1..];
            continue;
        }

        let len = bare_reference_len(after);
        if len == 0 {
            out.push('$');
            rest = after;
            continue;
        }

        let reference = &after[..len];
        match substitute(reference, scope) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('$');
                out.push_str(reference);
            }
        }
        rest = &after[len..];
    }

    out.push_str(rest);
    out
}

/// Render `text` with the dollar dialect, then hand brace expressions to
/// `engine` when one is supplied.
pub fn template(
    text: &str,
    scope: &Variables,
    engine: Option<&dyn ExpressionRenderer>,
) -> TemplateResult<String> {
    let rendered = render(text, scope);
    match engine {
        Some(engine) if has_expression(&rendered) => engine.render(&rendered, scope),
        _ => Ok(rendered),
    }
}

fn substitute(reference: &str, scope: &Variables) -> Option<String> {
    match lookup(reference, scope) {
        Ok(value) => Some(display_value(value)),
        Err(err) => {
            trace!(reference, error = %err, "Leaving placeholder unrendered");
            None
        }
    }
}

/// Length in bytes of the identifier run following a bare `$`.
///
/// Accessors such as `.key` or `[n]` are only recognized inside braces, so
/// `$name.log` stops after `name`.
fn bare_reference_len(text: &str) -> usize {
    text.char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
