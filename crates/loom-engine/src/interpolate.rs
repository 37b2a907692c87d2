use loom_story::{Value, VariableDefinition};

use crate::variables::GameVariables;

/// Replace every `{{token}}` in `text` with a live variable value.
///
/// A token is looked up first as a variable id, then as the display name of
/// one of `definitions`. Tokens that resolve to nothing are left exactly as
/// written, braces included. Arrays render as `a, b, c`.
pub fn interpolate(text: &str, vars: &GameVariables, definitions: &[&VariableDefinition]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match token_at(after) {
            Some(token) => {
                let whole = &rest[open..open + 2 + token.len() + 2];
                match resolve(token.trim(), vars, definitions) {
                    Some(value) => out.push_str(&value.render()),
                    None => out.push_str(whole),
                }
                rest = &after[token.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &rest[open + 1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// The token of a `{{token}}` whose opening braces were just consumed: the
/// non-empty run up to the first `}`, which must be followed by another `}`.
fn token_at(after: &str) -> Option<&str> {
    let close = after.find('}')?;
    if close == 0 || !after[close..].starts_with("}}") {
        return None;
    }
    Some(&after[..close])
}

fn resolve<'a>(
    token: &str,
    vars: &'a GameVariables,
    definitions: &[&VariableDefinition],
) -> Option<&'a Value> {
    vars.get(token).or_else(|| {
        definitions
            .iter()
            .find(|d| d.name == token)
            .and_then(|d| vars.get(&d.id))
    })
}
