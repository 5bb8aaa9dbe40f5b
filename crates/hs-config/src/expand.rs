//! `${VAR}` and `${VAR:-default}` references in config strings.
//!
//! Only the braced form is recognised, so a literal `$` in a unit's
//! `ExecStart` line or a URL survives untouched.

use std::borrow::Cow;

use crate::ConfigError;

/// Name of a referenced variable that is not set and has no default.
struct Unset(String);

fn lookup(name: &str) -> Result<Option<String>, Unset> {
    std::env::var(name)
        .map(Some)
        .map_err(|_| Unset(name.to_owned()))
}

/// Expand references in `value`, naming `field` in the error.
fn expand<'a>(value: &'a str, field: &str) -> Result<Cow<'a, str>, ConfigError> {
    if !value.contains("${") {
        return Ok(Cow::Borrowed(value));
    }
    shellexpand::env_with_context(value, lookup).map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Expand a config string in place.
pub(crate) fn expand_in_place(value: &mut String, field: &str) -> Result<(), ConfigError> {
    let expanded = match expand(value, field)? {
        Cow::Borrowed(_) => return Ok(()),
        Cow::Owned(expanded) => expanded,
    };
    *value = expanded;
    Ok(())
}

/// Expand an optional config string in place; `None` stays `None`.
pub(crate) fn expand_opt(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    match value {
        Some(inner) => expand_in_place(inner, field),
        None => Ok(()),
    }
}
