//! Environment variable interpolation for config files.
//!
//! Only the braced forms are recognized:
//! - `${VAR}` - required; the variable must be set and non-empty
//! - `${VAR:-default}` - use the default when VAR is unset or empty
//!
//! Anything else, including a bare `$` or an unbraced `$VAR`, passes
//! through untouched.

use regex::Regex;
use std::env;
use std::sync::LazyLock;

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?::-(?P<default>[^}]*))?\}")
        .expect("Invalid regex pattern")
});

/// Substitute `${VAR}` references in the given text.
///
/// Errors are accumulated over the whole input rather than
/// short-circuited, so the user sees every problem variable at once.
pub fn interpolate(input: &str) -> Result<String, Vec<String>> {
    let mut output = String::with_capacity(input.len());
    let mut errors = Vec::new();
    let mut tail = 0;

    for caps in VAR_PATTERN.captures_iter(input) {
        let matched = caps.get(0).unwrap();
        output.push_str(&input[tail..matched.start()]);
        tail = matched.end();

        let name = &caps["name"];
        let default = caps.name("default").map(|d| d.as_str());

        match env::var(name) {
            Ok(value) if value.contains(['\n', '\r']) => {
                // A multi-line value would corrupt the surrounding YAML
                errors.push(format!("value of '{name}' spans multiple lines"));
            }
            Ok(value) if !value.is_empty() => output.push_str(&value),
            Ok(_) | Err(env::VarError::NotPresent) => match default {
                Some(default) => output.push_str(default),
                None => errors.push(format!("'{name}' is unset or empty")),
            },
            Err(env::VarError::NotUnicode(_)) => {
                errors.push(format!("value of '{name}' is not valid unicode"));
            }
        }
    }
    output.push_str(&input[tail..]);

    if errors.is_empty() {
        Ok(output)
    } else {
        Err(errors)
    }
}
