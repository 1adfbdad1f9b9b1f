/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw
/// config text.
///
/// Unresolvable variables without a fallback are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace placeholders using a custom lookup function.
///
/// This is the implementation used by [`substitute_env`]; the separate
/// signature makes it testable without mutating the process environment.
pub(crate) fn substitute_env_with(
    input: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut body = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                body.push(c);
            }
            if !closed || body.is_empty() {
                // Malformed, emit literal.
                result.push_str("${");
                result.push_str(&body);
                continue;
            }

            let (name, fallback) = match body.split_once(":-") {
                Some((name, fallback)) => (name, Some(fallback)),
                None => (body.as_str(), None),
            };
            match (lookup(name).filter(|v| !v.is_empty()), fallback) {
                (Some(val), _) => result.push_str(&val),
                (None, Some(fallback)) => result.push_str(fallback),
                (None, None) => {
                    result.push_str("${");
                    result.push_str(&body);
                    result.push('}');
                },
            }
        } else {
            result.push(ch);
        }
    }

    result
}
