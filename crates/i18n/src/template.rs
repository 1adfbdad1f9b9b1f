use crate::Params;

/// Replace `${name}` placeholders with values from `params`.
///
/// Placeholders without a matching parameter are kept verbatim so a
/// half-filled message is still readable. An unterminated `${` is emitted
/// literally.
pub fn interpolate(template: &str, params: &Params) -> String {
    if params.is_empty() || !template.contains("${") {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            out.push(ch);
            continue;
        }
        chars.next();

        let mut name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            name.push(c);
        }

        match (closed, params.get(name.trim())) {
            (true, Some(value)) => out.push_str(value),
            (true, None) => {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            },
            (false, _) => {
                out.push_str("${");
                out.push_str(&name);
            },
        }
    }

    out
}
