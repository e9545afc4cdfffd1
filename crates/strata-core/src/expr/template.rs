//! Positional template rendering
//!
//! Logic templates use `{N}` slots (or `{}` for the next slot) and `{{`/`}}`
//! for literal braces. Rendering is total: a slot with no matching argument
//! is emitted verbatim.

/// Render `template` with positional arguments.
pub fn render<S: AsRef<str>>(template: &str, args: &[S]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next_auto = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut slot = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    slot.push(inner);
                }

                let index = if slot.is_empty() {
                    let index = next_auto;
                    next_auto += 1;
                    Some(index)
                } else {
                    slot.trim().parse::<usize>().ok()
                };

                match index.and_then(|i| args.get(i)) {
                    Some(arg) if closed => out.push_str(arg.as_ref()),
                    _ => {
                        out.push('{');
                        out.push_str(&slot);
                        if closed {
                            out.push('}');
                        }
                    }
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Escape literal braces so text survives a later `render` unchanged.
pub fn escape_braces(value: &str) -> String {
    value.replace('{', "{{").replace('}', "}}")
}

/// Quote a string value as an SQL literal that is safe to embed in a template.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_braces(&value.replace('\'', "''")))
}
