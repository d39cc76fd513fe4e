//! Literal escaping for generated automation scripts.
//!
//! Every caller-supplied string that ends up in a script passes through
//! [`escape_text`]. The program is escaped a second time when it is embedded
//! in the host wrapper, and [`shell_arg`] covers the printable command line.

/// Escape `value` for use between double quotes in a JavaScript string literal.
/// `None` becomes the empty string.
pub fn escape_text(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// A complete double-quoted JavaScript string literal.
pub fn js_string(value: &str) -> String {
    format!("\"{}\"", escape_text(Some(value)))
}

/// Quote a single argument for a POSIX shell command line.
pub fn shell_arg(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | '='))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Render a program invocation as a copy-pasteable shell command line.
pub fn shell_command_line(program: &str, args: &[String]) -> String {
    let mut parts = vec![shell_arg(program)];
    parts.extend(args.iter().map(|arg| shell_arg(arg)));
    parts.join(" ")
}
