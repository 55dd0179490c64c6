/// Characters escaped with a leading backslash, in escaping order.
pub const ESCAPED_CHARS: [char; 8] = ['$', '{', '}', '<', '>', '(', ')', ';'];

/// Neutralize text that already passed classification.
///
/// Markup tags are stripped first, then every character in [`ESCAPED_CHARS`]
/// is prefixed with a backslash.
pub fn sanitize(text: &str) -> String {
    escape_special(&strip_tags(text))
}

/// Remove every `<...>` tag: a `<`, one or more characters other than `>`,
/// then the closing `>`. Text between tags is kept. `<>` and an unterminated
/// `<` are left as they are.
pub fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('>') {
            Some(close) if close > 0 => {
                rest = &after[close + 1..];
            }
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Backslash-escape the special characters in a single pass, so backslashes
/// inserted here are never escaped again.
pub fn escape_special(text: &str) -> String {
    let extra = text.chars().filter(|c| ESCAPED_CHARS.contains(c)).count();
    let mut out = String::with_capacity(text.len() + extra);

    for c in text.chars() {
        if ESCAPED_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }

    out
}
