/// Derive the name of a task's duplicate from the current name.
///
/// next_duplicate_name("Hello")      -> "[1] Hello"
/// next_duplicate_name("[2] World")  -> "[3] World"
/// next_duplicate_name("[12] World") -> "[13] World"
///
/// The prefix is a bracketed number of at most two digits. Exactly the
/// matched prefix and one following space are stripped before re-prefixing.
pub fn next_duplicate_name(name: &str) -> String {
    match parse_prefix(name) {
        Some((number, rest)) => format!("[{}] {rest}", number + 1),
        None => format!("[1] {name}"),
    }
}

/// Split `"[n] rest"` into `(n, rest)`. Empty brackets count as zero.
fn parse_prefix(name: &str) -> Option<(u32, &str)> {
    let inner = name.strip_prefix('[')?;
    let close = inner.find(']')?;
    let digits = &inner[..close];
    if digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number = if digits.is_empty() {
        0
    } else {
        digits.parse().ok()?
    };
    let after = &inner[close + 1..];
    let rest = after.strip_prefix(' ').unwrap_or(after);
    Some((number, rest))
}
