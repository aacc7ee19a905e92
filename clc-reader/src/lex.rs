//! Shared line-oriented preprocessing: strip `;` comments, drop blank
//! lines, keep 1-based line numbers for diagnostics.

pub fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Non-blank, comment-stripped, trimmed lines with their 1-based source
/// line numbers.
pub fn preprocess(text: &str) -> Vec<(usize, String)> {
    text.lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let trimmed = strip_comment(raw).trim();
            if trimmed.is_empty() {
                None
            } else {
                Some((i + 1, trimmed.to_string()))
            }
        })
        .collect()
}

/// `name:` with nothing else on the line.
pub fn bare_label(line: &str) -> Option<&str> {
    let name = line.strip_suffix(':')?;
    if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        Some(name)
    } else {
        None
    }
}

/// Splits an argument-list string on top-level commas, treating `=>` as an
/// equivalent separator (spec §8's examples write `loadAI %r0, 0 => %r1`;
/// `=>` is purely a readability separator, not a distinct grammar
/// production — every argument position's role comes from the ISA
/// context, not from which side of `=>` it falls on).
pub fn split_args(rest: &str) -> Vec<String> {
    if rest.trim().is_empty() {
        return Vec::new();
    }
    rest.replace("=>", ",")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
