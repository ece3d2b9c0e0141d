// src/files/braces.rs

/// Expand `{a,b}` alternatives into separate patterns, left to right.
///
/// `"{,*/}*.{png,jpg}"` becomes `["*.png", "*.jpg", "*/*.png", "*/*.jpg"]`.
/// Groups without a top-level comma are left untouched, and an unmatched `{`
/// is passed through so the glob compiler reports it.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some((open, close)) = find_group(pattern) else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let body = &pattern[open + 1..close];

    let mut out: Vec<String> = Vec::new();
    for alt in split_top_level(body) {
        for expanded in expand_braces(&format!("{prefix}{alt}{suffix}")) {
            if !out.contains(&expanded) {
                out.push(expanded);
            }
        }
    }
    out
}

/// Find the first brace group that contains a top-level comma.
fn find_group(pattern: &str) -> Option<(usize, usize)> {
    let bytes = pattern.as_bytes();
    let mut start = 0;

    while let Some(rel) = pattern[start..].find('{') {
        let open = start + rel;
        let mut depth = 0usize;
        let mut has_comma = false;
        let mut close = None;

        for (i, &b) in bytes.iter().enumerate().skip(open) {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                b',' if depth == 1 => has_comma = true,
                _ => {}
            }
        }

        match close {
            Some(close) if has_comma => return Some((open, close)),
            Some(close) => start = close + 1,
            None => return None,
        }
    }

    None
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;

    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[last..]);
    parts
}
