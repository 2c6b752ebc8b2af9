/// Last path segment of a URL, without query string or fragment
pub fn basename(link: &str) -> String {
    let path = link.split(['?', '#']).next().unwrap_or(link);
    let path = path.trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Truncate to at most `max` characters
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
