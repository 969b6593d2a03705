use once_cell::sync::Lazy;
use regex::Regex;

pub fn placeholder_marker(field: &str) -> String {
    format!("[{}]", field.to_uppercase())
}

pub fn unresolved_markers(text: &str) -> Vec<String> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[A-Z][A-Z0-9_]*\]").unwrap());
    let mut found: Vec<String> = Vec::new();
    for m in RE.find_iter(text) {
        if !found.iter().any(|seen| seen == m.as_str()) {
            found.push(m.as_str().to_string());
        }
    }
    found
}
