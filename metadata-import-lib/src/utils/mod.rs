use std::path::Path;

/// Capitalize the first letter of every whitespace-separated word.
pub fn to_title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut c = word.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().chain(c).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercased extension with its leading dot, e.g. `.csv`.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Seconds with two decimals, as printed in batch summaries.
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.2}s", seconds)
}
