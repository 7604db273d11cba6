//! Comment prefix used for the `File:` banner of each combined file.

/// The line-comment token for a file extension (with or without the leading
/// dot, any case). Unknown extensions get `#`.
pub fn comment_prefix(ext: &str) -> &'static str {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "c" | "cc" | "cpp" | "cxx" | "h" | "hpp" | "hxx" | "java" | "cs" | "dart" => "//",
        "js" | "ts" | "jsx" | "tsx" | "php" => "//",
        "rs" | "go" | "kt" | "swift" => "//",
        "py" | "sh" | "bash" | "yaml" | "yml" | "ini" | "cfg" | "conf" | "toml" => "#",
        "css" | "scss" | "sass" => "/*",
        "html" | "xml" | "svg" => "<!--",
        "md" | "txt" | "rst" => "#",
        _ => "#",
    }
}
