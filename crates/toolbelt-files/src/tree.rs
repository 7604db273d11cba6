//! Visual directory tree for the combined-output header.
//!
//! ```text
//! ├── widgets/
//! │   ├── card.dart
//! │   └── list.dart
//! └── main.dart
//! ```
//!
//! Directories come first, then files, each group ordered by lowercase name.
//! Excluded names are hidden whether they are files or directories, and files
//! failing the extension filter are hidden before connectors are assigned, so
//! the last visible line always gets `└── `.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use toolbelt_core::config::CombineConfig;

const BRANCH: &str = "├── ";
const LAST: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Render the tree below `dir` (the root itself is not printed).
pub fn render_tree(dir: &Path, cfg: &CombineConfig) -> String {
    let mut out = String::new();
    render_into(dir, "", cfg, &mut out);
    out
}

struct Item {
    name: String,
    is_dir: bool,
}

fn render_into(dir: &Path, prefix: &str, cfg: &CombineConfig, out: &mut String) {
    if !dir.exists() {
        out.push_str(&format!("{prefix}[Dir Not Found: {}]\n", dir.display()));
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            out.push_str(&format!("{prefix}[Permission Denied]\n"));
            return;
        }
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot list directory");
            out.push_str(&format!("{prefix}[Unreadable: {e}]\n"));
            return;
        }
    };

    // Symlinks are not followed, so a link loop cannot recurse forever.
    let mut items: Vec<Item> = entries
        .filter_map(Result::ok)
        .map(|e| Item {
            name: e.file_name().to_string_lossy().into_owned(),
            is_dir: e.file_type().map(|t| t.is_dir()).unwrap_or(false),
        })
        .filter(|item| !cfg.is_excluded(&item.name))
        .filter(|item| item.is_dir || cfg.accepts_extension(Path::new(&item.name)))
        .collect();

    items.sort_by_key(|item| (!item.is_dir, item.name.to_lowercase()));

    let count = items.len();
    for (i, item) in items.iter().enumerate() {
        let last = i + 1 == count;
        let connector = if last { LAST } else { BRANCH };
        if item.is_dir {
            out.push_str(&format!("{prefix}{connector}{}/\n", item.name));
            let child_prefix = format!("{prefix}{}", if last { SPACE } else { PIPE });
            render_into(&dir.join(&item.name), &child_prefix, cfg, out);
        } else {
            out.push_str(&format!("{prefix}{connector}{}\n", item.name));
        }
    }
}
