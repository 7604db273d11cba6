//! Static name corpora and on-disk project fixtures used across harnesses.

use std::fs;
use std::path::Path;

/// Display names that survive normalization, with the identifier each yields.
pub const NAMES_CLEAN: &[(&str, &str)] = &[
    ("New York - Branch  Office", "new_york_branch_office"),
    ("  -Admin-  ", "admin"),
    ("branch_1", "branch_1"),
    ("Head Office", "head_office"),
    ("R&D", "rd"),
    ("Sales (EMEA)", "sales_emea"),
    ("__private__", "private"),
    ("Café Zürich", "caf_zrich"),
    ("2nd Floor / West", "2nd_floor_west"),
];

/// Display names with nothing usable in them.
pub const NAMES_UNUSABLE: &[&str] = &["", "!!!", "   ", "---", "___", "日本語", "🚀🚀", "- _ -"];

/// A small Flutter-style project:
///
/// ```text
/// root/
/// ├── .git/HEAD
/// ├── assets/config.json
/// ├── lib/
/// │   ├── build/generated.dart
/// │   ├── main.dart
/// │   └── src/
/// │       ├── app.dart
/// │       └── notes.md
/// ├── pubspec.yaml
/// ├── README.md
/// └── windows/runner/main.cpp
/// ```
pub fn write_project(root: &Path) -> std::io::Result<()> {
    let files: &[(&str, &str)] = &[
        (".git/HEAD", "ref: refs/heads/main\n"),
        ("assets/config.json", "{\"theme\": \"dark\"}\n"),
        ("lib/build/generated.dart", "// generated\n"),
        ("lib/main.dart", "void main() => runApp(const App());\n"),
        ("lib/src/app.dart", "class App {}\n"),
        ("lib/src/notes.md", "# notes\n"),
        ("pubspec.yaml", "name: walld\n"),
        ("README.md", "# walld\n"),
        ("windows/runner/main.cpp", "int main() { return 0; }\n"),
    ];
    for (rel, body) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, body)?;
    }
    Ok(())
}

/// A release folder as produced by a desktop build.
pub fn write_release(root: &Path) -> std::io::Result<()> {
    fs::create_dir_all(root.join("data/flutter_assets"))?;
    fs::write(root.join("walld.exe"), b"MZ\x90\x00")?;
    fs::write(root.join("flutter_windows.dll"), vec![0u8; 4096])?;
    fs::write(root.join("data/icudtl.dat"), b"icu")?;
    fs::write(root.join("data/flutter_assets/AssetManifest.json"), b"{}")?;
    Ok(())
}

/// Service-account JSON key signed with the store crate's test RSA key.
pub fn service_account_json(token_uri: &str) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "walld",
        "private_key_id": "test",
        "private_key": include_str!("../../crates/toolbelt-store/testdata/test_key.pem"),
        "client_email": "migrator@walld.iam.gserviceaccount.com",
        "token_uri": token_uri,
    })
    .to_string()
}
