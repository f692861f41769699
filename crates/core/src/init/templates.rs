//! Embedded template files for `.autocrea` initialization.
//!
//! The workspace `templates/` directory is embedded into the binary at
//! compile time with `rust-embed`, so `autocrea init` needs no files at
//! runtime.

use rust_embed::RustEmbed;

/// `CARGO_MANIFEST_DIR` is `crates/core`, so `../../templates` is the
/// workspace `templates/` directory.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../templates"]
pub struct TemplateAssets;

/// Template content by path relative to the templates root, e.g.
/// `"roles/architect.md"`.
///
/// ```
/// use ac_core::init::templates::get_template;
///
/// let config = get_template("config.toml").expect("config.toml should exist");
/// assert!(config.contains("[generation]"));
/// ```
pub fn get_template(path: &str) -> Option<String> {
    TemplateAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

/// All template paths under `prefix`, sorted.
pub fn list_templates(prefix: &str) -> Vec<String> {
    let mut paths: Vec<String> = TemplateAssets::iter()
        .filter(|path| path.starts_with(prefix))
        .map(|path| path.to_string())
        .collect();
    paths.sort();
    paths
}
