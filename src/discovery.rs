//! Discovery Module
//!
//! Finds component sources under a directory and transforms them in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cache::IncrementalCache;
use crate::parse::parse_component;
use crate::transform::{transform_source, TransformOptions, TransformOutput};
use crate::validate::{CompilerError, ComponentIR, ERR_IO};

/// Extensions of component sources.
const COMPONENT_EXTENSIONS: &[&str] = &["jsx", "tsx"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub outputs: Vec<(PathBuf, TransformOutput)>,
    pub failures: Vec<(PathBuf, CompilerError)>,
}

impl BatchReport {
    pub fn diagnostic_count(&self) -> usize {
        self.outputs.iter().map(|(_, o)| o.diagnostics.len()).sum()
    }
}

pub fn find_component_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        if let Ok(entry) = entry {
            let path = entry.path();
            if path.is_file() {
                if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                    if COMPONENT_EXTENSIONS.contains(&ext) {
                        files.push(path.to_path_buf());
                    }
                }
            }
        }
    }

    files.sort();
    files
}

/// First style import of the component that exists next to it.
pub fn companion_stylesheet(path: &Path, component: &ComponentIR) -> Option<PathBuf> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    component
        .style_imports
        .iter()
        .map(|import| dir.join(import))
        .find(|candidate| candidate.is_file())
}

fn io_error(path: &Path, e: std::io::Error) -> CompilerError {
    CompilerError::new(
        ERR_IO,
        &format!("Failed to read file: {}", e),
        &path.to_string_lossy(),
        0,
        0,
    )
}

/// Read one component and its stylesheet, then transform it, consulting the
/// cache when one is given.
pub fn transform_file(
    path: &Path,
    options: &TransformOptions,
    cache: Option<&IncrementalCache>,
) -> Result<TransformOutput, CompilerError> {
    let path_str = path.to_string_lossy().to_string();
    let source = fs::read_to_string(path).map_err(|e| io_error(path, e))?;

    // Parsed once up front to find the stylesheet import.
    let component = parse_component(&source, &path_str, options)?;
    let stylesheet = match companion_stylesheet(path, &component) {
        Some(sheet_path) => {
            Some(fs::read_to_string(&sheet_path).map_err(|e| io_error(&sheet_path, e))?)
        }
        None => {
            if !component.style_imports.is_empty() {
                debug!(file = path_str.as_str(), imports = ?component.style_imports, "stylesheet not found");
            }
            None
        }
    };

    let options_json = serde_json::to_string(options).unwrap_or_default();
    let hash = IncrementalCache::compute_hash(&[
        source.as_str(),
        stylesheet.as_deref().unwrap_or_default(),
        options_json.as_str(),
    ]);
    if let Some(hit) = cache.and_then(|c| c.get(&path_str, &hash)) {
        debug!(file = path_str.as_str(), "cache hit");
        return Ok(hit);
    }

    let output = transform_source(&source, &path_str, stylesheet.as_deref(), options)?;
    if let Some(cache) = cache {
        cache.set(&path_str, &hash, &output);
    }
    Ok(output)
}

pub fn transform_directory(
    dir: &Path,
    options: &TransformOptions,
    cache: Option<&IncrementalCache>,
) -> BatchReport {
    let files = find_component_files(dir);
    info!(dir = %dir.display(), files = files.len(), "transforming components");

    let results: Vec<(PathBuf, Result<TransformOutput, CompilerError>)> = files
        .into_par_iter()
        .map(|path| {
            let result = transform_file(&path, options, cache);
            (path, result)
        })
        .collect();

    let mut report = BatchReport::default();
    for (path, result) in results {
        match result {
            Ok(output) => report.outputs.push((path, output)),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "component failed");
                report.failures.push((path, e));
            }
        }
    }
    report.outputs.sort_by(|a, b| a.0.cmp(&b.0));
    report.failures.sort_by(|a, b| a.0.cmp(&b.0));
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_find_component_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b/index.tsx", "");
        write(dir.path(), "a/index.jsx", "");
        write(dir.path(), "a/index.scss", "");
        write(dir.path(), "a/util.js", "");

        let files = find_component_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a/index.jsx", "b/index.tsx"]);
    }

    #[test]
    fn test_transform_directory_with_stylesheet() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "page/index.jsx",
            "import './index.scss'\nexport default () => <View className='a' />\n",
        );
        write(dir.path(), "page/index.scss", ".a { color: red; }");
        write(dir.path(), "broken/index.jsx", "export default () => <View");

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::new(cache_dir.path());
        let report = transform_directory(dir.path(), &TransformOptions::default(), Some(&cache));

        assert_eq!(report.outputs.len(), 1);
        assert!(report.outputs[0].1.code.contains(r#"style="color:red;""#));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].0.ends_with("broken/index.jsx"));

        // Second run is served from the cache and must be identical.
        let again = transform_directory(dir.path(), &TransformOptions::default(), Some(&cache));
        assert_eq!(again.outputs[0].1.code, report.outputs[0].1.code);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = transform_file(Path::new("/nonexistent/x.jsx"), &TransformOptions::default(), None)
            .unwrap_err();
        assert_eq!(err.code, ERR_IO);
    }
}
