use crate::transform::TransformOutput;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub output: TransformOutput,
}

pub struct IncrementalCache {
    cache_dir: PathBuf,
}

impl IncrementalCache {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        if !cache_dir.exists() {
            if let Err(e) = fs::create_dir_all(&cache_dir) {
                warn!(dir = %cache_dir.display(), error = %e, "could not create cache directory");
            }
        }
        Self { cache_dir }
    }

    /// Hash of everything that affects a transform: source, stylesheet and options.
    pub fn compute_hash(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            // Separator so ("ab", "c") and ("a", "bc") differ.
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    fn get_cache_path(&self, file_path: &str) -> PathBuf {
        let safe_name = file_path
            .replace("/", "_")
            .replace("\\", "_")
            .replace(":", "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(&self, file_path: &str, hash: &str) -> Option<TransformOutput> {
        let cache_path = self.get_cache_path(file_path);
        if !cache_path.exists() {
            return None;
        }

        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                warn!(file = file_path, error = %e, "dropping corrupt cache entry");
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        if entry.hash == hash {
            Some(entry.output)
        } else {
            None
        }
    }

    pub fn set(&self, file_path: &str, hash: &str, output: &TransformOutput) {
        let cache_path = self.get_cache_path(file_path);
        let entry = CacheEntry {
            hash: hash.to_string(),
            output: output.clone(),
        };

        match serde_json::to_string(&entry) {
            Ok(data) => {
                if let Err(e) = fs::write(&cache_path, data) {
                    warn!(file = file_path, error = %e, "could not write cache entry");
                }
            }
            Err(e) => warn!(file = file_path, error = %e, "could not serialize cache entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{transform_source, TransformOptions};

    const SOURCE: &str = "export default () => <View className='flex' />";

    fn output() -> TransformOutput {
        transform_source(SOURCE, "a.jsx", None, &TransformOptions::default()).unwrap()
    }

    #[test]
    fn test_hit_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::new(dir.path().join("cache"));
        let hash = IncrementalCache::compute_hash(&[SOURCE, "", "{}"]);

        assert!(cache.get("src/a.jsx", &hash).is_none());
        cache.set("src/a.jsx", &hash, &output());

        let hit = cache.get("src/a.jsx", &hash).unwrap();
        assert_eq!(hit.code, output().code);
        assert!(cache.get("src/a.jsx", "other").is_none());
    }

    #[test]
    fn test_hash_parts_are_separated() {
        assert_ne!(
            IncrementalCache::compute_hash(&["ab", "c"]),
            IncrementalCache::compute_hash(&["a", "bc"])
        );
    }

    #[test]
    fn test_corrupt_entry_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::new(dir.path());
        let path = dir.path().join("src_a.jsx.json");
        fs::write(&path, "{not json").unwrap();

        assert!(cache.get("src/a.jsx", "h").is_none());
        assert!(!path.exists());
    }
}
