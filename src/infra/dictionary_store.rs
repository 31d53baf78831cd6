// ============================================================
// Layer 6 — Dictionary Store
// ============================================================
// Builds the question/answer dictionaries over the full
// training split and caches them as JSON next to the question
// files:
//
//   <root>/questions/CLEVR_built_dictionaries.json
//
// Both train and extract runs go through here, so every run
// sees the exact same token → id assignment. The cache is JSON
// rather than a binary blob on purpose — it doubles as a
// human-inspectable vocabulary file.
//
// An unreadable cache is rebuilt with a warning, never a hard
// failure: the training questions are the source of truth.

use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};

use crate::data::questions;
use crate::domain::dictionary::Dictionaries;

const CACHE_FILENAME: &str = "CLEVR_built_dictionaries.json";

pub struct DictionaryStore {
    questions_dir: PathBuf,
}

impl DictionaryStore {
    pub fn new(clevr_dir: &Path) -> Self {
        Self { questions_dir: clevr_dir.join("questions") }
    }

    /// Load cached dictionaries or build them from the training
    /// questions and cache the result.
    pub fn load_or_build(&self) -> Result<Dictionaries> {
        let cache = self.questions_dir.join(CACHE_FILENAME);

        if cache.exists() {
            match self.load(&cache) {
                Ok(dicts) => {
                    tracing::info!("Loaded cached dictionaries from '{}'", cache.display());
                    return Ok(dicts);
                }
                Err(e) => {
                    tracing::warn!(
                        "Dictionary cache '{}' unreadable ({}) — rebuilding",
                        cache.display(),
                        e
                    );
                }
            }
        }

        self.build_and_save(&cache)
    }

    fn load(&self, cache: &Path) -> Result<Dictionaries> {
        let json = fs::read_to_string(cache)
            .with_context(|| format!("Cannot read '{}'", cache.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn build_and_save(&self, cache: &Path) -> Result<Dictionaries> {
        let train_json = self.questions_dir.join("CLEVR_train_questions.json");
        tracing::info!("Building word dictionaries from all the words in the dataset...");
        let records = questions::load_questions(&train_json)?;
        let dicts = Dictionaries::build(&records);
        tracing::info!(
            "Dictionaries built: {} question words, {} answers",
            dicts.questions.len(),
            dicts.answers.len(),
        );

        // Best-effort cache write
        match serde_json::to_string_pretty(&dicts) {
            Ok(json) => {
                if let Err(e) = fs::write(cache, json) {
                    tracing::warn!("Cannot write dictionary cache '{}': {}", cache.display(), e);
                }
            }
            Err(e) => tracing::warn!("Cannot serialise dictionaries: {}", e),
        }

        Ok(dicts)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "questions": [
            {"image_filename": "a.png", "question": "How many cubes?", "answer": "2"},
            {"image_filename": "b.png", "question": "Is it red?", "answer": "no"}
        ]
    }"#;

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir()
            .join(format!("clevr_rn_dicts_{}_{}", name, std::process::id()));
        fs::create_dir_all(root.join("questions")).unwrap();
        fs::write(
            root.join("questions").join("CLEVR_train_questions.json"),
            SAMPLE_JSON,
        )
        .unwrap();
        root
    }

    #[test]
    fn test_builds_and_caches() {
        let root = temp_root("build");
        let store = DictionaryStore::new(&root);

        let built = store.load_or_build().unwrap();
        assert_eq!(built.answers.len(), 2);
        assert!(root.join("questions").join(CACHE_FILENAME).exists());

        // Second call goes through the cache and agrees
        let cached = store.load_or_build().unwrap();
        assert_eq!(built, cached);
    }

    #[test]
    fn test_corrupt_cache_is_rebuilt() {
        let root = temp_root("corrupt");
        fs::write(root.join("questions").join(CACHE_FILENAME), "{broken").unwrap();
        let dicts = DictionaryStore::new(&root).load_or_build().unwrap();
        assert_eq!(dicts.answers.len(), 2);
    }
}
