// ============================================================
// Layer 4 — Question File Loading
// ============================================================
// Reads `CLEVR_{train,val}_questions.json` and keeps a binary
// cache next to it so subsequent runs skip the (large) JSON
// parse. The train file alone is ~700k questions, so the cache
// pays for itself on the second run.
//
// Cache discipline:
//   - cache file is the JSON path with a `.bin` extension
//   - an unreadable or stale cache is rebuilt with a warning,
//     never a hard failure
//   - a cache that fails to WRITE is also only a warning — the
//     parsed records are still perfectly usable
//
// Reference: Rust Book §9 (Error Handling)

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::question::QuestionRecord;

/// The JSON root object: `{"questions": [...]}`
#[derive(Debug, Deserialize)]
struct QuestionFile {
    questions: Vec<QuestionRecord>,
}

/// Path of the binary cache sibling for a question JSON file.
pub fn cache_path(json_path: &Path) -> PathBuf {
    json_path.with_extension("bin")
}

/// Load question records from `json_path`, going through the
/// binary cache when one exists.
pub fn load_questions(json_path: &Path) -> Result<Vec<QuestionRecord>> {
    let cached = cache_path(json_path);

    if cached.exists() {
        match load_cached(&cached) {
            Ok(records) => {
                tracing::info!("Using cached questions: {}", cached.display());
                return Ok(records);
            }
            Err(e) => {
                tracing::warn!(
                    "Cache '{}' unreadable ({}) — re-parsing JSON",
                    cached.display(),
                    e
                );
            }
        }
    }

    let records = parse_json(json_path)?;

    // Best-effort cache write
    match bincode::serialize(&records) {
        Ok(bytes) => {
            if let Err(e) = fs::write(&cached, bytes) {
                tracing::warn!("Cannot write question cache '{}': {}", cached.display(), e);
            } else {
                tracing::debug!("Cached {} questions to '{}'", records.len(), cached.display());
            }
        }
        Err(e) => tracing::warn!("Cannot serialise question cache: {}", e),
    }

    Ok(records)
}

fn load_cached(cached: &Path) -> Result<Vec<QuestionRecord>> {
    let bytes = fs::read(cached)
        .with_context(|| format!("Cannot read '{}'", cached.display()))?;
    Ok(bincode::deserialize(&bytes)?)
}

fn parse_json(json_path: &Path) -> Result<Vec<QuestionRecord>> {
    tracing::info!("Parsing questions from '{}'", json_path.display());
    let raw = fs::read_to_string(json_path)
        .with_context(|| format!("Cannot read question file '{}'", json_path.display()))?;
    let file: QuestionFile = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed question JSON '{}'", json_path.display()))?;
    Ok(file.questions)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "info": {"split": "train"},
        "questions": [
            {
                "image_index": 0,
                "image_filename": "CLEVR_train_000000.png",
                "question": "How many cubes are there?",
                "answer": "3"
            },
            {
                "image_index": 1,
                "image_filename": "CLEVR_train_000001.png",
                "question": "Is the sphere red?",
                "answer": "yes"
            }
        ]
    }"#;

    fn temp_json(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clevr_rn_test_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("CLEVR_train_questions.json");
        fs::write(&path, SAMPLE_JSON).unwrap();
        path
    }

    #[test]
    fn test_parses_json_and_skips_unknown_fields() {
        let path = temp_json("parse");
        let records = load_questions(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image_filename, "CLEVR_train_000000.png");
        assert_eq!(records[1].answer, "yes");
    }

    #[test]
    fn test_cache_round_trips_equal_to_fresh_parse() {
        let path = temp_json("roundtrip");
        let fresh = load_questions(&path).unwrap();
        assert!(cache_path(&path).exists());
        // Second load goes through the cache
        let cached = load_questions(&path).unwrap();
        assert_eq!(fresh, cached);
    }

    #[test]
    fn test_corrupt_cache_is_rebuilt() {
        let path = temp_json("corrupt");
        fs::write(cache_path(&path), b"not bincode").unwrap();
        let records = load_questions(&path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let missing = Path::new("/nonexistent/CLEVR_train_questions.json");
        assert!(load_questions(missing).is_err());
    }
}
