// ============================================================
// Layer 3 — Question / Answer Dictionaries
// ============================================================
// Maps lowercase tokens to integer ids.
//
// Indexing is ONE-BASED: id 0 is reserved for sequence padding
// and is never assigned to a real token. The batcher pads
// variable-length question sequences with 0, and the answer id
// is shifted down by one at batch time to become a zero-based
// class index.
//
// Ids are assigned in first-seen order while scanning the
// training questions, so building is deterministic for a fixed
// input order.
//
// Reference: Rust Book §8 (HashMaps)

use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::question::QuestionRecord;

/// A single token → id mapping with one-based ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    token_to_id: HashMap<String, u32>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `token`, assigning the next free id
    /// (len + 1, so the first token gets id 1) if it is new.
    pub fn get_or_insert(&mut self, token: &str) -> u32 {
        if let Some(&id) = self.token_to_id.get(token) {
            return id;
        }
        let id = self.token_to_id.len() as u32 + 1;
        self.token_to_id.insert(token.to_string(), id);
        id
    }

    pub fn id_of(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Number of distinct tokens (the padding id 0 is not counted)
    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_to_id.is_empty()
    }
}

/// The pair of dictionaries built over the training split:
/// one for question words, one for whole answer strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionaries {
    pub questions: Dictionary,
    pub answers:   Dictionary,
}

impl Dictionaries {
    /// Scan every record and assign ids in first-seen order.
    ///
    /// Question text is split on whitespace and lowercased, with
    /// no further normalisation — "cylinder?" and "cylinder" are
    /// distinct tokens, exactly as they appear in the data.
    /// Answers are lowercased whole strings.
    pub fn build(records: &[QuestionRecord]) -> Self {
        let mut dicts = Self::default();
        for record in records {
            for word in record.question.split_whitespace() {
                dicts.questions.get_or_insert(&word.to_lowercase());
            }
            dicts.answers.get_or_insert(&record.answer.to_lowercase());
        }
        dicts
    }

    /// Encode a question string into its token id sequence.
    /// Fails on words never seen at dictionary-build time.
    pub fn encode_question(&self, text: &str) -> Result<Vec<u32>> {
        text.split_whitespace()
            .map(|word| {
                let w = word.to_lowercase();
                match self.questions.id_of(&w) {
                    Some(id) => Ok(id),
                    None => bail!("word '{}' is not in the question dictionary", w),
                }
            })
            .collect()
    }

    /// Encode an answer string into its one-based answer id.
    pub fn encode_answer(&self, answer: &str) -> Result<u32> {
        let a = answer.to_lowercase();
        match self.answers.id_of(&a) {
            Some(id) => Ok(id),
            None => bail!("answer '{}' is not in the answer dictionary", a),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<QuestionRecord> {
        vec![
            QuestionRecord::new("img_0.png", "How many red cubes are there?", "2"),
            QuestionRecord::new("img_1.png", "Are there red spheres?", "yes"),
            QuestionRecord::new("img_2.png", "How many spheres are there?", "2"),
        ]
    }

    #[test]
    fn test_ids_are_one_based() {
        let dicts = Dictionaries::build(&records());
        assert_eq!(dicts.questions.id_of("how"), Some(1));
        assert_eq!(dicts.answers.id_of("2"), Some(1));
        assert_eq!(dicts.answers.id_of("yes"), Some(2));
    }

    #[test]
    fn test_encoding_never_produces_zero() {
        let dicts = Dictionaries::build(&records());
        for record in records() {
            let ids = dicts.encode_question(&record.question).unwrap();
            assert!(ids.iter().all(|&id| id > 0));
            assert!(dicts.encode_answer(&record.answer).unwrap() > 0);
        }
    }

    #[test]
    fn test_building_is_deterministic() {
        let a = Dictionaries::build(&records());
        let b = Dictionaries::build(&records());
        assert_eq!(a, b);
    }

    #[test]
    fn test_tokens_are_lowercased() {
        let dicts = Dictionaries::build(&records());
        // "How" was seen capitalised but is stored lowercase
        assert!(dicts.questions.id_of("how").is_some());
        assert!(dicts.questions.id_of("How").is_none());
        // encoding is case-insensitive
        let a = dicts.encode_question("how many RED cubes are there?").unwrap();
        let b = dicts.encode_question("How many red cubes are there?").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_punctuation_stays_attached() {
        let dicts = Dictionaries::build(&records());
        // whitespace split only: "there?" is its own token
        assert!(dicts.questions.id_of("there?").is_some());
        assert!(dicts.questions.id_of("there").is_none());
    }

    #[test]
    fn test_unknown_word_is_an_error() {
        let dicts = Dictionaries::build(&records());
        assert!(dicts.encode_question("purple cubes").is_err());
        assert!(dicts.encode_answer("rubber").is_err());
    }
}
