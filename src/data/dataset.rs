use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;

use crate::data::{questions, transform};
use crate::domain::dictionary::Dictionaries;
use crate::domain::question::QuestionRecord;

/// Which CLEVR split to read. Train gets augmentation, val does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
}

impl Split {
    fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
}

/// One training sample, already encoded and pixel-decoded.
#[derive(Debug, Clone)]
pub struct ClevrSample {
    /// CHW f32 pixels, 3 * 128 * 128
    pub pixels: Vec<f32>,
    /// One-based question token ids, variable length
    pub question: Vec<u32>,
    /// One-based answer id
    pub answer: u32,
}

/// A question record with its text already mapped to ids.
/// Encoding happens once at construction so that dictionary
/// misses surface as a normal error instead of failing deep
/// inside a dataloader worker.
#[derive(Debug, Clone)]
struct EncodedQuestion {
    image_filename: String,
    question_ids:   Vec<u32>,
    answer_id:      u32,
}

/// The (image, question, answer) dataset over one CLEVR split.
/// Images are decoded lazily in `get` so the dataloader workers
/// parallelise the PNG decoding.
pub struct ClevrDataset {
    entries: Vec<EncodedQuestion>,
    img_dir: PathBuf,
    augment: bool,
}

impl ClevrDataset {
    /// Read `<root>/questions/CLEVR_{split}_questions.json` (via
    /// its cache) and encode every record with `dictionaries`.
    pub fn for_split(clevr_dir: &Path, split: Split, dictionaries: &Dictionaries) -> Result<Self> {
        let json_path = clevr_dir
            .join("questions")
            .join(format!("CLEVR_{}_questions.json", split.name()));
        let records = questions::load_questions(&json_path)?;
        let img_dir = clevr_dir.join("images").join(split.name());
        Self::from_records(&records, dictionaries, img_dir, split == Split::Train)
    }

    fn from_records(
        records:      &[QuestionRecord],
        dictionaries: &Dictionaries,
        img_dir:      PathBuf,
        augment:      bool,
    ) -> Result<Self> {
        let entries = records
            .iter()
            .map(|r| {
                Ok(EncodedQuestion {
                    image_filename: r.image_filename.clone(),
                    question_ids: dictionaries
                        .encode_question(&r.question)
                        .with_context(|| format!("encoding question '{}'", r.question))?,
                    answer_id: dictionaries.encode_answer(&r.answer)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries, img_dir, augment })
    }

    /// Per-sample weights, inverse to the frequency of the
    /// sample's answer and normalised so the weights sum to the
    /// dataset size: w = n / (num_answers * count(answer)).
    pub fn answer_weights(&self) -> Vec<f64> {
        let counts = self.answer_counts();
        let n = self.entries.len() as f64;
        let k = counts.len() as f64;
        self.entries
            .iter()
            .map(|e| n / (k * counts[&e.answer_id] as f64))
            .collect()
    }

    /// The same weighting folded per answer class, indexed by
    /// zero-based class (answer id - 1). Classes absent from
    /// this split get weight 0. Feeds the cross-entropy loss.
    pub fn answer_class_weights(&self, num_classes: usize) -> Vec<f32> {
        let counts = self.answer_counts();
        let n = self.entries.len() as f64;
        let k = counts.len() as f64;
        (0..num_classes)
            .map(|class| {
                match counts.get(&(class as u32 + 1)) {
                    Some(&count) => (n / (k * count as f64)) as f32,
                    None => 0.0,
                }
            })
            .collect()
    }

    fn answer_counts(&self) -> std::collections::HashMap<u32, usize> {
        let mut counts = std::collections::HashMap::new();
        for e in &self.entries {
            *counts.entry(e.answer_id).or_insert(0) += 1;
        }
        counts
    }
}

impl Dataset<ClevrSample> for ClevrDataset {
    fn get(&self, index: usize) -> Option<ClevrSample> {
        let entry = self.entries.get(index)?;
        let path = self.img_dir.join(&entry.image_filename);

        // The Dataset trait cannot carry errors; a missing or
        // undecodable image aborts the run.
        let pixels = transform::load_pixels(&path, self.augment)
            .unwrap_or_else(|e| panic!("{e:#}"));

        Some(ClevrSample {
            pixels,
            question: entry.question_ids.clone(),
            answer: entry.answer_id,
        })
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// An images-only sample for feature extraction.
#[derive(Debug, Clone)]
pub struct ImageSample {
    pub pixels: Vec<f32>,
}

/// Walks `<root>/images/val/` and yields resized images in
/// filename order, with no questions attached. Feature
/// extraction substitutes zero-padded question placeholders.
pub struct ClevrImageDataset {
    paths: Vec<PathBuf>,
}

impl ClevrImageDataset {
    pub fn new(img_dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(img_dir)
            .with_context(|| format!("Cannot read image directory '{}'", img_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
            .collect();

        // Filename order so feature rows line up with image indices
        paths.sort();

        tracing::info!("Found {} images in '{}'", paths.len(), img_dir.display());
        Ok(Self { paths })
    }
}

impl Dataset<ImageSample> for ClevrImageDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        let path = self.paths.get(index)?;
        let pixels = transform::load_pixels(path, false)
            .unwrap_or_else(|e| panic!("{e:#}"));
        Some(ImageSample { pixels })
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<QuestionRecord> {
        vec![
            QuestionRecord::new("a.png", "How many cubes?", "2"),
            QuestionRecord::new("b.png", "How many spheres?", "2"),
            QuestionRecord::new("c.png", "Is it red?", "yes"),
            QuestionRecord::new("d.png", "How many cubes?", "2"),
        ]
    }

    fn dataset() -> ClevrDataset {
        let recs = records();
        let dicts = Dictionaries::build(&recs);
        ClevrDataset::from_records(&recs, &dicts, PathBuf::from("unused"), false).unwrap()
    }

    #[test]
    fn test_answer_weights_sum_to_dataset_size() {
        let ds = dataset();
        let sum: f64 = ds.answer_weights().iter().sum();
        assert!((sum - ds.len() as f64).abs() < 1e-9);
    }

    #[test]
    fn test_rare_answers_weigh_more() {
        let ds = dataset();
        let weights = ds.answer_weights();
        // "yes" appears once, "2" three times
        assert!(weights[2] > weights[0]);
        assert!((weights[2] / weights[0] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_class_weights_indexed_zero_based() {
        let recs = records();
        let dicts = Dictionaries::build(&recs);
        let ds = dataset();
        let class_weights = ds.answer_class_weights(dicts.answers.len());
        assert_eq!(class_weights.len(), 2);
        // class 0 = answer id 1 = "2" (three samples),
        // class 1 = answer id 2 = "yes" (one sample)
        assert!(class_weights[1] > class_weights[0]);
    }

    #[test]
    fn test_unknown_answer_fails_at_construction() {
        let recs = records();
        let dicts = Dictionaries::build(&recs[..1]);
        let result = ClevrDataset::from_records(&recs, &dicts, PathBuf::from("unused"), false);
        assert!(result.is_err());
    }
}
