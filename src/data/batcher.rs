// ============================================================
// Layer 4 — CLEVR Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<ClevrSample>
// into GPU-ready tensors.
//
// Unlike the images, question token sequences arrive with
// different lengths, so collation has real work to do here:
// every sequence is right-padded with id 0 (the reserved
// padding id) up to the longest sequence in the batch, giving a
// fixed-shape [batch, max_len] Int tensor.
//
// Answer ids are one-based in the dictionary; the loss wants a
// zero-based class index, so the shift by -1 happens here, at
// the boundary between data and model.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::{ClevrSample, ImageSample};
use crate::data::transform::IMAGE_SIZE;

// ─── ClevrBatch ───────────────────────────────────────────────────────────────
/// A batch of (image, question, answer) samples. All tensors
/// have batch_size as their first dimension.
#[derive(Debug, Clone)]
pub struct ClevrBatch<B: Backend> {
    /// Image pixels — shape: [batch_size, 3, 128, 128]
    pub images: Tensor<B, 4>,

    /// Padded question token ids — shape: [batch_size, max_len]
    pub questions: Tensor<B, 2, Int>,

    /// True (unpadded) token count per question — shape:
    /// [batch_size]. The model reads its LSTM output at this
    /// position, not after the padding.
    pub question_lengths: Tensor<B, 1, Int>,

    /// Zero-based answer class indices — shape: [batch_size]
    pub answers: Tensor<B, 1, Int>,
}

/// Right-pad every sequence with 0 to the longest length in the
/// batch and flatten row-major. Returns (flat ids, padded len).
pub fn pad_question_ids(questions: &[Vec<u32>]) -> (Vec<i32>, usize) {
    let max_len = questions.iter().map(|q| q.len()).max().unwrap_or(0).max(1);

    let mut flat = Vec::with_capacity(questions.len() * max_len);
    for q in questions {
        flat.extend(q.iter().map(|&id| id as i32));
        flat.extend(std::iter::repeat(0).take(max_len - q.len()));
    }
    (flat, max_len)
}

/// True token count of every question, before padding. Clamped
/// to at least 1 so an empty sequence still has a last position
/// to read the LSTM output from.
pub fn question_lengths(questions: &[Vec<u32>]) -> Vec<i32> {
    questions.iter().map(|q| q.len().max(1) as i32).collect()
}

// ─── ClevrBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ClevrBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ClevrBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ClevrSample, ClevrBatch<B>> for ClevrBatcher<B> {
    fn batch(&self, items: Vec<ClevrSample>) -> ClevrBatch<B> {
        let batch_size = items.len();
        let side = IMAGE_SIZE as usize;

        let pixels_flat: Vec<f32> = items.iter().flat_map(|s| s.pixels.iter().copied()).collect();
        let images = Tensor::<B, 1>::from_floats(pixels_flat.as_slice(), &self.device)
            .reshape([batch_size, 3, side, side]);

        let question_ids: Vec<Vec<u32>> = items.iter().map(|s| s.question.clone()).collect();
        let (question_flat, max_len) = pad_question_ids(&question_ids);
        let questions = Tensor::<B, 1, Int>::from_ints(question_flat.as_slice(), &self.device)
            .reshape([batch_size, max_len]);

        let lengths = question_lengths(&question_ids);
        let question_lengths =
            Tensor::<B, 1, Int>::from_ints(lengths.as_slice(), &self.device);

        // one-based dictionary id → zero-based class index
        let answer_classes: Vec<i32> = items.iter().map(|s| s.answer as i32 - 1).collect();
        let answers = Tensor::<B, 1, Int>::from_ints(answer_classes.as_slice(), &self.device);

        ClevrBatch { images, questions, question_lengths, answers }
    }
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
/// Images-only batch for feature extraction.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Image pixels — shape: [batch_size, 3, 128, 128]
    pub images: Tensor<B, 4>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();
        let side = IMAGE_SIZE as usize;

        let pixels_flat: Vec<f32> = items.iter().flat_map(|s| s.pixels.iter().copied()).collect();
        let images = Tensor::<B, 1>::from_floats(pixels_flat.as_slice(), &self.device)
            .reshape([batch_size, 3, side, side]);

        ImageBatch { images }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_to_longest_in_batch() {
        let questions = vec![vec![5, 6], vec![1, 2, 3, 4], vec![9]];
        let (flat, max_len) = pad_question_ids(&questions);
        assert_eq!(max_len, 4);
        assert_eq!(
            flat,
            vec![5, 6, 0, 0, 1, 2, 3, 4, 9, 0, 0, 0]
        );
    }

    #[test]
    fn test_equal_lengths_need_no_padding() {
        let questions = vec![vec![1, 2], vec![3, 4]];
        let (flat, max_len) = pad_question_ids(&questions);
        assert_eq!(max_len, 2);
        assert!(!flat.contains(&0));
    }

    #[test]
    fn test_lengths_track_unpadded_sizes() {
        let questions = vec![vec![5, 6], vec![1, 2, 3, 4], vec![9]];
        assert_eq!(question_lengths(&questions), vec![2, 4, 1]);
    }

    #[test]
    fn test_empty_question_length_clamped_to_one() {
        assert_eq!(question_lengths(&[vec![]]), vec![1]);
    }

    #[test]
    fn test_empty_batch() {
        let (flat, max_len) = pad_question_ids(&[]);
        assert!(flat.is_empty());
        assert_eq!(max_len, 1);
    }
}
