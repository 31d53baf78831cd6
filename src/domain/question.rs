// ============================================================
// Layer 3 — Question Record Domain Type
// ============================================================
// One entry of a CLEVR question file. The JSON carries more
// fields (program traces, scene indices, ...) — serde skips
// everything we don't declare here.
//
// Reference: Rust Book §5 (Structs)
//            Johnson et al. (2017) CLEVR dataset paper

use serde::{Deserialize, Serialize};

/// A single free-text question with its answer and the filename
/// of the image it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Image filename relative to `<root>/images/{train,val}/`
    pub image_filename: String,

    /// The natural language question, e.g.
    /// "What number of cylinders are small purple things?"
    pub question: String,

    /// The free-text answer, e.g. "2" or "yes"
    pub answer: String,
}

impl QuestionRecord {
    pub fn new(
        image_filename: impl Into<String>,
        question:       impl Into<String>,
        answer:         impl Into<String>,
    ) -> Self {
        Self {
            image_filename: image_filename.into(),
            question:       question.into(),
            answer:         answer.into(),
        }
    }
}
