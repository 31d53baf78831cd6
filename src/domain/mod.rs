// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types for the core concepts of the system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs and methods
//
// Why keep this layer pure?
//   - Easy to unit test (no GPU needed)
//   - Easy to understand (no framework noise)
//
// Reference: Rust Book §5 (Structs), §8 (Collections)

// A single (question, answer, image) record from the CLEVR question files
pub mod question;

// Word/answer dictionaries with one-based ids (0 reserved for padding)
pub mod dictionary;
