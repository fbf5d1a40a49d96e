// Analysis module - from a sample to a confirmed word
//
// Pipeline per poll:
// - Classifier: motion gate -> normalization -> finger states + palm -> first matching rule
// - Stabilizer: N consecutive identical labels confirm a gesture once
// - DeltaTrigger: alternative source firing a word on large flex movement

pub mod classifier;
pub mod delta;
pub mod rules;
pub mod stabilizer;

pub use classifier::{Classification, Classifier};
pub use delta::{DeltaEvent, DeltaTrigger};
pub use rules::{FingerMatch, PalmConstraint, Rule, RuleTable};
pub use stabilizer::{Confirmation, Stabilizer, StabilizerPhase};
