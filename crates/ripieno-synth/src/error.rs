use thiserror::Error;

/// Errors from the engine's control surface. The realtime path never
/// returns errors; it degrades to silence and counts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthError {
    #[error("no bank at index {0}")]
    UnknownBank(usize),
}
