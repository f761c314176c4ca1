pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The key was appended before, and has not been cleared since.
    ///
    /// This includes keys whose item was deleted: tombstoned slots keep their
    /// key until the set is cleared or compacted.
    ///
    /// `slot` is the slot already holding the key. Sets without slots report
    /// `0`.
    #[error("Duplicate key, already assigned to slot {slot}")]
    DuplicateKey { slot: usize },
}
