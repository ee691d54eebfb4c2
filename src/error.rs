use thiserror::Error;

/// A container index that does not exist in the current level.
///
/// This never comes from legitimate play: a correct presentation layer only
/// produces indices it received from the level. It is returned as an error
/// instead of being absorbed so that caller bugs surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("container index {index} out of range for a level with {len} containers")]
pub struct InvalidIndex {
    pub index: usize,
    pub len: usize,
}

impl InvalidIndex {
    /// Returns `Ok(index)` if it addresses one of `len` containers.
    pub fn check(index: usize, len: usize) -> Result<usize, InvalidIndex> {
        if index < len {
            Ok(index)
        } else {
            Err(InvalidIndex { index, len })
        }
    }
}
