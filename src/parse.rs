use crate::error::{WoffError, bail_if};

/// A fixed-size big-endian record.
pub trait Parse: Sized {
    /// Size of the encoded record in bytes
    const SIZE: usize;

    /// Decode the record from the first [`Self::SIZE`] bytes of `input`.
    fn parse(input: &[u8]) -> Result<Self, WoffError>;

    /// Fail unless `input` holds a whole record.
    fn check_size(input: &[u8]) -> Result<(), WoffError> {
        bail_if!(
            input.len() < Self::SIZE,
            WoffError::UnexpectedEof {
                requested: Self::SIZE,
                available: input.len(),
            }
        );
        Ok(())
    }
}
