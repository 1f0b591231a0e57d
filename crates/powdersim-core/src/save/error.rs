use thiserror::Error;

/// Why a save buffer could not be read
///
/// Parsing never touches a live simulation, so any of these leaves the
/// caller's state exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Save too small")]
    TooSmall,

    #[error("Save format from newer version")]
    NewerFormat,

    /// PSv / fuC saves predate the OPS container
    #[error("Legacy PSv saves are not supported")]
    UnsupportedLegacyFormat,

    #[error("Invalid save format")]
    InvalidFormat,

    #[error("Incorrect CELL size")]
    WrongCellSize,

    #[error("Save too large")]
    RegionTooLarge,

    /// Declared document size is over the 200 MB cap (or wraps)
    #[error("Save data too large")]
    PayloadTooLarge,

    #[error("Unable to decompress ({0})")]
    DecompressionFailed(String),

    #[error("BSON error when parsing save: {0}")]
    Bson(String),

    /// A grid or position blob is shorter than the region needs
    #[error("Not enough {0} data")]
    NotEnoughData(&'static str),

    /// A particle record runs past the end of the particle blob
    #[error("Ran past particle data buffer while loading {0}")]
    TruncatedField(&'static str),

    #[error("Too many particles")]
    TooManyParticles,

    #[error("Particle out of range")]
    PositionOutOfRange,

    #[error("Didn't reach end of particle data buffer")]
    TrailingParticleData,
}

/// Why a save could not be serialised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Save error, could not compress ({0})")]
    Compression(String),

    #[error("Save error, document of {0} bytes does not fit the header")]
    DocumentTooLarge(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_save_format_wording() {
        assert_eq!(ParseError::WrongCellSize.to_string(), "Incorrect CELL size");
        assert_eq!(ParseError::PayloadTooLarge.to_string(), "Save data too large");
        assert_eq!(
            ParseError::TruncatedField("life").to_string(),
            "Ran past particle data buffer while loading life"
        );
        assert_eq!(
            ParseError::NotEnoughData("wall").to_string(),
            "Not enough wall data"
        );
    }
}
