use crate::bitmap::PackError;
use crate::memory::AllocationError;
use std::string::FromUtf16Error;
use thiserror::Error;

/// Errors raised while moving arrays across the host boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot pack validity bitmap: {0}")]
    BitPackValidity(#[from] PackError),
    #[error("cannot decode time zone: {0}")]
    UnicodeConversion(#[from] FromUtf16Error),
    #[error("unknown time unit: {0:?}")]
    UnknownTimeUnit(String),
    #[error("temporal arrays need a time unit and a time zone")]
    MissingTemporalMetadata,
    #[error("cannot allocate host array: {0}")]
    Allocation(#[from] AllocationError),
}

impl Error {
    /// Returns a stable identifier the host can match on.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::BitPackValidity(_) => "colbridge:array:BitPackValidityError",
            Self::UnicodeConversion(_) => "colbridge:unicode:UnicodeConversionError",
            Self::UnknownTimeUnit(_) => "colbridge:type:UnknownTimeUnitError",
            Self::MissingTemporalMetadata => "colbridge:type:MissingTemporalMetadataError",
            Self::Allocation(_) => "colbridge:memory:AllocationError",
        }
    }
}
