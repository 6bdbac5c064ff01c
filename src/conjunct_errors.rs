use hifitime::Epoch;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConjunctError {
    #[error("Invalid search mode: {0} (expected 'mid' or 'end')")]
    InvalidSearchMode(String),

    #[error("Invalid search parameter: {0}")]
    InvalidSearchParameter(String),

    #[error("Invalid time grid: {0}")]
    InvalidTimeGrid(String),

    #[error("No ephemeris for target {target} after {cutoff}")]
    EphemerisUnavailable { target: String, cutoff: Epoch },

    #[error("Ephemeris query failed: {0}")]
    EphemerisQueryError(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Invalid catalog record: {0}")]
    InvalidCatalogRecord(String),

    #[error("Unable to parse element set: {0}")]
    TleParseError(String),

    #[error("Unable to parse ESA close approach list: {0}")]
    EsaParseError(String),

    #[error("System clock error: {0}")]
    ClockError(String),

    #[error("HTTP ureq error: {0}")]
    UreqHttpError(#[from] ureq::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl PartialEq for ConjunctError {
    fn eq(&self, other: &Self) -> bool {
        use ConjunctError::*;
        match (self, other) {
            (InvalidSearchMode(a), InvalidSearchMode(b)) => a == b,
            (InvalidSearchParameter(a), InvalidSearchParameter(b)) => a == b,
            (InvalidTimeGrid(a), InvalidTimeGrid(b)) => a == b,
            (
                EphemerisUnavailable {
                    target: t1,
                    cutoff: c1,
                },
                EphemerisUnavailable {
                    target: t2,
                    cutoff: c2,
                },
            ) => t1 == t2 && c1 == c2,
            (EphemerisQueryError(a), EphemerisQueryError(b)) => a == b,
            (CatalogUnavailable(a), CatalogUnavailable(b)) => a == b,
            (InvalidCatalogRecord(a), InvalidCatalogRecord(b)) => a == b,
            (TleParseError(a), TleParseError(b)) => a == b,
            (EsaParseError(a), EsaParseError(b)) => a == b,
            (ClockError(a), ClockError(b)) => a == b,

            // not comparable: equal when the variant matches
            (UreqHttpError(_), UreqHttpError(_)) => true,
            (IoError(_), IoError(_)) => true,

            _ => false,
        }
    }
}
