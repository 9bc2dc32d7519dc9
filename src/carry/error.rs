//! Structural failures of the carry pipeline.
//!
//! Warm-up gaps are not errors: they travel through the pipeline as `NaN`.
//! Everything here aborts the run and names the stage and the input that
//! caused it.

use chrono::NaiveDate;
use std::fmt;

// =============================================================================
// EXPIRY FAULT
// =============================================================================

/// Why an expiration pair could not produce a positive time-to-roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryFault {
    /// Not a `YYYYMM` value.
    Undecodable { code: i64 },
    /// The further contract does not expire after the front contract.
    NotAfterFront { months: i32 },
}

impl fmt::Display for ExpiryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undecodable { code } => write!(f, "'{}' is not a YYYYMM expiration", code),
            Self::NotAfterFront { months } => write!(
                f,
                "further contract expires {} month(s) after front, must be > 0",
                months
            ),
        }
    }
}

// =============================================================================
// CARRY ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CarryError {
    /// No rows to compute on.
    EmptySeries,

    /// Dates must be strictly ascending.
    UnorderedDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    /// Signal parameters that cannot produce a meaningful forecast.
    InvalidConfig(String),

    /// An expiration code is undecodable or the further contract does not
    /// roll after the front contract.
    MalformedExpiry {
        index: usize,
        date: NaiveDate,
        front_expiration: i64,
        further_expiration: i64,
        fault: ExpiryFault,
    },

    /// Mean absolute EWMA carry of a horizon is zero or undefined.
    DegenerateScale {
        horizon: usize,
        mean_abs_ewma: f64,
        defined_rows: usize,
    },

    /// `w·ρ·wᵗ` is not positive, so the diversification multiplier is undefined.
    IllConditionedCorrelation {
        quadratic_form: f64,
        horizons: Vec<usize>,
    },
}

impl CarryError {
    /// Pipeline stage that raised the error.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::EmptySeries | Self::UnorderedDates { .. } => "input",
            Self::InvalidConfig(_) => "config",
            Self::MalformedExpiry { .. } => "expiry_diff",
            Self::DegenerateScale { .. } => "forecast_scalar",
            Self::IllConditionedCorrelation { .. } => "fdm",
        }
    }
}

impl fmt::Display for CarryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySeries => write!(f, "Price series is empty"),
            Self::UnorderedDates {
                index,
                previous,
                current,
            } => write!(
                f,
                "Dates not strictly ascending at row {}: {} follows {}",
                index, current, previous
            ),
            Self::InvalidConfig(reason) => write!(f, "Invalid signal config: {}", reason),
            Self::MalformedExpiry {
                index,
                date,
                front_expiration,
                further_expiration,
                fault,
            } => write!(
                f,
                "Malformed expiry at row {} ({}): front={} further={}: {}",
                index, date, front_expiration, further_expiration, fault
            ),
            Self::DegenerateScale {
                horizon,
                mean_abs_ewma,
                defined_rows,
            } => write!(
                f,
                "Degenerate forecast scale for {}-day horizon: mean |ewma| = {} over {} defined rows",
                horizon, mean_abs_ewma, defined_rows
            ),
            Self::IllConditionedCorrelation {
                quadratic_form,
                horizons,
            } => write!(
                f,
                "Ill-conditioned forecast correlation across horizons {:?}: w·ρ·wᵗ = {}",
                horizons, quadratic_form
            ),
        }
    }
}

impl std::error::Error for CarryError {}
