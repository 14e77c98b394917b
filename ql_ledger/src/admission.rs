use std::fmt;

/// Outcome of a pre-send admission check
///
/// A discriminated result rather than an error: refusal is an ordinary
/// control-flow outcome here, and the pipeline decides at its boundary
/// whether to surface it as a typed failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Every declared weight fits under its limit's threshold
    Admitted,

    /// At least one limit would be pushed over threshold
    Refused(Refusal),
}

impl Admission {
    #[inline]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Details of the first limit that would be breached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    /// Identity of the violated limit
    pub limit_id: i64,

    /// Human-readable limit name
    pub name: String,

    /// Usage recorded at the time of the check
    pub usage: u32,

    /// Amount the refused call attempted to reserve
    pub attempted: u32,

    /// The limit's threshold
    pub threshold: u32,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}/{} cannot absorb {} more",
            self.name, self.usage, self.threshold, self.attempted
        )
    }
}
