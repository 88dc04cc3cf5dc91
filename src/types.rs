use crate::error::{LambdaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sidedness {
    OneSided,
    TwoSided,
}

/// How the values of the statistic column are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Values already follow a chi-squared(1) distribution.
    RawChiSquared,
    /// Values are z or t statistics and get squared.
    RawZOrT,
    /// Values are p-values of a standard normal test statistic.
    PValue(Sidedness),
}

impl InputMode {
    /// Builds the mode from the three command line flags, rejecting the
    /// combinations that have no meaning.
    pub fn from_flags(chi2: bool, p_value: bool, one_sided: bool) -> Result<Self> {
        if one_sided && !p_value {
            return Err(LambdaError::Configuration(
                "The --one-sided option is only valid if the tool is used on p-values.".into(),
            ));
        }
        if chi2 && p_value {
            return Err(LambdaError::Configuration(
                "Can't use the --p-value option when the statistics follow a chi-square \
                 distribution (not implemented)."
                    .into(),
            ));
        }
        Ok(match (chi2, p_value, one_sided) {
            (true, _, _) => InputMode::RawChiSquared,
            (false, true, true) => InputMode::PValue(Sidedness::OneSided),
            (false, true, false) => InputMode::PValue(Sidedness::TwoSided),
            (false, false, _) => InputMode::RawZOrT,
        })
    }

    pub fn is_p_value(&self) -> bool {
        matches!(self, InputMode::PValue(_))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            InputMode::RawChiSquared => "using chi-squared statistics",
            InputMode::RawZOrT => "using z/t statistics",
            InputMode::PValue(Sidedness::TwoSided) => {
                "computing two-sided statistics from p-values"
            }
            InputMode::PValue(Sidedness::OneSided) => {
                "computing one-sided statistics from p-values"
            }
        }
    }
}

/// Field separator of an input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Char(u8),
    /// Any run of whitespace, as in Plink result files.
    Whitespace,
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Char(b'\t')
    }
}

#[derive(Debug, Clone)]
pub struct LambdaSummary {
    pub file: String,
    pub na_removed: usize,
    pub extracted: Option<usize>,
    pub n_used: usize,
    pub median_chi2: f64,
    pub lambda: f64,
}
