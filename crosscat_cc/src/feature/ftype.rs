use std::str::FromStr;

use crosscat_stats::{CategoricalHyper, ContinuousHyper};
use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Feature type
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FType {
    Continuous,
    Categorical,
}

impl std::fmt::Display for FType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continuous => write!(f, "Continuous"),
            Self::Categorical => write!(f, "Categorical"),
        }
    }
}

/// Column configuration: the datatype, the cardinality of categorical
/// columns, and optionally fixed starting hyperparameters
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ColType {
    Continuous {
        #[serde(default)]
        hyper: Option<ContinuousHyper>,
    },
    Categorical {
        k: usize,
        #[serde(default)]
        hyper: Option<CategoricalHyper>,
    },
}

impl ColType {
    pub fn continuous() -> Self {
        Self::Continuous { hyper: None }
    }

    pub fn categorical(k: usize) -> Self {
        Self::Categorical { k, hyper: None }
    }

    pub fn ftype(&self) -> FType {
        match self {
            Self::Continuous { .. } => FType::Continuous,
            Self::Categorical { .. } => FType::Categorical,
        }
    }

    /// Number of categories; `None` for continuous columns
    pub fn cardinality(&self) -> Option<usize> {
        match self {
            Self::Continuous { .. } => None,
            Self::Categorical { k, .. } => Some(*k),
        }
    }
}

/// Parses the short form used on the command line: `c` for continuous and
/// `k<N>` for categorical with `N` levels.
///
/// ```
/// # use crosscat_cc::feature::ColType;
/// assert_eq!("c".parse::<ColType>().unwrap(), ColType::continuous());
/// assert_eq!("k3".parse::<ColType>().unwrap(), ColType::categorical(3));
/// assert!("k".parse::<ColType>().is_err());
/// ```
impl FromStr for ColType {
    type Err = ParseError<String>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "c" | "C" => Ok(Self::continuous()),
            _ => s
                .strip_prefix(|c: char| c == 'k' || c == 'K')
                .and_then(|k| k.parse::<usize>().ok())
                .filter(|&k| k > 0)
                .map(Self::categorical)
                .ok_or_else(|| ParseError(s.to_owned())),
        }
    }
}
