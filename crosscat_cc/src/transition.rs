use serde::{Deserialize, Serialize};

/// One of every transition, in the order a full sweep runs them
pub const DEFAULT_STATE_TRANSITIONS: [StateTransition; 5] = [
    StateTransition::ColumnAssignment,
    StateTransition::ColumnCrpAlpha,
    StateTransition::RowAssignment,
    StateTransition::RowCrpAlphas,
    StateTransition::ColumnHypers,
];

/// MCMC transitions in the `State`
#[derive(Deserialize, Serialize, Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StateTransition {
    /// Gibbs-reassign every column to a view
    ColumnAssignment,
    /// Gibbs-reassign every row within every view
    RowAssignment,
    /// Grid-sample the alpha on the column-to-views CRP
    ColumnCrpAlpha,
    /// Grid-sample the alpha on each view's row-to-categories CRP
    RowCrpAlphas,
    /// Grid-sample each column's component model hyperparameters
    ColumnHypers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_use_snake_case_names() {
        let yaml = serde_yaml::to_string(&StateTransition::RowCrpAlphas).unwrap();
        assert_eq!(yaml.trim(), "row_crp_alphas");
        let t: StateTransition = serde_yaml::from_str("column_hypers").unwrap();
        assert_eq!(t, StateTransition::ColumnHypers);
    }
}
