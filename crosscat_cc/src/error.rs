use crosscat_stats::AssignmentError;
use thiserror::Error;

use crate::view::ViewId;

/// Errors from operations on a single `View`
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("feature {0} is already in the view")]
    FeatureAlreadyPresent(usize),
    #[error("feature {0} is not in the view")]
    FeatureNotPresent(usize),
    #[error(
        "feature {col_ix} has {len} rows, but the view has {n_rows} rows"
    )]
    FeatureLengthMismatch {
        col_ix: usize,
        n_rows: usize,
        len: usize,
    },
    #[error("row {row_ix} is out of bounds; the view has {n_rows} rows")]
    RowIndexOutOfBounds { n_rows: usize, row_ix: usize },
    #[error("row has {len} values, but the view holds column {col_ix}")]
    RowTooShort { col_ix: usize, len: usize },
    #[error("row partition bookkeeping failed: {0}")]
    Assignment(#[from] AssignmentError),
}

/// Errors from operations on a `State`
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The column is not currently owned by any view
    #[error("column {0} is not assigned to a view")]
    ColumnNotAssigned(usize),
    #[error("column {0} is already assigned to a view")]
    ColumnAlreadyAssigned(usize),
    /// The provide column index is out of bounds
    #[error("Asked for column index {col_ix} but there are {n_cols} columns")]
    ColumnIndexOutOfBounds { n_cols: usize, col_ix: usize },
    #[error("Asked for row index {row_ix} but there are {n_rows} rows")]
    RowIndexOutOfBounds { n_rows: usize, row_ix: usize },
    #[error("Asked for view index {view_ix}, but there are {n_views} views")]
    ViewIndexOutOfBounds { n_views: usize, view_ix: usize },
    #[error("view {0} does not exist in this state")]
    UnknownView(ViewId),
    #[error(
        "Incorrect number of rows in column {col_ix} values. State has \
        {n_rows} but values column has {len}."
    )]
    ColumnLengthMismatch {
        col_ix: usize,
        n_rows: usize,
        len: usize,
    },
    #[error(
        "row partition covers {len} rows, but the state has {n_rows} rows"
    )]
    PartitionLengthMismatch { n_rows: usize, len: usize },
    #[error("row has {len} values, but the state has {n_cols} columns")]
    RowLengthMismatch { n_cols: usize, len: usize },
    #[error("column {col_ix} cannot hold the value {value}")]
    UnsupportedValue { col_ix: usize, value: String },
    #[error(
        "the values of continuous column {col_ix} are too large in magnitude \
        to score without overflow"
    )]
    ValueScaleOverflow { col_ix: usize },
    #[error("column {col_ix} is {expected}, but a {found} column was given")]
    FeatureTypeMismatch {
        col_ix: usize,
        expected: String,
        found: String,
    },
    #[error(transparent)]
    View(#[from] ViewError),
}
