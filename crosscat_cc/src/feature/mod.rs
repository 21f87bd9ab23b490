mod column;
mod ftype;
mod hyper;
mod traits;

pub use column::{ColModel, Column, ColumnSuffStats};
pub(crate) use column::{continuous_scale_fits, max_abs};
pub use ftype::{ColType, FType};
pub use hyper::{ColumnHyperGrids, Hyper};
pub use traits::Feature;
