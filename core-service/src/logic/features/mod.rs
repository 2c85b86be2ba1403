//! Features Module - From flow table to a clean numeric matrix
//!
//! Selection against the deployment allow-list, imputation of missing and
//! infinite cells, then per-batch standardization.

pub mod layout;
pub mod selector;
pub mod impute;
pub mod scaler;


// Re-export common types
pub use layout::{AllowList, CICIDS_ALLOW_LIST, CICIDS_EXPORT_LIST};
pub use selector::{select_features, FeatureSelection, FeatureSet};
pub use impute::{impute, FillPolicy, ImputeStats};
pub use scaler::StandardScaler;
