//! Feature Selector - allow-list ∩ available numeric columns

use serde::{Deserialize, Serialize};

use crate::logic::dataset::FlowTable;
use crate::logic::error::{PipelineError, PipelineResult};
use super::layout::{layout_hash, AllowList, CICIDS_ALLOW_LIST};

/// Ordered, non-empty set of features chosen for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    names: Vec<String>,
    /// Allow-listed names the input did not provide as numbers
    missing: Vec<String>,
    layout_hash: u32,
}

impl FeatureSet {
    fn new(names: Vec<String>, missing: Vec<String>) -> Self {
        let layout_hash = layout_hash(names.iter().map(String::as_str));
        Self { names, missing, layout_hash }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn layout_hash(&self) -> u32 {
        self.layout_hash
    }
}

/// How a pipeline picks its columns
#[derive(Debug, Clone, Copy)]
pub enum FeatureSelection {
    /// Allow-listed numeric columns, in allow-list order
    AllowList(&'static AllowList),
    /// Every numeric column, in input order
    AllNumeric,
}

impl Default for FeatureSelection {
    fn default() -> Self {
        FeatureSelection::AllowList(&CICIDS_ALLOW_LIST)
    }
}

impl FeatureSelection {
    pub fn select(&self, table: &FlowTable) -> PipelineResult<FeatureSet> {
        match self {
            FeatureSelection::AllowList(list) => select_features(table, list),
            FeatureSelection::AllNumeric => {
                let names: Vec<String> = table
                    .columns()
                    .iter()
                    .filter(|c| c.is_numeric())
                    .map(|c| c.name.clone())
                    .collect();
                if names.is_empty() {
                    return Err(PipelineError::NoMatchingFeatures {
                        allow_list_size: 0,
                        column_count: table.columns().len(),
                    });
                }
                Ok(FeatureSet::new(names, Vec::new()))
            }
        }
    }
}

/// Keep allow-listed names that exist as numeric columns, in allow-list order
pub fn select_features(table: &FlowTable, allow_list: &AllowList) -> PipelineResult<FeatureSet> {
    let mut available = Vec::new();
    let mut missing = Vec::new();

    for &name in allow_list.features {
        match table.column(name) {
            Some(column) if column.is_numeric() => available.push(name.to_string()),
            Some(_) => {
                log::warn!("Allow-listed feature '{}' is not numeric, skipping", name);
                missing.push(name.to_string());
            }
            None => missing.push(name.to_string()),
        }
    }

    if available.is_empty() {
        return Err(PipelineError::NoMatchingFeatures {
            allow_list_size: allow_list.len(),
            column_count: table.columns().len(),
        });
    }

    log::debug!(
        "Selected {}/{} features from '{}'",
        available.len(),
        allow_list.len(),
        allow_list.name
    );

    Ok(FeatureSet::new(available, missing))
}
