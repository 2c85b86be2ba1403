//! Dataset Module - Tabular Loader
//!
//! Parses an uploaded CSV buffer into a [`FlowTable`]: trimmed, de-duplicated
//! column names and typed numeric columns. Everything downstream works on
//! validated numbers only.

pub mod table;


pub use table::{load_csv, Column, ColumnKind, FlowTable};
