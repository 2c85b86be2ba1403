//! Feature Layout - Deployment allow-list
//!
//! **This file controls which flow statistics the pipeline may use.**
//!
//! ## Rules:
//! 1. Add feature → increment LAYOUT_VERSION
//! 2. Change order → increment LAYOUT_VERSION
//! 3. Remove feature → increment LAYOUT_VERSION
//!
//! Two lists: the statistical features the isolation forest scores on, and
//! the export-ordered columns the sequence classifier was trained on. Order
//! matters: selection preserves it, and the classifier only sees the first
//! 20 selected columns.

use crc32fast::Hasher;

// ============================================================================
// LAYOUT VERSION
// ============================================================================

/// Current allow-list version
pub const LAYOUT_VERSION: u8 = 1;

// ============================================================================
// CICIDS-2017 STATISTICAL FEATURES (Authoritative source)
// ============================================================================

/// CICIDS-2017 flow statistics, trimmed to match trimmed CSV headers
pub const CICIDS_FEATURES: &[&str] = &[
    // === Volume ===
    "Flow Duration",
    "Total Fwd Packets",
    "Total Backward Packets",
    "Total Length of Fwd Packets",
    "Total Length of Bwd Packets",
    "Fwd Packet Length Mean",
    "Bwd Packet Length Mean",

    // === Rates & inter-arrival ===
    "Flow Bytes/s",
    "Flow Packets/s",
    "Flow IAT Mean",
    "Fwd IAT Mean",
    "Bwd IAT Mean",

    // === Directional flags ===
    "Fwd PSH Flags",
    "Bwd PSH Flags",
    "Fwd URG Flags",
    "Bwd URG Flags",

    // === Headers & directional rates ===
    "Fwd Header Length",
    "Bwd Header Length",
    "Fwd Packets/s",
    "Bwd Packets/s",

    // === Packet length distribution ===
    "Min Packet Length",
    "Max Packet Length",
    "Packet Length Mean",
    "Packet Length Std",
    "Packet Length Variance",

    // === TCP flag counts ===
    "FIN Flag Count",
    "SYN Flag Count",
    "RST Flag Count",
    "PSH Flag Count",
    "ACK Flag Count",
    "URG Flag Count",
    "CWE Flag Count",
    "ECE Flag Count",

    // === Ratios & segment sizes ===
    "Down/Up Ratio",
    "Average Packet Size",
    "Avg Fwd Segment Size",
    "Avg Bwd Segment Size",
    "Fwd Header Length.1",

    // === Bulk ===
    "Fwd Avg Bytes/Bulk",
    "Fwd Avg Packets/Bulk",
    "Fwd Avg Bulk Rate",
    "Bwd Avg Bytes/Bulk",
    "Bwd Avg Packets/Bulk",
    "Bwd Avg Bulk Rate",

    // === Subflows ===
    "Subflow Fwd Packets",
    "Subflow Fwd Bytes",
    "Subflow Bwd Packets",
    "Subflow Bwd Bytes",

    // === TCP window & segments ===
    "Init_Win_bytes_forward",
    "Init_Win_bytes_backward",
    "act_data_pkt_fwd",
    "min_seg_size_forward",
];

/// Allow-list of the statistical (isolation forest) strategy
pub static CICIDS_ALLOW_LIST: AllowList = AllowList::new("cicids2017-statistical", CICIDS_FEATURES);

// ============================================================================
// CICIDS-2017 EXPORT COLUMNS (classifier input order)
// ============================================================================

/// Numeric columns of a CICIDS-2017 flow export, in file order.
/// The sequence classifier was trained on the first 20 of these.
pub const CICIDS_EXPORT_FEATURES: &[&str] = &[
    "Destination Port",
    "Flow Duration",
    "Total Fwd Packets",
    "Total Backward Packets",
    "Total Length of Fwd Packets",
    "Total Length of Bwd Packets",
    "Fwd Packet Length Max",
    "Fwd Packet Length Min",
    "Fwd Packet Length Mean",
    "Fwd Packet Length Std",
    "Bwd Packet Length Max",
    "Bwd Packet Length Min",
    "Bwd Packet Length Mean",
    "Bwd Packet Length Std",
    "Flow Bytes/s",
    "Flow Packets/s",
    "Flow IAT Mean",
    "Flow IAT Std",
    "Flow IAT Max",
    "Flow IAT Min",
    "Fwd IAT Total",
    "Fwd IAT Mean",
    "Fwd IAT Std",
    "Fwd IAT Max",
    "Fwd IAT Min",
    "Bwd IAT Total",
    "Bwd IAT Mean",
    "Bwd IAT Std",
    "Bwd IAT Max",
    "Bwd IAT Min",
    "Fwd PSH Flags",
    "Bwd PSH Flags",
    "Fwd URG Flags",
    "Bwd URG Flags",
    "Fwd Header Length",
    "Bwd Header Length",
    "Fwd Packets/s",
    "Bwd Packets/s",
    "Min Packet Length",
    "Max Packet Length",
    "Packet Length Mean",
    "Packet Length Std",
    "Packet Length Variance",
    "FIN Flag Count",
    "SYN Flag Count",
    "RST Flag Count",
    "PSH Flag Count",
    "ACK Flag Count",
    "URG Flag Count",
    "CWE Flag Count",
    "ECE Flag Count",
    "Down/Up Ratio",
    "Average Packet Size",
    "Avg Fwd Segment Size",
    "Avg Bwd Segment Size",
    "Fwd Header Length.1",
    "Fwd Avg Bytes/Bulk",
    "Fwd Avg Packets/Bulk",
    "Fwd Avg Bulk Rate",
    "Bwd Avg Bytes/Bulk",
    "Bwd Avg Packets/Bulk",
    "Bwd Avg Bulk Rate",
    "Subflow Fwd Packets",
    "Subflow Fwd Bytes",
    "Subflow Bwd Packets",
    "Subflow Bwd Bytes",
    "Init_Win_bytes_forward",
    "Init_Win_bytes_backward",
    "act_data_pkt_fwd",
    "min_seg_size_forward",
    "Active Mean",
    "Active Std",
    "Active Max",
    "Active Min",
    "Idle Mean",
    "Idle Std",
    "Idle Max",
    "Idle Min",
];

/// Allow-list of the sequence classifier strategy
pub static CICIDS_EXPORT_LIST: AllowList = AllowList::new("cicids2017-export", CICIDS_EXPORT_FEATURES);

// ============================================================================
// ALLOW LIST
// ============================================================================

/// Fixed, ordered list of feature names a deployment may score on
#[derive(Debug, Clone, Copy)]
pub struct AllowList {
    pub name: &'static str,
    pub features: &'static [&'static str],
}

impl AllowList {
    pub const fn new(name: &'static str, features: &'static [&'static str]) -> Self {
        Self { name, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn hash(&self) -> u32 {
        layout_hash(self.features.iter().copied())
    }
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over the layout version and the ordered names.
/// Two feature sets hash equal only if they hold the same names in the same order.
pub fn layout_hash<'a>(names: impl IntoIterator<Item = &'a str>) -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[LAYOUT_VERSION]);

    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

// ============================================================================
// TESTS
// ============================================================================
