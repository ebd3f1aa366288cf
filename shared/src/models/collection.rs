//! Sales collection models

use serde::{Deserialize, Serialize};

use crate::types::CtnPcs;

/// Quantities recorded on one sales collection line.
///
/// All three quantities are valued against the same price snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLine {
    pub order: CtnPcs,
    pub damage: CtnPcs,
    pub free: CtnPcs,
}
