use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Plain data crossing the loader boundary (CLI bindings, printed results).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Array(Vec<SkValue>),
    Map(BTreeMap<String, SkValue>),
}
