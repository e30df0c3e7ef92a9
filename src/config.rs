//! Run-time options passed explicitly to the engine's constructors

use serde::{Deserialize, Serialize};

/// Options shared by one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Maximum number of children a composite may aggregate
    #[serde(default = "default_max_children")]
    pub max_children: usize,

    /// Maximum number of brackets in a tax rate schedule
    #[serde(default = "default_max_brackets")]
    pub max_brackets: usize,

    /// Tax net long-term gains at the preferential schedule's marginal rate.
    /// When false the preferential gains term is always zero and gains only
    /// reach the tax through ordinary income (when no gains schedule is set).
    #[serde(default)]
    pub tax_preferential_gains: bool,
}

fn default_max_children() -> usize { 50 }
fn default_max_brackets() -> usize { 10 }

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            max_children: default_max_children(),
            max_brackets: default_max_brackets(),
            tax_preferential_gains: false,
        }
    }
}

impl SimulationOptions {
    /// Parse options from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
