use serde::{Deserialize, Serialize};

/// Evaluator settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deepest group nesting evaluated before the group reports an error.
    pub max_group_depth: usize,
    /// When false, values whose kind differs from the receiving socket are rejected
    /// without consulting receivers.
    pub coerce_on_receive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_group_depth: 16,
            coerce_on_receive: true,
        }
    }
}
