use serde_json::Value;

use crate::config::path::PathSpec;
use crate::configuration::Configuration;
use crate::error::Result;

/// A location in the tree and the candidate values to try there.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperparameter {
    pub path: PathSpec,
    pub values: Vec<Value>,
}

impl Hyperparameter {
    pub fn new(path: PathSpec, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            path,
            values: values.into_iter().collect(),
        }
    }
}

impl Configuration {
    /// One new configuration per candidate value, in value order.
    pub fn substitute(&self, hyperparameter: &Hyperparameter) -> Result<Vec<Configuration>> {
        hyperparameter
            .values
            .iter()
            .map(|value| {
                self.to_builder()
                    .with_override_spec(hyperparameter.path.clone(), value.clone())
                    .build()
            })
            .collect()
    }
}

/// Cartesian product of all hyperparameters applied to `base`. The first
/// hyperparameter varies slowest. A hyperparameter without values yields an
/// empty grid.
pub fn expand_grid(
    base: &Configuration,
    hyperparameters: &[Hyperparameter],
) -> Result<Vec<Configuration>> {
    let mut grid = vec![base.clone()];
    for hyperparameter in hyperparameters {
        let mut next = Vec::with_capacity(grid.len() * hyperparameter.values.len());
        for config in &grid {
            next.extend(config.substitute(hyperparameter)?);
        }
        grid = next;
    }
    tracing::debug!(variants = grid.len(), "expanded configuration grid");
    Ok(grid)
}
