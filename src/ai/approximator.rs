use std::path::Path;

use crate::ai::state_encoding::{Observation, OBSERVATION_SIZE};
use crate::error::ApproximatorError;
use crate::game::{Action, ACTION_SPACE};

/// One value per flat action index.
pub type ActionValues = [f32; ACTION_SPACE];

/// A regression target for a single (state, action) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QTarget {
    pub observation: Observation,
    pub action: Action,
    pub target: f32,
}

/// Action-value estimator: 82 inputs, 81 outputs.
///
/// Implementations know nothing about game rules. Shape mismatches are
/// reported as [`ApproximatorError::Shape`] and never coerced.
pub trait QApproximator {
    /// Estimate action values for every observation. Does not change parameters.
    fn predict(&self, observations: &[Observation]) -> Result<Vec<ActionValues>, ApproximatorError>;

    /// One optimisation step towards `batch`. Returns the mean squared error
    /// measured before the step.
    fn update(&mut self, batch: &[QTarget]) -> Result<f32, ApproximatorError>;

    /// Overwrite `other`'s parameters with an independent copy of ours.
    fn clone_parameters_into(&self, other: &mut Self)
    where
        Self: Sized;

    /// Persist parameters into `dir` (created by the caller).
    fn save(&self, dir: &Path) -> Result<(), ApproximatorError>;

    /// Replace parameters with those saved in `dir`.
    fn load(&mut self, dir: &Path) -> Result<(), ApproximatorError>;

    /// Display name for logs and checkpoint metadata.
    fn name(&self) -> &str;
}

/// Which estimator the trainer builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproximatorKind {
    Linear,
    Mlp,
}

/// Estimator shape and initialisation settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub kind: ApproximatorKind,
    pub input_size: usize,
    pub output_size: usize,
    pub hidden_size: usize,
    /// Half-width of the uniform initialisation range (linear estimator).
    pub init_scale: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            kind: ApproximatorKind::Mlp,
            input_size: OBSERVATION_SIZE,
            output_size: ACTION_SPACE,
            hidden_size: 256,
            init_scale: 0.01,
        }
    }
}

impl NetworkConfig {
    /// Fail unless the configured layer sizes match the observation and
    /// action-space contract.
    pub fn check_shape(&self) -> Result<(), ApproximatorError> {
        check_len("input layer", OBSERVATION_SIZE, self.input_size)?;
        check_len("output layer", ACTION_SPACE, self.output_size)
    }
}

pub(crate) fn check_len(
    context: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), ApproximatorError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ApproximatorError::Shape {
            context,
            expected,
            actual,
        })
    }
}
