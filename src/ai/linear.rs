use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ai::approximator::{check_len, ActionValues, NetworkConfig, QApproximator, QTarget};
use crate::ai::state_encoding::{Observation, OBSERVATION_SIZE};
use crate::error::ApproximatorError;
use crate::game::ACTION_SPACE;

const PARAMETERS_FILE: &str = "linear.json";

/// Raw weights of a [`LinearApproximator`], row-major `[output][input]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearParameters {
    pub input_size: usize,
    pub output_size: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl LinearParameters {
    fn check_shape(&self) -> Result<(), ApproximatorError> {
        check_len("input layer", OBSERVATION_SIZE, self.input_size)?;
        check_len("output layer", ACTION_SPACE, self.output_size)?;
        check_len("weights", self.input_size * self.output_size, self.weights.len())?;
        check_len("bias", self.output_size, self.bias.len())
    }
}

/// `Q(s, a) = w_a . x + b_a`, trained by plain gradient descent on squared
/// error. Dependency-free and deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct LinearApproximator {
    params: LinearParameters,
    learning_rate: f32,
}

impl LinearApproximator {
    pub fn new(
        config: &NetworkConfig,
        learning_rate: f64,
        seed: Option<u64>,
    ) -> Result<Self, ApproximatorError> {
        config.check_shape()?;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let scale = config.init_scale.abs();
        let weights = (0..config.input_size * config.output_size)
            .map(|_| {
                if scale > 0.0 {
                    rng.random_range(-scale..scale)
                } else {
                    0.0
                }
            })
            .collect();

        Ok(LinearApproximator {
            params: LinearParameters {
                input_size: config.input_size,
                output_size: config.output_size,
                weights,
                bias: vec![0.0; config.output_size],
            },
            learning_rate: learning_rate as f32,
        })
    }

    pub fn parameters(&self) -> &LinearParameters {
        &self.params
    }

    fn values(&self, observation: &Observation) -> ActionValues {
        let x = observation.as_slice();
        let n = self.params.input_size;
        let mut values = [0.0f32; ACTION_SPACE];
        for (a, value) in values.iter_mut().enumerate() {
            let row = &self.params.weights[a * n..(a + 1) * n];
            *value = self.params.bias[a] + row.iter().zip(x).map(|(w, xi)| w * xi).sum::<f32>();
        }
        values
    }
}

impl QApproximator for LinearApproximator {
    fn predict(&self, observations: &[Observation]) -> Result<Vec<ActionValues>, ApproximatorError> {
        observations
            .iter()
            .map(|obs| {
                check_len("observation", self.params.input_size, obs.as_slice().len())?;
                Ok(self.values(obs))
            })
            .collect()
    }

    fn update(&mut self, batch: &[QTarget]) -> Result<f32, ApproximatorError> {
        if batch.is_empty() {
            return Err(ApproximatorError::EmptyBatch);
        }
        let n = self.params.input_size;
        let scale = 2.0 / batch.len() as f32;

        // Errors are measured against the parameters before the step.
        let mut errors = Vec::with_capacity(batch.len());
        for item in batch {
            check_len("observation", n, item.observation.as_slice().len())?;
            let predicted = self.values(&item.observation)[item.action.index()];
            errors.push(predicted - item.target);
        }

        for (item, err) in batch.iter().zip(&errors) {
            let a = item.action.index();
            let step = self.learning_rate * scale * err;
            let row = &mut self.params.weights[a * n..(a + 1) * n];
            for (w, xi) in row.iter_mut().zip(item.observation.as_slice()) {
                *w -= step * xi;
            }
            self.params.bias[a] -= step;
        }

        Ok(errors.iter().map(|e| e * e).sum::<f32>() / batch.len() as f32)
    }

    fn clone_parameters_into(&self, other: &mut Self) {
        other.params = self.params.clone();
    }

    fn save(&self, dir: &Path) -> Result<(), ApproximatorError> {
        fs::create_dir_all(dir)?;
        let json = serde_json::to_string(&self.params)?;
        fs::write(dir.join(PARAMETERS_FILE), json)?;
        Ok(())
    }

    fn load(&mut self, dir: &Path) -> Result<(), ApproximatorError> {
        let json = fs::read_to_string(dir.join(PARAMETERS_FILE))?;
        let params: LinearParameters = serde_json::from_str(&json)?;
        params.check_shape()?;
        self.params = params;
        Ok(())
    }

    fn name(&self) -> &str {
        "linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::state_encoding::encode_observation;
    use crate::game::{Action, GameState};

    fn linear(seed: u64) -> LinearApproximator {
        LinearApproximator::new(&NetworkConfig::default(), 0.05, Some(seed)).unwrap()
    }

    #[test]
    fn test_predict_shape() {
        let approx = linear(1);
        let obs = encode_observation(&GameState::initial());
        let values = approx.predict(&[obs, obs, obs]).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].len(), 81);
    }

    #[test]
    fn test_seeded_init_is_reproducible() {
        assert_eq!(linear(7).parameters(), linear(7).parameters());
        assert_ne!(linear(7).parameters(), linear(8).parameters());
    }

    #[test]
    fn test_rejects_wrong_layer_sizes() {
        let config = NetworkConfig {
            output_size: 80,
            ..Default::default()
        };
        assert!(matches!(
            LinearApproximator::new(&config, 0.01, Some(0)),
            Err(ApproximatorError::Shape { .. })
        ));
    }

    #[test]
    fn test_update_moves_towards_target() {
        let mut approx = linear(3);
        let obs = encode_observation(&GameState::initial());
        let action = Action::new(4, 4).unwrap();
        let batch = [QTarget {
            observation: obs,
            action,
            target: 1.0,
        }];

        let first = approx.update(&batch).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = approx.update(&batch).unwrap();
        }
        assert!(last < first, "loss {last} should drop below {first}");
        let value = approx.predict(&[obs]).unwrap()[0][action.index()];
        assert!((value - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_update_rejects_empty_batch() {
        let mut approx = linear(0);
        assert!(matches!(approx.update(&[]), Err(ApproximatorError::EmptyBatch)));
    }

    #[test]
    fn test_clone_parameters_is_independent() {
        let mut online = linear(1);
        let mut target = linear(2);
        online.clone_parameters_into(&mut target);
        assert_eq!(online.parameters(), target.parameters());

        let obs = encode_observation(&GameState::initial());
        online
            .update(&[QTarget {
                observation: obs,
                action: Action::new(0, 0).unwrap(),
                target: 5.0,
            }])
            .unwrap();
        assert_ne!(online.parameters(), target.parameters());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let saved = linear(11);
        saved.save(dir.path()).unwrap();

        let mut loaded = linear(12);
        loaded.load(dir.path()).unwrap();
        assert_eq!(saved.parameters(), loaded.parameters());
    }
}
