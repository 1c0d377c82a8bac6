use std::fs;
use std::path::Path;

use burn::backend::{Autodiff, Wgpu};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::TensorData;

use crate::ai::approximator::{check_len, ActionValues, NetworkConfig, QApproximator, QTarget};
use crate::ai::networks::{QNetwork, QNetworkConfig};
use crate::ai::state_encoding::{encode_observations_batch, Observation};
use crate::error::ApproximatorError;
use crate::game::ACTION_SPACE;

/// Backend used by the training binary.
pub type DefaultBackend = Autodiff<Wgpu<f32, i32>>;

const NETWORK_FILE: &str = "q_network";

/// MLP action-value estimator trained with Adam on the mean squared
/// Bellman error of the taken action.
pub struct BurnApproximator<B: AutodiffBackend> {
    network: QNetwork<B>,
    optimizer: OptimizerAdaptor<Adam, QNetwork<B>, B>,
    config: QNetworkConfig,
    learning_rate: f64,
    device: B::Device,
}

impl<B: AutodiffBackend> BurnApproximator<B> {
    pub fn new(
        config: &NetworkConfig,
        learning_rate: f64,
        device: B::Device,
    ) -> Result<Self, ApproximatorError> {
        config.check_shape()?;
        let net_config =
            QNetworkConfig::new(config.input_size, config.hidden_size, config.output_size);
        let network = net_config.init::<B>(&device);
        let optimizer = AdamConfig::new().init();

        Ok(BurnApproximator {
            network,
            optimizer,
            config: net_config,
            learning_rate,
            device,
        })
    }

    fn to_action_values(data: Vec<f32>) -> Vec<ActionValues> {
        data.chunks_exact(ACTION_SPACE)
            .map(|chunk| {
                let mut values = [0.0f32; ACTION_SPACE];
                values.copy_from_slice(chunk);
                values
            })
            .collect()
    }
}

impl<B: AutodiffBackend> QApproximator for BurnApproximator<B> {
    fn predict(&self, observations: &[Observation]) -> Result<Vec<ActionValues>, ApproximatorError> {
        if observations.is_empty() {
            return Ok(Vec::new());
        }

        let network = self.network.valid();
        let input = encode_observations_batch::<B::InnerBackend>(observations, &self.device);
        let output = network.forward(input);
        let [rows, cols] = output.dims();
        check_len("output rows", observations.len(), rows)?;
        check_len("output layer", ACTION_SPACE, cols)?;

        let data: Vec<f32> = output
            .into_data()
            .to_vec()
            .map_err(|e| ApproximatorError::Tensor(format!("{e:?}")))?;
        Ok(Self::to_action_values(data))
    }

    fn update(&mut self, batch: &[QTarget]) -> Result<f32, ApproximatorError> {
        if batch.is_empty() {
            return Err(ApproximatorError::EmptyBatch);
        }
        let batch_size = batch.len();

        let observations: Vec<Observation> = batch.iter().map(|t| t.observation).collect();
        let input = encode_observations_batch::<B>(&observations, &self.device);
        let q_all = self.network.forward(input); // [B, 81]
        let [_, cols] = q_all.dims();
        check_len("output layer", ACTION_SPACE, cols)?;

        // One-hot mask selecting Q(s, a) for the taken action.
        let mut mask_data = vec![0.0f32; batch_size * ACTION_SPACE];
        for (i, item) in batch.iter().enumerate() {
            mask_data[i * ACTION_SPACE + item.action.index()] = 1.0;
        }
        let mask = Tensor::<B, 1>::from_data(TensorData::from(mask_data.as_slice()), &self.device)
            .reshape([batch_size as i32, ACTION_SPACE as i32]);
        let q_taken = (q_all * mask).sum_dim(1); // [B, 1]

        let target_data: Vec<f32> = batch.iter().map(|t| t.target).collect();
        let targets =
            Tensor::<B, 1>::from_data(TensorData::from(target_data.as_slice()), &self.device)
                .reshape([batch_size as i32, 1]);

        let diff = q_taken - targets;
        let loss = (diff.clone() * diff).mean();
        let loss_val = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ApproximatorError::Tensor(format!("{e:?}")))?
            .first()
            .copied()
            .unwrap_or_default();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.network);
        self.network = self
            .optimizer
            .step(self.learning_rate, self.network.clone(), grads);

        Ok(loss_val)
    }

    fn clone_parameters_into(&self, other: &mut Self) {
        // Tensors are immutable; optimiser steps replace them rather than
        // writing through, so a module clone is a detached snapshot.
        other.network = self.network.clone();
    }

    fn save(&self, dir: &Path) -> Result<(), ApproximatorError> {
        fs::create_dir_all(dir)?;
        let recorder = DefaultRecorder::default();
        self.network
            .clone()
            .save_file(dir.join(NETWORK_FILE), &recorder)
            .map_err(|e| ApproximatorError::Save(e.to_string()))
    }

    fn load(&mut self, dir: &Path) -> Result<(), ApproximatorError> {
        let recorder = DefaultRecorder::default();
        let network: QNetwork<B> = self
            .config
            .init(&self.device)
            .load_file(dir.join(NETWORK_FILE), &recorder, &self.device)
            .map_err(|e| ApproximatorError::Load(e.to_string()))?;
        self.network = network;
        Ok(())
    }

    fn name(&self) -> &str {
        "mlp"
    }
}
