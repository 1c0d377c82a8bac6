pub mod agent;
pub mod approximator;
pub mod burn_approximator;
pub mod dqn;
pub mod linear;
pub mod networks;
pub mod policy;
mod random;
pub mod state_encoding;

pub use agent::{Agent, GreedyAgent};
pub use approximator::{ActionValues, ApproximatorKind, NetworkConfig, QApproximator, QTarget};
pub use burn_approximator::{BurnApproximator, DefaultBackend};
pub use dqn::{bellman_target, DqnConfig, Learner, SelfPlayMode};
pub use linear::{LinearApproximator, LinearParameters};
pub use networks::{QNetwork, QNetworkConfig};
pub use policy::{greedy_action, select_action, EpsilonSchedule};
pub use random::RandomAgent;
pub use state_encoding::{encode_observation, Observation, OBSERVATION_SIZE};
