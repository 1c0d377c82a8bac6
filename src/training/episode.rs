use crate::ai::{Agent, RandomAgent};
use crate::env::{Environment, RewardConfig, StepResult};
use crate::error::TrainingError;
use crate::game::{Action, GameOutcome, GameState, Player};
use crate::training::replay_buffer::Transition;

/// A move waiting for its player's next turn (or the end of the game).
#[derive(Debug, Clone, Copy)]
struct PendingMove {
    state: GameState,
    action: Action,
    reward: f32,
}

/// Turns a stream of environment steps into per-player transitions.
///
/// A player's transition runs from the position where it moved to the next
/// position where it moves again, so its `next_state` is always evaluated
/// from that player's side. When the game ends both players' last
/// transitions are closed with `done = true`: the mover keeps its step
/// reward, the opponent receives its terminal reward (loss or draw).
pub struct TransitionBuilder {
    pending: [Option<PendingMove>; 2],
    rewards: RewardConfig,
}

impl TransitionBuilder {
    pub fn new(rewards: RewardConfig) -> Self {
        TransitionBuilder {
            pending: [None, None],
            rewards,
        }
    }

    /// Record that the player to move in `state` played `action`, producing
    /// `step`. Returns the transitions this step completed.
    pub fn record(&mut self, state: GameState, action: Action, step: &StepResult) -> Vec<Transition> {
        let mover = step.info.mover;
        let opponent = mover.other();
        let mut completed = Vec::with_capacity(2);

        match step.info.outcome {
            None => {
                if let Some(prev) = self.pending[opponent.index()].take() {
                    completed.push(Transition {
                        state: prev.state,
                        action: prev.action,
                        reward: prev.reward,
                        next_state: step.next_state,
                        done: false,
                        player: opponent,
                    });
                }
                self.pending[mover.index()] = Some(PendingMove {
                    state,
                    action,
                    reward: step.reward,
                });
            }
            Some(outcome) => {
                completed.push(Transition {
                    state,
                    action,
                    reward: step.reward,
                    next_state: step.next_state,
                    done: true,
                    player: mover,
                });
                if let Some(prev) = self.pending[opponent.index()].take() {
                    completed.push(Transition {
                        state: prev.state,
                        action: prev.action,
                        reward: self.rewards.terminal_reward(outcome, opponent),
                        next_state: step.next_state,
                        done: true,
                        player: opponent,
                    });
                }
                self.pending = [None, None];
            }
        }

        completed
    }

    /// Number of moves still waiting for a successor.
    pub fn pending_count(&self) -> usize {
        self.pending.iter().filter(|p| p.is_some()).count()
    }
}

/// Play `action` in `env`, wrapping an illegal move with the rendered board.
pub fn checked_step(env: &mut Environment, action: Action) -> Result<StepResult, TrainingError> {
    let board = env.state().to_string();
    env.step(action).map_err(|source| TrainingError::IllegalMove {
        action,
        board,
        source,
    })
}

/// Play a single evaluation game between two agents.
/// Returns the outcome of the finished game.
pub fn play_eval_game(
    agent: &mut dyn Agent,
    opponent: &mut dyn Agent,
    agent_side: Player,
) -> Result<GameOutcome, TrainingError> {
    let mut env = Environment::default();
    env.reset();

    loop {
        let state = *env.state();
        let action = if state.current_player() == agent_side {
            agent.select_action(&state)?
        } else {
            opponent.select_action(&state)?
        };
        let step = checked_step(&mut env, action)?;
        if let Some(outcome) = step.info.outcome {
            return Ok(outcome);
        }
    }
}

/// Win/draw/loss counts of an evaluation run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalResult {
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
}

impl EvalResult {
    pub fn games(&self) -> usize {
        self.wins + self.draws + self.losses
    }

    fn rate(&self, count: usize) -> f32 {
        match self.games() {
            0 => 0.0,
            n => count as f32 / n as f32,
        }
    }

    pub fn win_rate(&self) -> f32 {
        self.rate(self.wins)
    }

    pub fn draw_rate(&self) -> f32 {
        self.rate(self.draws)
    }

    pub fn loss_rate(&self) -> f32 {
        self.rate(self.losses)
    }
}

/// Evaluate agent vs random over N games, alternating sides.
pub fn evaluate(
    agent: &mut dyn Agent,
    eval_games: usize,
    seed: Option<u64>,
) -> Result<EvalResult, TrainingError> {
    tally(eval_games, seed, |side, random| play_eval_game(agent, random, side))
}

/// Like [`evaluate`], but the side being scored picks the agent: `x_agent`
/// plays the games where it moves as X, `o_agent` the games as O.
pub fn evaluate_sides(
    x_agent: &mut dyn Agent,
    o_agent: &mut dyn Agent,
    eval_games: usize,
    seed: Option<u64>,
) -> Result<EvalResult, TrainingError> {
    tally(eval_games, seed, |side, random| match side {
        Player::X => play_eval_game(x_agent, random, side),
        Player::O => play_eval_game(o_agent, random, side),
    })
}

fn tally(
    eval_games: usize,
    seed: Option<u64>,
    mut play: impl FnMut(Player, &mut RandomAgent) -> Result<GameOutcome, TrainingError>,
) -> Result<EvalResult, TrainingError> {
    let mut random = match seed {
        Some(seed) => RandomAgent::with_seed(seed),
        None => RandomAgent::new(),
    };
    let mut result = EvalResult::default();

    for game_idx in 0..eval_games {
        let side = if game_idx % 2 == 0 { Player::X } else { Player::O };
        match play(side, &mut random)? {
            GameOutcome::Winner(winner) if winner == side => result.wins += 1,
            GameOutcome::Winner(_) => result.losses += 1,
            GameOutcome::Draw => result.draws += 1,
        }
    }

    Ok(result)
}

/// Derive a deterministic seed for a given stream index.
pub fn episode_seed(base_seed: u64, episode_index: usize) -> u64 {
    // FNV-1a-style mixing
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    let index = episode_index as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index >> 32;
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::approximator::NetworkConfig;
    use crate::ai::{GreedyAgent, LinearApproximator};

    fn act(sub_board: usize, cell: usize) -> Action {
        Action::new(sub_board, cell).unwrap()
    }

    /// Plays `moves` through an environment and a builder, collecting every
    /// completed transition.
    fn stitch(moves: &[Action]) -> Vec<Transition> {
        let mut env = Environment::default();
        env.reset();
        let mut builder = TransitionBuilder::new(RewardConfig::default());
        let mut out = Vec::new();
        for &action in moves {
            let state = *env.state();
            let step = env.step(action).unwrap();
            out.extend(builder.record(state, action, &step));
        }
        out
    }

    #[test]
    fn test_transitions_span_own_turns() {
        let transitions = stitch(&[act(4, 4), act(4, 0)]);

        // O's reply is still waiting for O's next turn.
        assert_eq!(transitions.len(), 1);
        let t = &transitions[0];
        assert_eq!(t.player, Player::X);
        assert_eq!(t.action, act(4, 4));
        assert_eq!(t.state, GameState::initial());
        assert_eq!(t.next_state.current_player(), Player::X);
        assert_eq!(t.next_state.move_count(), 2);
        assert!(!t.done);

        let transitions = stitch(&[act(4, 4), act(4, 0), act(0, 4)]);
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[1].player, Player::O);
        assert_eq!(transitions[1].next_state.current_player(), Player::O);
    }

    #[test]
    fn test_win_rewards_both_players() {
        // X wins the main diagonal on the 27th move.
        let moves = [
            act(8, 5), act(5, 8), act(8, 3), act(3, 5), act(5, 3), act(3, 2), act(2, 8),
            act(8, 0), act(0, 6), act(6, 0), act(0, 0), act(0, 5), act(5, 2), act(2, 0),
            act(0, 1), act(1, 0), act(0, 3), act(3, 8), act(8, 4), act(4, 4), act(4, 2),
            act(2, 4), act(4, 5), act(5, 5), act(5, 1), act(1, 4), act(4, 8),
        ];
        let mut env = Environment::default();
        env.reset();
        let mut builder = TransitionBuilder::new(RewardConfig::default());
        let mut all = Vec::new();
        let mut finished = None;
        for &action in &moves {
            let state = *env.state();
            let step = env.step(action).unwrap();
            all.extend(builder.record(state, action, &step));
            if step.done {
                finished = step.info.outcome;
                break;
            }
        }

        assert_eq!(finished, Some(GameOutcome::Winner(Player::X)));
        let winner = Player::X;
        let finals: Vec<&Transition> = all.iter().filter(|t| t.done).collect();
        assert_eq!(finals.len(), 2);
        let winner_t = finals.iter().find(|t| t.player == winner).unwrap();
        let loser_t = finals.iter().find(|t| t.player != winner).unwrap();
        assert_eq!(winner_t.reward, 1.0);
        assert_eq!(loser_t.reward, -1.0);
        assert_eq!(builder.pending_count(), 0);
        assert_eq!(all.len(), env.state().move_count());
    }

    #[test]
    fn test_checked_step_wraps_illegal_move() {
        let mut env = Environment::default();
        env.reset();
        checked_step(&mut env, act(4, 4)).unwrap();
        match checked_step(&mut env, act(0, 0)) {
            Err(TrainingError::IllegalMove { action, board, .. }) => {
                assert_eq!(action, act(0, 0));
                assert!(board.contains("active: 4"));
            }
            other => panic!("expected illegal move, got {other:?}"),
        }
    }

    #[test]
    fn test_play_eval_game_terminates() {
        let mut agent = RandomAgent::with_seed(1);
        let mut opponent = RandomAgent::with_seed(2);
        play_eval_game(&mut agent, &mut opponent, Player::X).unwrap();
    }

    #[test]
    fn test_evaluate_rates_sum_to_one() {
        let approx = LinearApproximator::new(&NetworkConfig::default(), 0.01, Some(4)).unwrap();
        let mut agent = GreedyAgent::new(&approx);
        let result = evaluate(&mut agent, 6, Some(9)).unwrap();
        assert_eq!(result.games(), 6);
        let total = result.win_rate() + result.draw_rate() + result.loss_rate();
        assert!((total - 1.0).abs() < 1e-6);
    }

    /// Random mover that records which player it was asked to move for.
    struct SideLog {
        inner: RandomAgent,
        seen: Vec<Player>,
    }

    impl Agent for SideLog {
        fn select_action(&mut self, state: &GameState) -> Result<Action, TrainingError> {
            self.seen.push(state.current_player());
            self.inner.select_action(state)
        }

        fn name(&self) -> &str {
            "side-log"
        }
    }

    #[test]
    fn test_evaluate_sides_routes_agent_by_side() {
        let mut x_agent = SideLog { inner: RandomAgent::with_seed(3), seen: Vec::new() };
        let mut o_agent = SideLog { inner: RandomAgent::with_seed(4), seen: Vec::new() };
        let result = evaluate_sides(&mut x_agent, &mut o_agent, 4, Some(5)).unwrap();

        assert_eq!(result.games(), 4);
        assert!(!x_agent.seen.is_empty());
        assert!(!o_agent.seen.is_empty());
        assert!(x_agent.seen.iter().all(|&p| p == Player::X));
        assert!(o_agent.seen.iter().all(|&p| p == Player::O));
    }

    #[test]
    fn test_episode_seed_varies() {
        assert_eq!(episode_seed(42, 100), episode_seed(42, 100));
        assert_ne!(episode_seed(42, 0), episode_seed(42, 1));
        assert_ne!(episode_seed(1, 0), episode_seed(2, 0));
    }
}
