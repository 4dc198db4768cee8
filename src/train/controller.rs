//! Epoch loop: restore, train, validate, save, stop

use super::{EpochStats, ValidationStats};
use crate::io::RestoredState;
use crate::Result;
use tracing::info;

/// Early stopping on validation perplexity
///
/// Tracks the lowest value seen and the number of consecutive epochs without
/// a strict improvement; asks to stop once that count reaches `patience`.
///
/// # Example
///
/// ```rust
/// use entrenar_dual::train::EarlyStopping;
///
/// let mut es = EarlyStopping::new(2);
/// assert!(es.observe(10.0));
/// assert!(!es.observe(11.0));
/// assert!(!es.should_stop());
/// assert!(!es.observe(10.0));
/// assert!(es.should_stop());
/// ```
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    /// Number of epochs to wait for improvement
    patience: usize,
    /// Best value seen so far
    best: f64,
    /// Epochs without improvement
    pub(crate) bad_epochs: usize,
}

impl EarlyStopping {
    /// Create a tracker with no best value yet
    pub fn new(patience: usize) -> Self {
        Self { patience, best: f64::INFINITY, bad_epochs: 0 }
    }

    /// Seed the best value, e.g. from a checkpoint
    pub fn with_best(mut self, best: f64) -> Self {
        self.best = best;
        self
    }

    /// Record one epoch's value; returns whether it is a new best
    pub fn observe(&mut self, value: f64) -> bool {
        if value < self.best {
            self.best = value;
            self.bad_epochs = 0;
            true
        } else {
            self.bad_epochs += 1;
            false
        }
    }

    /// Whether `patience` epochs passed without improvement
    pub fn should_stop(&self) -> bool {
        self.bad_epochs >= self.patience
    }

    /// Best value seen
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Consecutive epochs without improvement
    pub fn bad_epochs(&self) -> usize {
        self.bad_epochs
    }
}

/// Training progress owned by the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingState {
    /// Last completed epoch, `None` before the first one
    pub last_epoch: Option<usize>,
    /// Lowest validation perplexity so far
    pub best_validate: f64,
    /// Consecutive epochs without improvement
    pub bad_epochs: usize,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self { last_epoch: None, best_validate: f64::INFINITY, bad_epochs: 0 }
    }
}

impl TrainingState {
    /// First epoch still to run
    pub fn next_epoch(&self) -> usize {
        self.last_epoch.map_or(0, |e| e + 1)
    }
}

/// Controller status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStatus {
    /// Epochs remain
    Running,
    /// Patience exhausted
    EarlyStopped,
    /// Last epoch before `max_epoch` completed
    MaxEpochReached,
}

/// Epoch loop limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Epochs `0..max_epoch` are run
    pub max_epoch: usize,
    /// Epochs without improvement before stopping
    pub patience: usize,
    /// Save checkpoints when `epoch % save_interval == 0`
    pub save_interval: usize,
}

/// Work done for each epoch, supplied by the caller
pub trait EpochHooks {
    /// Train one epoch
    fn train_epoch(&mut self, epoch: usize) -> Result<EpochStats>;

    /// Validate after training `epoch`
    fn validate(&mut self, epoch: usize) -> Result<ValidationStats>;

    /// Persist checkpoints for `epoch`; `state` already includes this epoch
    fn save_checkpoint(&mut self, epoch: usize, state: &TrainingState, valid: &ValidationStats) -> Result<()>;
}

/// Result of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    /// Why the loop ended
    pub status: TrainingStatus,
    /// Final training state
    pub state: TrainingState,
    /// Epochs run by this call
    pub epochs_run: usize,
    /// Validation perplexity per epoch run
    pub perplexities: Vec<f64>,
}

/// Drives the epoch loop and decides when to stop
#[derive(Debug, Clone)]
pub struct TrainingController {
    config: ControllerConfig,
    state: TrainingState,
    early_stopping: EarlyStopping,
    status: TrainingStatus,
}

impl TrainingController {
    /// Controller for a fresh run
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            state: TrainingState::default(),
            early_stopping: EarlyStopping::new(config.patience),
            status: TrainingStatus::Running,
        }
    }

    /// Resume from a checkpoint; the restored best seeds early stopping
    pub fn with_restored(mut self, restored: Option<RestoredState>) -> Self {
        if let Some(r) = restored {
            self.state.last_epoch = Some(r.last_epoch);
            self.state.best_validate = r.best_validate;
            self.early_stopping = EarlyStopping::new(self.config.patience).with_best(r.best_validate);
        }
        self
    }

    /// Current training state
    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    /// Current status
    pub fn status(&self) -> TrainingStatus {
        self.status
    }

    /// Run epochs until early stopping or `max_epoch`
    pub fn run(&mut self, hooks: &mut dyn EpochHooks) -> Result<TrainingOutcome> {
        let start = self.state.next_epoch();
        let mut perplexities = Vec::new();

        if start >= self.config.max_epoch {
            info!(start, max_epoch = self.config.max_epoch, "nothing to do, max epoch already reached");
            self.status = TrainingStatus::MaxEpochReached;
        }

        let mut epoch = start;
        while self.status == TrainingStatus::Running {
            hooks.train_epoch(epoch)?;
            let valid = hooks.validate(epoch)?;
            perplexities.push(valid.perplexity);

            self.early_stopping.observe(valid.perplexity);
            self.state = TrainingState {
                last_epoch: Some(epoch),
                best_validate: self.early_stopping.best(),
                bad_epochs: self.early_stopping.bad_epochs(),
            };

            if epoch % self.config.save_interval.max(1) == 0 {
                hooks.save_checkpoint(epoch, &self.state, &valid)?;
            }

            if self.early_stopping.should_stop() {
                info!(
                    "No validation set improvements observed for {} epochs. Early stop!",
                    self.config.patience
                );
                self.status = TrainingStatus::EarlyStopped;
            } else if epoch + 1 >= self.config.max_epoch {
                self.status = TrainingStatus::MaxEpochReached;
            }
            epoch += 1;
        }

        Ok(TrainingOutcome {
            status: self.status,
            state: self.state,
            epochs_run: epoch - start,
            perplexities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    /// Hooks replaying a fixed perplexity sequence
    struct Scripted {
        perplexities: Vec<f64>,
        trained: Vec<usize>,
        validated: Vec<usize>,
        saved: Vec<(usize, TrainingState)>,
        fail_at: Option<usize>,
    }

    impl Scripted {
        fn new(perplexities: &[f64]) -> Self {
            Self {
                perplexities: perplexities.to_vec(),
                trained: Vec::new(),
                validated: Vec::new(),
                saved: Vec::new(),
                fail_at: None,
            }
        }
    }

    impl EpochHooks for Scripted {
        fn train_epoch(&mut self, epoch: usize) -> Result<EpochStats> {
            if self.fail_at == Some(epoch) {
                return Err(Error::config("data", "gone"));
            }
            self.trained.push(epoch);
            Ok(EpochStats::default())
        }

        fn validate(&mut self, epoch: usize) -> Result<ValidationStats> {
            let index = self.validated.len();
            self.validated.push(epoch);
            let perplexity = self.perplexities.get(index).copied().unwrap_or(f64::INFINITY);
            Ok(ValidationStats { perplexity, ..ValidationStats::default() })
        }

        fn save_checkpoint(
            &mut self,
            epoch: usize,
            state: &TrainingState,
            _valid: &ValidationStats,
        ) -> Result<()> {
            self.saved.push((epoch, *state));
            Ok(())
        }
    }

    fn config(max_epoch: usize, patience: usize, save_interval: usize) -> ControllerConfig {
        ControllerConfig { max_epoch, patience, save_interval }
    }

    #[test]
    fn test_early_stop_after_patience_bad_epochs() {
        let mut hooks = Scripted::new(&[5.0, 4.0, 4.2, 4.3, 4.4, 4.5]);
        let mut controller = TrainingController::new(config(100, 3, 1));

        let outcome = controller.run(&mut hooks).unwrap();

        assert_eq!(outcome.status, TrainingStatus::EarlyStopped);
        assert_eq!(outcome.epochs_run, 5);
        assert_eq!(hooks.validated, vec![0, 1, 2, 3, 4]);
        assert_eq!(outcome.state.best_validate, 4.0);
        assert_eq!(outcome.state.bad_epochs, 3);
        assert_eq!(outcome.state.last_epoch, Some(4));
    }

    #[test]
    fn test_max_epoch_reached() {
        let mut hooks = Scripted::new(&[5.0, 4.0, 3.0]);
        let mut controller = TrainingController::new(config(3, 5, 1));

        let outcome = controller.run(&mut hooks).unwrap();

        assert_eq!(outcome.status, TrainingStatus::MaxEpochReached);
        assert_eq!(hooks.trained, vec![0, 1, 2]);
        assert_eq!(outcome.state.last_epoch, Some(2));
        assert_eq!(outcome.state.best_validate, 3.0);
    }

    #[test]
    fn test_best_validate_is_non_increasing() {
        let mut hooks = Scripted::new(&[5.0, 6.0, 3.0, 7.0, 2.5, 9.0]);
        let mut controller = TrainingController::new(config(6, 10, 1));
        controller.run(&mut hooks).unwrap();

        let bests: Vec<f64> = hooks.saved.iter().map(|(_, s)| s.best_validate).collect();
        assert_eq!(bests, vec![5.0, 5.0, 3.0, 3.0, 2.5, 2.5]);
        let bad: Vec<usize> = hooks.saved.iter().map(|(_, s)| s.bad_epochs).collect();
        assert_eq!(bad, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_save_interval() {
        let mut hooks = Scripted::new(&[5.0, 4.0, 3.0, 2.0, 1.0]);
        let mut controller = TrainingController::new(config(5, 5, 2));
        controller.run(&mut hooks).unwrap();
        let saved: Vec<usize> = hooks.saved.iter().map(|(e, _)| *e).collect();
        assert_eq!(saved, vec![0, 2, 4]);
    }

    #[test]
    fn test_resume_continues_after_last_epoch_with_restored_best() {
        let mut hooks = Scripted::new(&[4.0, 3.5]);
        let restored = RestoredState { last_epoch: 2, best_validate: 3.0 };
        let mut controller = TrainingController::new(config(10, 2, 1)).with_restored(Some(restored));

        let outcome = controller.run(&mut hooks).unwrap();

        // Neither 4.0 nor 3.5 beats the restored 3.0
        assert_eq!(hooks.trained, vec![3, 4]);
        assert_eq!(outcome.status, TrainingStatus::EarlyStopped);
        assert_eq!(outcome.state.best_validate, 3.0);
    }

    #[test]
    fn test_resume_at_max_epoch_runs_nothing() {
        let mut hooks = Scripted::new(&[]);
        let restored = RestoredState { last_epoch: 9, best_validate: 3.0 };
        let mut controller = TrainingController::new(config(10, 2, 1)).with_restored(Some(restored));

        let outcome = controller.run(&mut hooks).unwrap();

        assert_eq!(outcome.status, TrainingStatus::MaxEpochReached);
        assert_eq!(outcome.epochs_run, 0);
        assert!(hooks.trained.is_empty());
    }

    #[test]
    fn test_non_finite_perplexity_counts_as_bad_epoch() {
        let mut hooks = Scripted::new(&[f64::NAN, f64::NAN]);
        let mut controller = TrainingController::new(config(10, 2, 1));
        let outcome = controller.run(&mut hooks).unwrap();
        assert_eq!(outcome.status, TrainingStatus::EarlyStopped);
        assert!(outcome.state.best_validate.is_infinite());
    }

    #[test]
    fn test_hook_error_propagates() {
        let mut hooks = Scripted::new(&[5.0, 4.0]);
        hooks.fail_at = Some(1);
        let mut controller = TrainingController::new(config(10, 5, 1));
        assert!(controller.run(&mut hooks).is_err());
        assert_eq!(controller.state().last_epoch, Some(0));
        assert_eq!(controller.status(), TrainingStatus::Running);
    }

    #[test]
    fn test_early_stopping_seeded_best() {
        let mut es = EarlyStopping::new(1).with_best(2.0);
        assert!(!es.observe(2.0));
        assert!(es.should_stop());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Early stopping always stops after patience epochs without improvement
        #[test]
        fn early_stopping_respects_patience(patience in 1usize..10, initial in 0.1f64..10.0) {
            let mut es = EarlyStopping::new(patience);
            es.observe(initial);
            for epoch in 1..=patience {
                es.observe(initial);
                prop_assert_eq!(es.should_stop(), epoch >= patience);
            }
        }

        /// The tracked best never increases
        #[test]
        fn best_is_monotone(values in proptest::collection::vec(0.0f64..100.0, 1..30)) {
            let mut es = EarlyStopping::new(3);
            let mut previous = f64::INFINITY;
            for v in values {
                es.observe(v);
                prop_assert!(es.best() <= previous);
                previous = es.best();
            }
        }
    }
}
