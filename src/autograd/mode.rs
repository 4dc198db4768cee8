//! Train/eval switch carried by each model

/// Whether a model records backward operations
///
/// Validation switches both models to [`Mode::Eval`], so its forward passes
/// build no tape and leave gradients untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

impl Mode {
    /// True in training mode
    pub fn is_training(self) -> bool {
        self == Mode::Train
    }

    /// Whether outputs produced in this mode carry a backward operation
    pub fn records_tape(self) -> bool {
        self.is_training()
    }
}
