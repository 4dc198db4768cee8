//! Serializable model and checkpoint state

use crate::model::{ModelConfig, Seq2SeqModel};
use crate::optim::OptimizerState;
use ndarray::ArrayView1;
use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

/// Information about a model parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name (e.g., "encoder.embed_tokens")
    pub name: String,

    /// Number of elements
    pub len: usize,

    /// Whether this parameter requires gradients
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub requires_grad: bool,
}

/// Parameters of one model, flattened in `named_parameters` order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    /// Architecture the parameters belong to
    pub config: ModelConfig,

    /// Parameter information
    pub parameters: Vec<ParameterInfo>,

    /// Flattened parameter data
    pub data: Vec<f32>,
}

impl ModelState {
    /// Snapshot a model's parameters
    pub fn capture(model: &dyn Seq2SeqModel) -> Self {
        let mut data = Vec::with_capacity(model.num_parameters());
        let parameters = model
            .named_parameters()
            .into_iter()
            .map(|(name, tensor)| {
                data.extend(tensor.data().iter().copied());
                ParameterInfo {
                    name: name.to_string(),
                    len: tensor.len(),
                    requires_grad: tensor.requires_grad(),
                }
            })
            .collect();
        Self { config: model.config().clone(), parameters, data }
    }

    /// Describe why this state cannot be loaded into `model`, if it cannot
    pub fn incompatibility(&self, model: &dyn Seq2SeqModel) -> Option<String> {
        if self.config.arch != model.config().arch {
            return Some(format!(
                "architecture '{}' does not match '{}'",
                self.config.arch,
                model.config().arch
            ));
        }
        let expected = model.named_parameters();
        if expected.len() != self.parameters.len() {
            return Some(format!(
                "{} parameters stored, model has {}",
                self.parameters.len(),
                expected.len()
            ));
        }
        for (info, (name, tensor)) in self.parameters.iter().zip(&expected) {
            if info.name != *name || info.len != tensor.len() {
                return Some(format!(
                    "parameter '{}' ({}) does not match '{name}' ({})",
                    info.name,
                    info.len,
                    tensor.len()
                ));
            }
        }
        let total: usize = self.parameters.iter().map(|p| p.len).sum();
        if total != self.data.len() {
            return Some(format!("{} values stored for {total} parameters", self.data.len()));
        }
        None
    }

    /// Copy the stored values into `model`
    ///
    /// Callers check [`Self::incompatibility`] first; values beyond a
    /// mismatching parameter are not copied.
    pub(crate) fn apply(&self, model: &mut dyn Seq2SeqModel) {
        let mut offset = 0;
        for (info, (_, tensor)) in self.parameters.iter().zip(model.named_parameters_mut()) {
            if info.len != tensor.len() || offset + info.len > self.data.len() {
                break;
            }
            tensor.data_mut().assign(&ArrayView1::from(&self.data[offset..offset + info.len]));
            offset += info.len;
        }
    }
}

/// Whether optimizer moments fit the parameters they will be applied to
pub(crate) fn optimizer_incompatibility(
    state: &OptimizerState,
    model: &dyn Seq2SeqModel,
) -> Option<String> {
    let sizes: Vec<usize> = model.named_parameters().iter().map(|(_, t)| t.len()).collect();
    for (kind, moments) in [("first", &state.first_moments), ("second", &state.second_moments)] {
        if moments.len() > sizes.len() {
            return Some(format!(
                "{} {kind} moments stored for {} parameters",
                moments.len(),
                sizes.len()
            ));
        }
        for (i, (moment, &size)) in moments.iter().zip(&sizes).enumerate() {
            if let Some(m) = moment {
                if m.len() != size {
                    return Some(format!(
                        "{kind} moment {i} has {} values, parameter has {size}",
                        m.len()
                    ));
                }
            }
        }
    }
    None
}

/// Content of one checkpoint file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Last completed epoch
    pub epoch: usize,

    /// Lowest validation perplexity so far; `None` when not finite
    pub best_loss: Option<f64>,

    /// Validation perplexity of `epoch`; `None` when not finite
    pub val_loss: Option<f64>,

    /// Model parameters
    pub model: ModelState,

    /// Optimizer state
    pub optimizer: OptimizerState,
}

impl CheckpointState {
    /// Snapshot a model and its optimizer
    pub fn capture(
        model: &dyn Seq2SeqModel,
        optimizer: OptimizerState,
        epoch: usize,
        best_loss: f64,
        val_loss: f64,
    ) -> Self {
        Self {
            epoch,
            best_loss: best_loss.is_finite().then_some(best_loss),
            val_loss: val_loss.is_finite().then_some(val_loss),
            model: ModelState::capture(model),
            optimizer,
        }
    }

    /// Best perplexity, `+∞` when none was stored
    pub fn best_validate(&self) -> f64 {
        self.best_loss.unwrap_or(f64::INFINITY)
    }
}
