use std::{fs::File, io::BufReader, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{NetErr, Result};

/// The knobs of a training run, read from a JSON file where every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Layer widths, input first. `None` lets the caller pick a topology for its data.
    pub sizes: Option<Vec<usize>>,
    pub learning_rate: f32,
    pub batch_size: usize,
    /// The amount of mini-batches to train on.
    pub batches: usize,
    /// How long a loop may run before handing control back to the runtime.
    pub yield_interval_ms: u64,
    /// The amount of examples to measure accuracy on.
    pub eval_size: usize,
    /// Seeds parameter initialization and batch sampling when set.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            sizes: None,
            learning_rate: 1.,
            batch_size: 4,
            batches: 10_000,
            yield_interval_ms: 50,
            eval_size: 1_000,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    /// `Io` or `Json` if the file can't be read or parsed, `InvalidArgument` if a value is
    /// out of range.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value is usable.
    pub fn validate(&self) -> Result<()> {
        if let Some(sizes) = &self.sizes {
            if sizes.len() < 2 || sizes.contains(&0) {
                return Err(NetErr::InvalidArgument(format!(
                    "sizes must hold at least two non-zero widths, got {sizes:?}"
                )));
            }
        }

        if !(self.learning_rate > 0.) || !self.learning_rate.is_finite() {
            return Err(NetErr::InvalidArgument(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }

        if self.batch_size == 0 {
            return Err(NetErr::InvalidArgument("batch size must be positive".into()));
        }

        if self.eval_size == 0 {
            return Err(NetErr::InvalidArgument("eval size must be positive".into()));
        }

        Ok(())
    }

    pub fn yield_interval(&self) -> Duration {
        Duration::from_millis(self.yield_interval_ms)
    }
}
