mod gates;
mod images;

pub use gates::Gate;
pub use images::{LabeledImage, LabeledImages, IMAGE_PIXELS};

use rand::{seq::index, Rng};
use serde::{Deserialize, Serialize};

use crate::{NetErr, Result};

/// A single supervised example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub inputs: Vec<f32>,
    pub expected_outputs: Vec<f32>,
}

impl TrainingExample {
    pub fn new(inputs: Vec<f32>, expected_outputs: Vec<f32>) -> Self {
        Self {
            inputs,
            expected_outputs,
        }
    }

    /// Checks the example fits a network of the given input and output widths.
    pub fn check_shape(&self, input_width: usize, output_width: usize) -> Result<()> {
        if self.inputs.len() != input_width {
            return Err(NetErr::ShapeMismatch {
                what: "inputs",
                got: self.inputs.len(),
                expected: input_width,
            });
        }

        if self.expected_outputs.len() != output_width {
            return Err(NetErr::ShapeMismatch {
                what: "expected outputs",
                got: self.expected_outputs.len(),
                expected: output_width,
            });
        }

        Ok(())
    }
}

/// A source of training examples.
///
/// Providers are plain values owned by the caller and handed to whatever draws batches
/// from them.
pub trait DataProvider {
    /// The width of every example's inputs.
    fn input_width(&self) -> usize;

    /// The width of every example's expected outputs.
    fn output_width(&self) -> usize;

    /// The amount of examples currently available.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fails when the backing data can't be read yet, providers that are always ready keep
    /// the default.
    fn ready(&self) -> Result<()> {
        Ok(())
    }

    /// Builds the example at `index`.
    ///
    /// # Errors
    /// * `DatasetNotLoaded` if the backing data isn't available yet.
    /// * `InvalidArgument` if `index` isn't below `len()`.
    fn example(&self, index: usize) -> Result<TrainingExample>;

    /// Draws `size` examples at distinct random positions.
    ///
    /// # Errors
    /// * `DatasetNotLoaded` if the backing data isn't available yet.
    /// * `InvalidArgument` if more examples than available are requested.
    fn batch<R>(&self, size: usize, rng: &mut R) -> Result<Vec<TrainingExample>>
    where
        R: Rng + ?Sized,
        Self: Sized,
    {
        self.ready()?;

        let len = self.len();
        if size > len {
            return Err(NetErr::InvalidArgument(format!(
                "a batch of {size} examples can't be drawn from {len}"
            )));
        }

        index::sample(rng, len, size)
            .into_iter()
            .map(|i| self.example(i))
            .collect()
    }
}

fn out_of_range(index: usize, len: usize) -> NetErr {
    NetErr::InvalidArgument(format!("example {index} is out of range for {len} examples"))
}

/// A vector of `classes` zeros with a `1` at `class`.
pub fn one_hot(class: usize, classes: usize) -> Vec<f32> {
    (0..classes)
        .map(|i| if i == class { 1. } else { 0. })
        .collect()
}

/// The position of the first greatest value, `None` when `values` is empty.
pub fn arg_max(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, max)) if max >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
