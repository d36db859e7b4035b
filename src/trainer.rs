use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use tokio::time::Instant;

use crate::{
    backward::{accumulate, Gradients},
    data::{arg_max, DataProvider, TrainingExample},
    forward::feed,
    scheduler::{CooperativeLoop, LoopBody},
    NetErr, Network, Result,
};

/// A summary of a `Trainer::run_batches` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingReport {
    /// The amount of mini-batches trained on.
    pub batches: usize,
    /// The amount of examples back-propagated across every batch.
    pub examples: usize,
    pub elapsed: Duration,
}

/// Mini-batch gradient descent driven by a `CooperativeLoop`, so long runs hand control
/// back to the runtime between examples.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    looper: CooperativeLoop,
}

/// Back-propagates one example per step into a private accumulator.
struct BatchStep<'a> {
    batch: &'a [TrainingExample],
    network: &'a Network,
    grads: Gradients,
}

impl LoopBody for BatchStep<'_> {
    type Output = Gradients;

    fn step(&mut self, index: usize) -> Result<()> {
        let ex = &self.batch[index];
        accumulate(&ex.inputs, &ex.expected_outputs, self.network, &mut self.grads)
    }

    fn finish(self) -> Gradients {
        self.grads
    }
}

/// Counts the examples whose expected one-hot class matches the network's arg-max.
struct AccuracyStep<'a> {
    test_set: &'a [TrainingExample],
    network: &'a Network,
    correct: usize,
}

impl LoopBody for AccuracyStep<'_> {
    type Output = usize;

    fn step(&mut self, index: usize) -> Result<()> {
        let ex = &self.test_set[index];
        let width = self.network.output_width();
        ex.check_shape(self.network.input_width(), width)?;

        let trace = feed(&ex.inputs, self.network)?;
        let predicted = trace.output().to_vec();

        if let Some(class) = arg_max(&predicted) {
            if ex.expected_outputs[class] == 1. {
                self.correct += 1;
            }
        }

        Ok(())
    }

    fn finish(self) -> usize {
        self.correct
    }
}

impl Trainer {
    pub fn new(looper: CooperativeLoop) -> Self {
        Self { looper }
    }

    /// Trains `network` on a single mini-batch.
    ///
    /// Every example is back-propagated into a fresh accumulator, yielding to the runtime
    /// as configured, and once all of them succeed the averaged deltas are applied in a
    /// single `update_params` call. An empty batch is a no-op.
    ///
    /// # Arguments
    /// * `batch` - The examples to train on.
    /// * `network` - The network to update, borrowed mutably for the whole batch.
    ///
    /// # Errors
    /// `ShapeMismatch` for an example that doesn't fit the network, or `Cancelled`. Either
    /// way `network` is left exactly as it was.
    pub async fn train(&self, batch: &[TrainingExample], network: &mut Network) -> Result<()> {
        if batch.is_empty() {
            warn!("skipping an empty batch");
            return Ok(());
        }

        let body = BatchStep {
            batch,
            network: &*network,
            grads: Gradients::zeros_like(network),
        };

        let grads = self.looper.run(batch.len() as i64, body).await?;
        network.update_params(&grads, 1. / batch.len() as f32)
    }

    /// Draws `batches` mini-batches of `batch_size` examples from `provider` and trains on
    /// each of them in turn.
    ///
    /// # Errors
    /// Whatever `DataProvider::batch` or `train` fail with. Batches trained before the
    /// failure stay applied.
    pub async fn run_batches<P, R>(
        &self,
        batches: usize,
        batch_size: usize,
        provider: &P,
        network: &mut Network,
        rng: &mut R,
    ) -> Result<TrainingReport>
    where
        P: DataProvider,
        R: Rng + ?Sized,
    {
        let start = Instant::now();
        let mut examples = 0;

        for i in 0..batches {
            let batch = provider.batch(batch_size, rng)?;
            self.train(&batch, network).await?;
            examples += batch.len();

            let elapsed = start.elapsed();
            let remaining = elapsed.mul_f64((batches - i - 1) as f64 / (i + 1) as f64);
            debug!(
                batch = i + 1, total = batches;
                "trained in {elapsed:?}, about {remaining:?} left"
            );
        }

        let report = TrainingReport {
            batches,
            examples,
            elapsed: start.elapsed(),
        };

        info!(
            "trained on {} batches ({} examples) in {:?}",
            report.batches, report.examples, report.elapsed
        );

        Ok(report)
    }

    /// The fraction of `test_set` the network classifies correctly, taking the arg-max of
    /// its outputs as the predicted class and the expected outputs as one-hot labels.
    ///
    /// # Errors
    /// * `InvalidArgument` if `test_set` is empty.
    /// * `ShapeMismatch` for an example that doesn't fit the network.
    pub async fn evaluate(&self, test_set: &[TrainingExample], network: &Network) -> Result<f32> {
        if test_set.is_empty() {
            return Err(NetErr::InvalidArgument(
                "accuracy over an empty test set".to_string(),
            ));
        }

        let body = AccuracyStep {
            test_set,
            network,
            correct: 0,
        };

        let correct = self.looper.run(test_set.len() as i64, body).await?;
        let accuracy = correct as f32 / test_set.len() as f32;

        debug!("{correct}/{} correct", test_set.len());
        Ok(accuracy)
    }

    /// The mean over `examples` of `sum((a - y)^2) / 2`, the cost `back_prop` descends.
    ///
    /// # Errors
    /// * `InvalidArgument` if `examples` is empty.
    /// * `ShapeMismatch` for an example that doesn't fit the network.
    pub fn mean_squared_error(examples: &[TrainingExample], network: &Network) -> Result<f32> {
        if examples.is_empty() {
            return Err(NetErr::InvalidArgument(
                "error over an empty set of examples".to_string(),
            ));
        }

        let mut total = 0.;
        for ex in examples {
            ex.check_shape(network.input_width(), network.output_width())?;

            let trace = feed(&ex.inputs, network)?;
            total += trace
                .output()
                .iter()
                .zip(&ex.expected_outputs)
                .map(|(a, y)| (a - y).powi(2))
                .sum::<f32>()
                / 2.;
        }

        Ok(total / examples.len() as f32)
    }
}
