use log::debug;
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::{backward::Gradients, NetErr, Result};

/// A fully connected feed-forward network with sigmoid activations.
///
/// Layer `0` is the input layer and has no parameters, so `weights()[i]` and `biases()[i]`
/// belong to layer `i + 1`. A weight matrix has one row per neuron and one column per
/// incoming connection, that is, a `(sizes[l], sizes[l - 1])` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    sizes: Vec<usize>,
    weights: Vec<Array2<f32>>,
    biases: Vec<Array1<f32>>,
    learning_rate: f32,
}

impl Network {
    /// Creates a new `Network` with every parameter sampled uniformly from `[-1, 1)`
    /// using the thread's random number generator.
    ///
    /// # Arguments
    /// * `sizes` - The width of every layer: input, hidden layers and output.
    /// * `learning_rate` - The constant step length used by `update_params`.
    ///
    /// # Returns
    /// A new `Network` or `InvalidArgument` if there are less than two layers, a layer
    /// is empty or the learning rate is not a finite positive number.
    pub fn new(sizes: &[usize], learning_rate: f32) -> Result<Self> {
        Self::with_rng(sizes, learning_rate, &mut rand::rng())
    }

    /// Same as `new` but samples the initial parameters from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        sizes: &[usize],
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(NetErr::InvalidArgument(format!(
                "a network needs at least 2 layers, got {}",
                sizes.len()
            )));
        }

        if let Some(layer) = sizes.iter().position(|&size| size == 0) {
            return Err(NetErr::InvalidArgument(format!("layer {layer} is empty")));
        }

        // NaN fails this comparison too
        if !(learning_rate > 0.) || !learning_rate.is_finite() {
            return Err(NetErr::InvalidArgument(format!(
                "the learning rate must be finite and positive, got {learning_rate}"
            )));
        }

        let uniform =
            Uniform::new(-1f32, 1.).map_err(|e| NetErr::InvalidArgument(e.to_string()))?;

        let weights = sizes
            .windows(2)
            .map(|dim| {
                Array2::from_shape_simple_fn((dim[1], dim[0]), || uniform.sample(&mut *rng))
            })
            .collect();

        let biases = sizes[1..]
            .iter()
            .map(|&size| Array1::from_shape_simple_fn(size, || uniform.sample(&mut *rng)))
            .collect();

        debug!("created network with sizes {sizes:?} and learning rate {learning_rate}");

        Ok(Self {
            sizes: sizes.to_vec(),
            weights,
            biases,
            learning_rate,
        })
    }

    /// The width of every layer, input first.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// The width of the input layer.
    pub fn input_width(&self) -> usize {
        self.sizes[0]
    }

    /// The width of the output layer.
    pub fn output_width(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    /// The weight matrices of layers `1..`.
    pub fn weights(&self) -> &[Array2<f32>] {
        &self.weights
    }

    /// The bias vectors of layers `1..`.
    pub fn biases(&self) -> &[Array1<f32>] {
        &self.biases
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// The total amount of scalar parameters.
    pub fn num_params(&self) -> usize {
        self.weights.iter().map(|w| w.len()).sum::<usize>()
            + self.biases.iter().map(|b| b.len()).sum::<usize>()
    }

    /// Applies the accumulated deltas to the parameters, this is the network's only
    /// mutation path: `param += delta * scale * learning_rate` for every weight and bias.
    ///
    /// Shapes are fully validated before anything is written, so on error the network is
    /// left untouched.
    ///
    /// # Arguments
    /// * `grads` - Deltas shaped exactly like the parameters.
    /// * `scale` - A multiplier for every delta, `1 / batch_len` when averaging a batch.
    pub fn update_params(&mut self, grads: &Gradients, scale: f32) -> Result<()> {
        grads.check_shape(self)?;

        let alpha = scale * self.learning_rate;

        for (w, dw) in self.weights.iter_mut().zip(grads.weights()) {
            w.scaled_add(alpha, dw);
        }

        for (b, db) in self.biases.iter_mut().zip(grads.biases()) {
            b.scaled_add(alpha, db);
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn weight_mut(&mut self, layer: usize, neuron: usize, input: usize) -> &mut f32 {
        &mut self.weights[layer - 1][(neuron, input)]
    }

    #[cfg(test)]
    pub(crate) fn bias_mut(&mut self, layer: usize, neuron: usize) -> &mut f32 {
        &mut self.biases[layer - 1][neuron]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn parameters_follow_the_topology() {
        for sizes in [vec![2, 1], vec![2, 3, 1], vec![784, 16, 16, 10], vec![3, 5, 4, 2, 7]] {
            let net = Network::new(&sizes, 1.).unwrap();

            assert_eq!(net.weights().len(), sizes.len() - 1);
            assert_eq!(net.biases().len(), sizes.len() - 1);

            for l in 1..sizes.len() {
                assert_eq!(net.weights()[l - 1].dim(), (sizes[l], sizes[l - 1]));
                assert_eq!(net.biases()[l - 1].len(), sizes[l]);
            }
        }
    }

    #[test]
    fn parameters_are_sampled_in_range() {
        let net = Network::new(&[30, 40, 20], 0.5).unwrap();

        let all: Vec<f32> = net
            .weights()
            .iter()
            .flat_map(|w| w.iter().copied())
            .chain(net.biases().iter().flat_map(|b| b.iter().copied()))
            .collect();

        assert_eq!(all.len(), net.num_params());
        assert!(all.iter().all(|p| (-1. ..1.).contains(p)));

        // 2060 samples of U(-1, 1): the mean sits near 0 and both tails are populated
        let mean = all.iter().sum::<f32>() / all.len() as f32;
        assert!(mean.abs() < 0.1, "mean = {mean}");
        assert!(all.iter().any(|&p| p < -0.5));
        assert!(all.iter().any(|&p| p > 0.5));
    }

    #[test]
    fn rejects_invalid_construction() {
        assert!(matches!(
            Network::new(&[3], 1.),
            Err(NetErr::InvalidArgument(_))
        ));
        assert!(matches!(
            Network::new(&[3, 0, 1], 1.),
            Err(NetErr::InvalidArgument(_))
        ));
        assert!(matches!(
            Network::new(&[3, 1], 0.),
            Err(NetErr::InvalidArgument(_))
        ));
        assert!(matches!(
            Network::new(&[3, 1], f32::NAN),
            Err(NetErr::InvalidArgument(_))
        ));
        assert!(matches!(
            Network::new(&[3, 1], f32::INFINITY),
            Err(NetErr::InvalidArgument(_))
        ));
    }

    #[test]
    fn update_scales_by_learning_rate() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut net = Network::with_rng(&[2, 3, 1], 0.5, &mut rng).unwrap();
        let before = net.clone();

        let mut grads = Gradients::zeros_like(&net);
        grads.weights_mut()[0].fill(1.);
        grads.biases_mut()[1].fill(-2.);

        net.update_params(&grads, 0.25).unwrap();

        let expected_w = &before.weights()[0] + 0.125;
        let expected_b = &before.biases()[1] - 0.25;
        assert_eq!(net.weights()[0], expected_w);
        assert_eq!(net.biases()[1], expected_b);
        assert_eq!(net.weights()[1], before.weights()[1]);
        assert_eq!(net.biases()[0], before.biases()[0]);
    }

    #[test]
    fn update_rejects_foreign_shapes() {
        let mut net = Network::new(&[2, 3, 1], 1.).unwrap();
        let before = net.clone();
        let other = Network::new(&[2, 4, 1], 1.).unwrap();

        let err = net
            .update_params(&Gradients::zeros_like(&other), 1.)
            .unwrap_err();

        assert!(matches!(err, NetErr::ShapeMismatch { .. }));
        assert_eq!(net, before);
    }
}
