use ndarray::{linalg, Array1, Array2, ArrayView1, Axis};

use crate::{activation::sigmoid_prime, forward::feed, NetErr, Network, Result};

/// Running sums of per-example negative gradients, shaped like a network's parameters.
///
/// An accumulator built with `empty` carries no shape yet and is zero-filled to the
/// network's topology on its first use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gradients {
    weights: Vec<Array2<f32>>,
    biases: Vec<Array1<f32>>,
}

impl Gradients {
    /// An accumulator without a shape.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A zero-filled accumulator matching `network`'s topology.
    pub fn zeros_like(network: &Network) -> Self {
        Self {
            weights: network
                .weights()
                .iter()
                .map(|w| Array2::zeros(w.dim()))
                .collect(),
            biases: network
                .biases()
                .iter()
                .map(|b| Array1::zeros(b.dim()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty() && self.biases.is_empty()
    }

    /// Zeroes every delta, keeping the shape.
    pub fn reset(&mut self) {
        self.weights.iter_mut().for_each(|dw| dw.fill(0.));
        self.biases.iter_mut().for_each(|db| db.fill(0.));
    }

    /// The weight deltas of layers `1..`.
    pub fn weights(&self) -> &[Array2<f32>] {
        &self.weights
    }

    /// The bias deltas of layers `1..`.
    pub fn biases(&self) -> &[Array1<f32>] {
        &self.biases
    }

    pub fn weights_mut(&mut self) -> &mut [Array2<f32>] {
        &mut self.weights
    }

    pub fn biases_mut(&mut self) -> &mut [Array1<f32>] {
        &mut self.biases
    }

    /// Checks every delta has the shape of its parameter in `network`.
    ///
    /// # Errors
    /// `ShapeMismatch` on the first layer count, row count or column count that differs.
    pub fn check_shape(&self, network: &Network) -> Result<()> {
        let layers = network.weights().len();
        for (what, got) in [
            ("weight delta layers", self.weights.len()),
            ("bias delta layers", self.biases.len()),
        ] {
            if got != layers {
                return Err(NetErr::ShapeMismatch {
                    what,
                    got,
                    expected: layers,
                });
            }
        }

        for (dw, w) in self.weights.iter().zip(network.weights()) {
            if dw.nrows() != w.nrows() {
                return Err(NetErr::ShapeMismatch {
                    what: "weight delta rows",
                    got: dw.nrows(),
                    expected: w.nrows(),
                });
            }

            if dw.ncols() != w.ncols() {
                return Err(NetErr::ShapeMismatch {
                    what: "weight delta columns",
                    got: dw.ncols(),
                    expected: w.ncols(),
                });
            }
        }

        for (db, b) in self.biases.iter().zip(network.biases()) {
            if db.len() != b.len() {
                return Err(NetErr::ShapeMismatch {
                    what: "bias deltas",
                    got: db.len(),
                    expected: b.len(),
                });
            }
        }

        Ok(())
    }
}

/// Backpropagates a single example through `network`, returning the accumulator with this
/// example's negative gradient added to it.
///
/// # Arguments
/// * `inputs` - The example's inputs.
/// * `expected` - The outputs the network should produce for `inputs`.
/// * `network` - The network, it's only read.
/// * `grads` - A running accumulator, `None` or an empty one start from zeros.
///
/// # Errors
/// `ShapeMismatch` if `inputs`, `expected` or the accumulator don't fit the network, in
/// which case nothing is accumulated.
pub fn back_prop(
    inputs: &[f32],
    expected: &[f32],
    network: &Network,
    grads: Option<Gradients>,
) -> Result<Gradients> {
    let mut grads = match grads {
        Some(grads) if !grads.is_empty() => grads,
        _ => Gradients::zeros_like(network),
    };

    accumulate(inputs, expected, network, &mut grads)?;
    Ok(grads)
}

/// In-place version of `back_prop`, `grads` must already be shaped like `network`.
///
/// Error terms are computed from the output layer down:
/// * output: `e = (a - y) * sigmoid'(z)`
/// * hidden: `e = (W_next^T e_next) * sigmoid'(z)`
///
/// and for each layer `db -= e` and `dW -= e a_prev^T`.
pub fn accumulate(
    inputs: &[f32],
    expected: &[f32],
    network: &Network,
    grads: &mut Gradients,
) -> Result<()> {
    let width = network.output_width();
    if expected.len() != width {
        return Err(NetErr::ShapeMismatch {
            what: "expected outputs",
            got: expected.len(),
            expected: width,
        });
    }

    grads.check_shape(network)?;
    let trace = feed(inputs, network)?;

    let nlayers = network.sizes().len();
    let last = nlayers - 1;
    let y = ArrayView1::from(expected);

    let mut error = (&trace.output() - &y) * trace.z(last)?.mapv(sigmoid_prime);

    for layer in (1..nlayers).rev() {
        if layer < last {
            let w_next = &network.weights()[layer];
            error = w_next.t().dot(&error) * trace.z(layer)?.mapv(sigmoid_prime);
        }

        let prev = trace.activation(layer - 1)?;
        let error_col = error.view().insert_axis(Axis(1));
        let prev_row = prev.insert_axis(Axis(0));

        grads.biases[layer - 1].scaled_add(-1., &error);
        linalg::general_mat_mul(
            -1.,
            &error_col,
            &prev_row,
            1.,
            &mut grads.weights[layer - 1],
        );
    }

    Ok(())
}
