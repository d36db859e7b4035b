use ndarray::{Array1, ArrayView1};

use crate::{activation::sigmoid, NetErr, Network, Result};

/// Per-layer values produced by a forward pass.
///
/// `activations` holds one vector per layer, the first one being a copy of the inputs.
/// `weighted_sums` holds the pre-activation sums `z` of layers `1..`, the input layer has none.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    activations: Vec<Array1<f32>>,
    weighted_sums: Vec<Array1<f32>>,
}

impl Trace {
    /// The number of layers this trace covers, input layer included.
    pub fn len(&self) -> usize {
        self.activations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }

    /// Returns the activations of `layer`.
    ///
    /// # Errors
    /// `UninitializedActivation` if the forward pass never reached `layer`.
    pub fn activation(&self, layer: usize) -> Result<ArrayView1<'_, f32>> {
        self.activations
            .get(layer)
            .map(|a| a.view())
            .ok_or(NetErr::UninitializedActivation { layer })
    }

    /// Returns the weighted sums `z` of `layer`.
    ///
    /// # Errors
    /// `UninitializedActivation` for the input layer, which has no weighted sums, or for a
    /// layer the forward pass never reached.
    pub fn z(&self, layer: usize) -> Result<ArrayView1<'_, f32>> {
        layer
            .checked_sub(1)
            .and_then(|i| self.weighted_sums.get(i))
            .map(|z| z.view())
            .ok_or(NetErr::UninitializedActivation { layer })
    }

    /// The activations of the output layer.
    pub fn output(&self) -> ArrayView1<'_, f32> {
        // a trace always holds at least the input layer
        self.activations[self.activations.len() - 1].view()
    }
}

/// Feeds `inputs` through `network` layer by layer, computing
/// `z = W a_prev + b` and `a = sigmoid(z)` for every layer past the input one.
///
/// The network is not modified.
///
/// # Errors
/// `ShapeMismatch` if `inputs` isn't as wide as the network's input layer.
pub fn feed(inputs: &[f32], network: &Network) -> Result<Trace> {
    let expected = network.input_width();
    if inputs.len() != expected {
        return Err(NetErr::ShapeMismatch {
            what: "inputs",
            got: inputs.len(),
            expected,
        });
    }

    let nlayers = network.sizes().len();
    let mut activations = Vec::with_capacity(nlayers);
    let mut weighted_sums = Vec::with_capacity(nlayers - 1);

    activations.push(Array1::from_vec(inputs.to_vec()));

    for (w, b) in network.weights().iter().zip(network.biases()) {
        let prev = &activations[activations.len() - 1];
        let z = w.dot(prev) + b;
        let a = z.mapv(sigmoid);

        weighted_sums.push(z);
        activations.push(a);
    }

    Ok(Trace {
        activations,
        weighted_sums,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backward::Gradients;

    /// A `[2, 2, 1]` network with every parameter set to zero.
    fn zeroed() -> Network {
        let mut net = Network::new(&[2, 2, 1], 1.).unwrap();
        let mut grads = Gradients::zeros_like(&net);

        // drive every parameter to 0: p + (-p) * 1 * 1
        for (dw, w) in grads.weights_mut().iter_mut().zip(net.weights()) {
            dw.assign(&w.mapv(|p| -p));
        }
        for (db, b) in grads.biases_mut().iter_mut().zip(net.biases()) {
            db.assign(&b.mapv(|p| -p));
        }

        net.update_params(&grads, 1.).unwrap();
        net
    }

    #[test]
    fn input_layer_is_a_copy() {
        let net = Network::new(&[3, 4, 2], 1.).unwrap();
        let trace = feed(&[0.1, 0.2, 0.3], &net).unwrap();

        assert_eq!(trace.len(), 3);
        assert_eq!(trace.activation(0).unwrap().to_vec(), vec![0.1, 0.2, 0.3]);
        assert_eq!(trace.activation(1).unwrap().len(), 4);
        assert_eq!(trace.output().len(), 2);
    }

    #[test]
    fn zero_parameters_give_one_half() {
        let net = zeroed();
        let trace = feed(&[1., 0.], &net).unwrap();

        assert_eq!(trace.z(1).unwrap().to_vec(), vec![0., 0.]);
        assert_eq!(trace.activation(1).unwrap().to_vec(), vec![0.5, 0.5]);
        assert_eq!(trace.z(2).unwrap().to_vec(), vec![0.]);
        assert_eq!(trace.output().to_vec(), vec![0.5]);
    }

    #[test]
    fn matches_a_hand_computed_pass() {
        let net = Network::new(&[2, 3, 1], 1.).unwrap();
        let x = [0.7, -0.2];
        let trace = feed(&x, &net).unwrap();

        let (w1, b1) = (&net.weights()[0], &net.biases()[0]);
        let hidden: Vec<f32> = (0..3)
            .map(|n| sigmoid(w1[(n, 0)] * x[0] + w1[(n, 1)] * x[1] + b1[n]))
            .collect();

        let (w2, b2) = (&net.weights()[1], &net.biases()[1]);
        let out = sigmoid((0..3).map(|k| w2[(0, k)] * hidden[k]).sum::<f32>() + b2[0]);

        for (got, expected) in trace.activation(1).unwrap().iter().zip(&hidden) {
            assert!((got - expected).abs() < 1e-6);
        }
        assert!((trace.output()[0] - out).abs() < 1e-6);
    }

    #[test]
    fn is_deterministic() {
        let net = Network::new(&[4, 8, 8, 3], 1.).unwrap();
        let x = [0.3, 0.9, 0.0, 1.0];

        let first = feed(&x, &net).unwrap();
        let second = feed(&x, &net).unwrap();

        // bit-identical, not just close
        assert_eq!(first, second);
    }

    #[test]
    fn does_not_mutate_the_network() {
        let net = Network::new(&[2, 3, 1], 1.).unwrap();
        let before = net.clone();
        feed(&[1., 1.], &net).unwrap();
        assert_eq!(net, before);
    }

    #[test]
    fn rejects_wrong_input_width() {
        let net = Network::new(&[2, 3, 1], 1.).unwrap();
        let err = feed(&[1., 0., 1.], &net).unwrap_err();

        assert!(matches!(
            err,
            NetErr::ShapeMismatch {
                what: "inputs",
                got: 3,
                expected: 2
            }
        ));
    }

    #[test]
    fn input_layer_has_no_weighted_sums() {
        let net = Network::new(&[2, 3, 1], 1.).unwrap();
        let trace = feed(&[1., 0.], &net).unwrap();

        assert!(matches!(
            trace.z(0),
            Err(NetErr::UninitializedActivation { layer: 0 })
        ));
        assert!(matches!(
            trace.z(3),
            Err(NetErr::UninitializedActivation { layer: 3 })
        ));
        assert!(matches!(
            trace.activation(3),
            Err(NetErr::UninitializedActivation { layer: 3 })
        ));
    }
}
