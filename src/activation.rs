/// The logistic function, maps any real into `(0, 1)`.
pub fn sigmoid(z: f32) -> f32 {
    1. / (1. + (-z).exp())
}

/// Derivative of `sigmoid`, evaluated from the weighted sum `z`.
pub fn sigmoid_prime(z: f32) -> f32 {
    let s = sigmoid(z);
    s * (1. - s)
}
