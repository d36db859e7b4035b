//! A multilayer perceptron with sigmoid activations, trained by mini-batch stochastic
//! gradient descent through backpropagation.
//!
//! Long loops run on a [`CooperativeLoop`], which hands control back to the async runtime
//! between iterations so training doesn't starve other tasks on the same thread.

pub mod activation;
pub mod backward;
pub mod config;
pub mod data;
mod error;
pub mod forward;
mod network;
pub mod scheduler;
pub mod trainer;

pub use backward::{back_prop, Gradients};
pub use config::TrainingConfig;
pub use data::{DataProvider, TrainingExample};
pub use error::{NetErr, Result};
pub use forward::{feed, Trace};
pub use network::Network;
pub use scheduler::{CooperativeLoop, LoopBody};
pub use trainer::{Trainer, TrainingReport};
