use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, NetErr>;

/// The crate's error type.
#[derive(Debug)]
pub enum NetErr {
    /// A vector's length doesn't match the width the network expects.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A layer's activation or weighted sum was read before a forward pass produced it.
    UninitializedActivation { layer: usize },
    /// An argument is outside of the operation's domain.
    InvalidArgument(String),
    /// A data provider was asked for examples before its data was loaded.
    DatasetNotLoaded { dataset: &'static str },
    /// A cooperative loop observed its cancellation token at a yield boundary.
    Cancelled,
    Io(io::Error),
    Json(serde_json::Error),
}

impl NetErr {
    /// Whether retrying the same call later may succeed.
    ///
    /// # Returns
    /// `true` only for `DatasetNotLoaded`, every other variant is a caller or programming error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, NetErr::DatasetNotLoaded { .. })
    }
}

impl Display for NetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch for {what}: got {got}, expected {expected}"),
            NetErr::UninitializedActivation { layer } => {
                write!(f, "layer {layer} has no computed value, run a forward pass first")
            }
            NetErr::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            NetErr::DatasetNotLoaded { dataset } => {
                write!(f, "the {dataset} data set is not loaded yet")
            }
            NetErr::Cancelled => write!(f, "the loop was cancelled"),
            NetErr::Io(e) => write!(f, "io error: {e}"),
            NetErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for NetErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NetErr::Io(e) => Some(e),
            NetErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NetErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for NetErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
