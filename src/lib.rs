//! Minimal neural-network building blocks: a strided dense tensor and a 1-D
//! convolution layer built on top of it.

pub mod init;
pub mod kernels;
pub mod layers;
pub mod tensor;

pub use init::{InitError, Initializer, RandomInit};
pub use kernels::conv1d::ConvError;
pub use layers::conv1d::{Conv1d, Conv1dConfig, PaddingMode};
pub use tensor::{total_size, Tensor, TensorError};
