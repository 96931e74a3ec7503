pub mod conv1d;

pub use conv1d::conv1d;
