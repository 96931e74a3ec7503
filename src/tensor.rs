use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("expected {expected} indices, got {actual}")]
    RankMismatch { expected: usize, actual: usize },
    #[error("index {index} out of bounds for axis {axis} of size {size}")]
    OutOfBounds {
        axis: usize,
        index: usize,
        size: usize,
    },
    #[error("expected {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Linear size of a shape. An empty dimension list denotes "no tensor" and
/// has size 0, same as a shape with an explicit zero-sized axis.
pub fn total_size(dims: &[usize]) -> usize {
    if dims.is_empty() {
        0
    } else {
        dims.iter().product()
    }
}

fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut s = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = s;
        s *= shape[i];
    }
    strides
}

/// Dense multi-dimensional array backed by a flat row-major buffer.
///
/// Dimension order is semantically meaningful to callers (the convolution
/// path uses `[batch, channel, spatial]`). All multi-index access goes
/// through [`Tensor::get`] / [`Tensor::set`], which validate index arity and
/// bounds before touching storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tensor<T> {
    data: Vec<T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<T: Copy + Default> Tensor<T> {
    /// Zero-initialized tensor with the given shape.
    pub fn new(shape: &[usize]) -> Self {
        Tensor {
            data: vec![T::default(); total_size(shape)],
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        }
    }

    /// Wrap an existing flat buffer. The length must match the shape.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self, TensorError> {
        let expected = total_size(shape);
        if data.len() != expected {
            return Err(TensorError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Tensor {
            data,
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        })
    }

    /// Replace the shape, recompute strides and rezero storage. Prior
    /// contents are discarded, not reshaped.
    pub fn resize(&mut self, shape: &[usize]) {
        self.shape = shape.to_vec();
        self.strides = compute_strides(shape);
        self.data.clear();
        self.data.resize(total_size(shape), T::default());
    }

    fn offset(&self, indices: &[usize]) -> Result<usize, TensorError> {
        if indices.len() != self.shape.len() {
            return Err(TensorError::RankMismatch {
                expected: self.shape.len(),
                actual: indices.len(),
            });
        }
        // An empty shape denotes "no tensor"; it has no addressable elements.
        if self.shape.is_empty() {
            return Err(TensorError::OutOfBounds {
                axis: 0,
                index: 0,
                size: 0,
            });
        }
        let mut offset = 0;
        for (axis, (&index, &size)) in indices.iter().zip(&self.shape).enumerate() {
            if index >= size {
                return Err(TensorError::OutOfBounds { axis, index, size });
            }
            offset += index * self.strides[axis];
        }
        Ok(offset)
    }

    pub fn get(&self, indices: &[usize]) -> Result<T, TensorError> {
        Ok(self.data[self.offset(indices)?])
    }

    pub fn set(&mut self, indices: &[usize], value: T) -> Result<(), TensorError> {
        let offset = self.offset(indices)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Replace the whole backing buffer. The tensor is left untouched when
    /// the length does not match.
    pub fn fill(&mut self, values: Vec<T>) -> Result<(), TensorError> {
        if values.len() != self.data.len() {
            return Err(TensorError::SizeMismatch {
                expected: self.data.len(),
                actual: values.len(),
            });
        }
        self.data = values;
        Ok(())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self, axis: usize) -> usize {
        self.shape[axis]
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
