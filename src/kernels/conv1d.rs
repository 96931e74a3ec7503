use matrixmultiply::sgemm;
use thiserror::Error;

use crate::tensor::{Tensor, TensorError};

#[derive(Error, Debug)]
pub enum ConvError {
    #[error("expected input of rank 3, got rank {0}")]
    InputRank(usize),
    #[error("expected weight of rank 3, got rank {0}")]
    WeightRank(usize),
    #[error("expected {expected} input channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("groups ({groups}) must divide in_channels ({in_channels}) and out_channels ({out_channels})")]
    BadGroups {
        groups: usize,
        in_channels: usize,
        out_channels: usize,
    },
    #[error("{name} must be at least 1")]
    ZeroHyperparam { name: &'static str },
    #[error("bias must have shape [{expected}], got {actual} elements")]
    BiasShape { expected: usize, actual: usize },
    #[error("kernel span {span} exceeds padded input length {padded}")]
    EmptyOutput { span: usize, padded: usize },
    #[error("padding mode \"{mode}\" is not supported")]
    UnsupportedPaddingMode { mode: &'static str },
    #[error(transparent)]
    Init(#[from] crate::init::InitError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// 1-D convolution over `input` `[batch, in_channels, in_len]` with `weight`
/// `[out_channels, in_channels/groups, kernel_size]` and optional `bias`
/// `[out_channels]`, writing into `out` `[batch, out_channels, out_len]`.
///
/// Taps whose input position falls outside `[0, in_len)` contribute zero
/// (zero-padding; no padded copy of the input is materialized). Each group's
/// unfolded input block is contracted against its weight block with a single
/// f32 sgemm, so output channel `oc` only ever reads the input-channel block
/// of its group. Accumulation is f32 throughout.
#[allow(clippy::too_many_arguments)]
pub fn conv1d(
    input: &Tensor<f32>,
    weight: &Tensor<f32>,
    bias: Option<&Tensor<f32>>,
    stride: usize,
    padding: usize,
    dilation: usize,
    groups: usize,
    out: &mut Tensor<f32>,
) -> Result<(), ConvError> {
    if input.dim() != 3 {
        return Err(ConvError::InputRank(input.dim()));
    }
    if weight.dim() != 3 {
        return Err(ConvError::WeightRank(weight.dim()));
    }
    for (name, value) in [("stride", stride), ("dilation", dilation), ("groups", groups)] {
        if value == 0 {
            return Err(ConvError::ZeroHyperparam { name });
        }
    }

    let batch_size = input.size(0);
    let in_channels = input.size(1);
    let input_len = input.size(2);
    let out_channels = weight.size(0);
    let kernel_size = weight.size(2);
    if kernel_size == 0 {
        return Err(ConvError::ZeroHyperparam {
            name: "kernel_size",
        });
    }
    if in_channels % groups != 0 || out_channels % groups != 0 {
        return Err(ConvError::BadGroups {
            groups,
            in_channels,
            out_channels,
        });
    }
    let in_channels_per_group = in_channels / groups;
    if weight.size(1) != in_channels_per_group {
        return Err(ConvError::ChannelMismatch {
            expected: weight.size(1) * groups,
            actual: in_channels,
        });
    }
    if let Some(b) = bias {
        if b.dim() != 1 || b.size(0) != out_channels {
            return Err(ConvError::BiasShape {
                expected: out_channels,
                actual: b.numel(),
            });
        }
    }

    let span = dilation * (kernel_size - 1) + 1;
    let padded = input_len + 2 * padding;
    if padded < span {
        return Err(ConvError::EmptyOutput { span, padded });
    }
    let output_len = (padded - span) / stride + 1;

    out.resize(&[batch_size, out_channels, output_len]);

    let out_channels_per_group = out_channels / groups;
    let unfolded_rows = in_channels_per_group * kernel_size;
    let mut unfolded = vec![0.0; unfolded_rows * output_len];
    let in_data = input.as_slice();
    let w_data = weight.as_slice();
    let out_data = out.as_mut_slice();

    for b in 0..batch_size {
        for g in 0..groups {
            unfolded.fill(0.0);
            let in_group_offset = (b * in_channels + g * in_channels_per_group) * input_len;
            for ic in 0..in_channels_per_group {
                let in_row_offset = in_group_offset + ic * input_len;
                let in_row = &in_data[in_row_offset..in_row_offset + input_len];
                for k in 0..kernel_size {
                    let k_offset = k * dilation;
                    let unfolded_row_offset = (ic * kernel_size + k) * output_len;
                    for t_out in 0..output_len {
                        let t_in = (t_out * stride + k_offset) as isize - padding as isize;
                        if t_in >= 0 && (t_in as usize) < input_len {
                            unfolded[unfolded_row_offset + t_out] = in_row[t_in as usize];
                        }
                    }
                }
            }
            let weight_group_offset = g * out_channels_per_group * unfolded_rows;
            let out_group_offset = (b * out_channels + g * out_channels_per_group) * output_len;
            unsafe {
                sgemm(
                    out_channels_per_group,
                    unfolded_rows,
                    output_len,
                    1.0,
                    w_data.as_ptr().add(weight_group_offset),
                    unfolded_rows as isize,
                    1,
                    unfolded.as_ptr(),
                    output_len as isize,
                    1,
                    0.0,
                    out_data.as_mut_ptr().add(out_group_offset),
                    output_len as isize,
                    1,
                );
            }
        }
    }

    if let Some(b_vec) = bias {
        let bias_data = b_vec.as_slice();
        for b in 0..batch_size {
            for oc in 0..out_channels {
                let start = (b * out_channels + oc) * output_len;
                let b_val = bias_data[oc];
                for v in &mut out_data[start..start + output_len] {
                    *v += b_val;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv1d_simple() {
        // [1, 2, 3] * [1, 1] -> [1+2, 2+3]
        let input = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[1, 1, 3]).unwrap();
        let weight = Tensor::from_vec(vec![1.0, 1.0], &[1, 1, 2]).unwrap();
        let mut out = Tensor::default();
        conv1d(&input, &weight, None, 1, 0, 1, 1, &mut out).unwrap();
        assert_eq!(out.shape(), &[1, 1, 2]);
        assert_eq!(out.as_slice(), &[3.0, 5.0]);
    }

    #[test]
    fn test_conv1d_grouped() {
        let input = Tensor::from_vec(vec![1.0; 6], &[1, 2, 3]).unwrap();
        let weight = Tensor::from_vec(vec![1.0; 2], &[2, 1, 1]).unwrap();
        let mut out = Tensor::default();
        conv1d(&input, &weight, None, 1, 0, 1, 2, &mut out).unwrap();
        assert_eq!(out.shape(), &[1, 2, 3]);
        assert_eq!(out.as_slice(), &[1.0; 6]);
    }

    #[test]
    fn test_conv1d_padding() {
        // Zero padding contributes nothing at the edges.
        let input = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[1, 1, 3]).unwrap();
        let weight = Tensor::from_vec(vec![1.0, 1.0, 1.0], &[1, 1, 3]).unwrap();
        let mut out = Tensor::default();
        conv1d(&input, &weight, None, 1, 1, 1, 1, &mut out).unwrap();
        assert_eq!(out.shape(), &[1, 1, 3]);
        assert_eq!(out.as_slice(), &[3.0, 6.0, 5.0]);
    }

    #[test]
    fn test_conv1d_bias() {
        let input = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[1, 1, 3]).unwrap();
        let weight = Tensor::from_vec(vec![1.0, 1.0], &[1, 1, 2]).unwrap();
        let bias = Tensor::from_vec(vec![10.0], &[1]).unwrap();
        let mut out = Tensor::default();
        conv1d(&input, &weight, Some(&bias), 1, 0, 1, 1, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[13.0, 15.0]);
    }

    #[test]
    fn test_conv1d_kernel_too_large() {
        let input = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[1, 1, 3]).unwrap();
        let weight = Tensor::from_vec(vec![1.0; 5], &[1, 1, 5]).unwrap();
        let mut out = Tensor::default();
        let err = conv1d(&input, &weight, None, 1, 0, 1, 1, &mut out);
        assert!(matches!(err, Err(ConvError::EmptyOutput { span: 5, padded: 3 })));
    }

    #[test]
    fn test_conv1d_channel_mismatch() {
        let input = Tensor::from_vec(vec![1.0; 6], &[1, 2, 3]).unwrap();
        let weight = Tensor::from_vec(vec![1.0; 2], &[1, 1, 2]).unwrap();
        let mut out = Tensor::default();
        let err = conv1d(&input, &weight, None, 1, 0, 1, 1, &mut out);
        assert!(matches!(
            err,
            Err(ConvError::ChannelMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }
}
