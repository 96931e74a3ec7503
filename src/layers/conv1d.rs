use crate::init::Initializer;
use crate::kernels::conv1d::{conv1d, ConvError};
use crate::tensor::Tensor;

/// How virtual elements beyond the input boundaries are produced. Only
/// [`PaddingMode::Zeros`] has defined semantics; the other modes are
/// accepted at construction and rejected by `forward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingMode {
    Zeros,
    Reflect,
    Replicate,
}

impl PaddingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaddingMode::Zeros => "zeros",
            PaddingMode::Reflect => "reflect",
            PaddingMode::Replicate => "replicate",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Conv1dConfig {
    pub stride: usize,
    pub padding: usize,
    pub dilation: usize,
    pub groups: usize,
    pub padding_mode: PaddingMode,
    pub bias: bool,
}

impl Default for Conv1dConfig {
    fn default() -> Self {
        Conv1dConfig {
            stride: 1,
            padding: 0,
            dilation: 1,
            groups: 1,
            padding_mode: PaddingMode::Zeros,
            bias: true,
        }
    }
}

/// 1-D convolution layer owning its weight `[out_channels,
/// in_channels/groups, kernel_size]` and optional bias `[out_channels]`.
///
/// Parameters are allocated and initialized once at construction, so
/// `forward` takes `&self` and repeated calls on the same input produce
/// identical outputs.
pub struct Conv1d {
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    config: Conv1dConfig,
    weight: Tensor<f32>,
    bias: Option<Tensor<f32>>,
}

impl Conv1d {
    /// Validates the hyperparameters, then fills the weight through `init`
    /// with a truncated normal (`stddev = sqrt(1/fan_in)`, bounds `[-2, 2]`)
    /// and zeroes the bias.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        config: Conv1dConfig,
        init: &mut dyn Initializer,
    ) -> Result<Self, ConvError> {
        for (name, value) in [
            ("in_channels", in_channels),
            ("out_channels", out_channels),
            ("kernel_size", kernel_size),
            ("stride", config.stride),
            ("dilation", config.dilation),
            ("groups", config.groups),
        ] {
            if value == 0 {
                return Err(ConvError::ZeroHyperparam { name });
            }
        }
        if in_channels % config.groups != 0 || out_channels % config.groups != 0 {
            return Err(ConvError::BadGroups {
                groups: config.groups,
                in_channels,
                out_channels,
            });
        }

        let in_channels_per_group = in_channels / config.groups;
        let mut weight = Tensor::new(&[out_channels, in_channels_per_group, kernel_size]);
        let fan_in = (in_channels_per_group * kernel_size) as f32;
        init.fill_truncated_normal(&mut weight, (1.0 / fan_in).sqrt(), 0.0, -2.0, 2.0)?;
        let bias = config.bias.then(|| Tensor::new(&[out_channels]));

        Ok(Conv1d {
            in_channels,
            out_channels,
            kernel_size,
            config,
            weight,
            bias,
        })
    }

    /// Builds the layer around existing parameter tensors, e.g. pretrained
    /// weights. Channel counts and kernel size are taken from the weight
    /// shape; `config.bias` is ignored in favor of the `bias` argument.
    pub fn from_parts(
        weight: Tensor<f32>,
        bias: Option<Tensor<f32>>,
        config: Conv1dConfig,
    ) -> Result<Self, ConvError> {
        if weight.dim() != 3 {
            return Err(ConvError::WeightRank(weight.dim()));
        }
        for (name, value) in [
            ("stride", config.stride),
            ("dilation", config.dilation),
            ("groups", config.groups),
        ] {
            if value == 0 {
                return Err(ConvError::ZeroHyperparam { name });
            }
        }
        let out_channels = weight.size(0);
        let in_channels = weight.size(1) * config.groups;
        let kernel_size = weight.size(2);
        if out_channels % config.groups != 0 {
            return Err(ConvError::BadGroups {
                groups: config.groups,
                in_channels,
                out_channels,
            });
        }
        if let Some(b) = &bias {
            if b.dim() != 1 || b.size(0) != out_channels {
                return Err(ConvError::BiasShape {
                    expected: out_channels,
                    actual: b.numel(),
                });
            }
        }

        Ok(Conv1d {
            in_channels,
            out_channels,
            kernel_size,
            config,
            weight,
            bias,
        })
    }

    /// Convolves `input` `[batch, in_channels, in_len]` into a freshly
    /// allocated output `[batch, out_channels, out_len]`.
    pub fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>, ConvError> {
        let mut out = Tensor::default();
        self.forward_into(input, &mut out)?;
        Ok(out)
    }

    /// Same as [`Conv1d::forward`] but reuses `out`'s storage across calls.
    pub fn forward_into(
        &self,
        input: &Tensor<f32>,
        out: &mut Tensor<f32>,
    ) -> Result<(), ConvError> {
        if self.config.padding_mode != PaddingMode::Zeros {
            return Err(ConvError::UnsupportedPaddingMode {
                mode: self.config.padding_mode.as_str(),
            });
        }
        conv1d(
            input,
            &self.weight,
            self.bias.as_ref(),
            self.config.stride,
            self.config.padding,
            self.config.dilation,
            self.config.groups,
            out,
        )
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn config(&self) -> &Conv1dConfig {
        &self.config
    }

    pub fn weight(&self) -> &Tensor<f32> {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Tensor<f32>> {
        self.bias.as_ref()
    }
}
