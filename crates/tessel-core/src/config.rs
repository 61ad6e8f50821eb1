//! Parameter structs for convolution, pooling and rotary kernels.
//!
//! Kernels take these by reference and trust them. `validate` and the
//! output-size helpers are where bad configurations get rejected. An empty
//! spatial input always sizes to an empty output, never an error.

use crate::error::KernelError;
use crate::Result;

/// Stride/padding/dilation for 1D convolution (forward and transposed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conv1dParams {
    pub stride: usize,
    pub padding: usize,
    pub dilation: usize,
    /// Extra trailing positions on the output of a transposed convolution.
    pub output_padding: usize,
}

impl Default for Conv1dParams {
    fn default() -> Self {
        Self {
            stride: 1,
            padding: 0,
            dilation: 1,
            output_padding: 0,
        }
    }
}

impl Conv1dParams {
    pub fn new(stride: usize, padding: usize, dilation: usize) -> Self {
        Self {
            stride,
            padding,
            dilation,
            output_padding: 0,
        }
    }

    pub fn with_output_padding(mut self, output_padding: usize) -> Self {
        self.output_padding = output_padding;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_common(self.stride, self.dilation)
    }

    /// Output length of a forward convolution:
    /// `(l_in + 2p - d(k-1) - 1) / s + 1`.
    pub fn out_len(&self, l_in: usize, k_size: usize) -> Result<usize> {
        self.validate()?;
        conv_out_len(l_in, k_size, self.stride, self.padding, self.dilation)
    }

    /// Output length of a transposed convolution:
    /// `(l_in - 1)s + d(k-1) + output_padding - 2p + 1`.
    pub fn transposed_out_len(&self, l_in: usize, k_size: usize) -> Result<usize> {
        self.validate()?;
        conv_transpose_out_len(
            l_in,
            k_size,
            self.stride,
            self.padding,
            self.output_padding,
            self.dilation,
        )
    }
}

/// Stride/padding/dilation for 2D convolution, shared by both spatial axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conv2dParams {
    pub stride: usize,
    pub padding: usize,
    pub dilation: usize,
    pub output_padding: usize,
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Self {
            stride: 1,
            padding: 0,
            dilation: 1,
            output_padding: 0,
        }
    }
}

impl Conv2dParams {
    pub fn new(stride: usize, padding: usize, dilation: usize) -> Self {
        Self {
            stride,
            padding,
            dilation,
            output_padding: 0,
        }
    }

    pub fn with_output_padding(mut self, output_padding: usize) -> Self {
        self.output_padding = output_padding;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_common(self.stride, self.dilation)
    }

    pub fn out_hw(&self, h_in: usize, w_in: usize, h_k: usize, w_k: usize) -> Result<(usize, usize)> {
        self.validate()?;
        if h_in == 0 || w_in == 0 {
            return Ok((0, 0));
        }
        Ok((
            conv_out_len(h_in, h_k, self.stride, self.padding, self.dilation)?,
            conv_out_len(w_in, w_k, self.stride, self.padding, self.dilation)?,
        ))
    }

    pub fn transposed_out_hw(
        &self,
        h_in: usize,
        w_in: usize,
        h_k: usize,
        w_k: usize,
    ) -> Result<(usize, usize)> {
        self.validate()?;
        if h_in == 0 || w_in == 0 {
            return Ok((0, 0));
        }
        let out = |l_in, k| {
            conv_transpose_out_len(
                l_in,
                k,
                self.stride,
                self.padding,
                self.output_padding,
                self.dilation,
            )
        };
        Ok((out(h_in, h_k)?, out(w_in, w_k)?))
    }
}

/// Window and step for 2D pooling. No padding: windows start inside the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pool2dParams {
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
}

impl Pool2dParams {
    /// Square window with stride equal to the window size.
    pub fn square(k: usize) -> Self {
        Self {
            kernel_h: k,
            kernel_w: k,
            stride_h: k,
            stride_w: k,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.kernel_h == 0 || self.kernel_w == 0 {
            return Err(KernelError::InvalidConfig("pool window must be non-empty".into()));
        }
        if self.stride_h == 0 || self.stride_w == 0 {
            return Err(KernelError::InvalidConfig("pool stride must be positive".into()));
        }
        Ok(())
    }

    /// `((h - kh) / sh + 1, (w - kw) / sw + 1)`.
    pub fn out_hw(&self, h_in: usize, w_in: usize) -> Result<(usize, usize)> {
        self.validate()?;
        if h_in == 0 || w_in == 0 {
            return Ok((0, 0));
        }
        if self.kernel_h > h_in || self.kernel_w > w_in {
            return Err(KernelError::InvalidConfig(format!(
                "pool window {}x{} larger than input {}x{}",
                self.kernel_h, self.kernel_w, h_in, w_in
            )));
        }
        Ok((
            (h_in - self.kernel_h) / self.stride_h + 1,
            (w_in - self.kernel_w) / self.stride_w + 1,
        ))
    }
}

/// Rotary table parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RopeConfig {
    /// Rotated feature dimension per head (must be even).
    pub dim: usize,
    /// Base frequency (default 10000.0, some models use 1000000.0)
    pub base: f64,
}

impl Default for RopeConfig {
    fn default() -> Self {
        Self {
            dim: 64,
            base: 10_000.0,
        }
    }
}

impl RopeConfig {
    pub fn new(dim: usize, base: f64) -> Self {
        Self { dim, base }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 || self.dim % 2 != 0 {
            return Err(KernelError::InvalidConfig(format!(
                "rotary dim must be even and positive, got {}",
                self.dim
            )));
        }
        if !(self.base > 0.0) {
            return Err(KernelError::InvalidConfig(format!(
                "rotary base must be positive, got {}",
                self.base
            )));
        }
        Ok(())
    }
}

fn validate_common(stride: usize, dilation: usize) -> Result<()> {
    if stride == 0 {
        return Err(KernelError::InvalidConfig("stride must be positive".into()));
    }
    if dilation == 0 {
        return Err(KernelError::InvalidConfig("dilation must be positive".into()));
    }
    Ok(())
}

fn conv_out_len(l_in: usize, k: usize, stride: usize, padding: usize, dilation: usize) -> Result<usize> {
    if l_in == 0 {
        return Ok(0);
    }
    let padded = l_in + 2 * padding;
    let span = dilation * k.saturating_sub(1) + 1;
    if k == 0 || span > padded {
        return Err(KernelError::InvalidConfig(format!(
            "kernel span {span} exceeds padded input length {padded}"
        )));
    }
    Ok((padded - span) / stride + 1)
}

fn conv_transpose_out_len(
    l_in: usize,
    k: usize,
    stride: usize,
    padding: usize,
    output_padding: usize,
    dilation: usize,
) -> Result<usize> {
    if l_in == 0 {
        return Ok(0);
    }
    if k == 0 {
        return Err(KernelError::InvalidConfig("transposed convolution needs a non-empty kernel".into()));
    }
    let full = (l_in - 1) * stride + dilation * (k - 1) + output_padding + 1;
    if 2 * padding >= full {
        return Err(KernelError::InvalidConfig(format!(
            "padding {padding} removes the whole transposed output of length {full}"
        )));
    }
    Ok(full - 2 * padding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv1d_out_len() {
        let p = Conv1dParams::default();
        assert_eq!(p.out_len(5, 3).unwrap(), 3);
        let p = Conv1dParams::new(2, 1, 1);
        assert_eq!(p.out_len(5, 3).unwrap(), 3);
        let p = Conv1dParams::new(1, 0, 2);
        assert_eq!(p.out_len(7, 3).unwrap(), 3);
    }

    #[test]
    fn test_conv1d_rejects_bad_config() {
        assert!(Conv1dParams::new(0, 0, 1).out_len(5, 3).is_err());
        assert!(Conv1dParams::default().out_len(2, 3).is_err());
        assert!(Conv1dParams::new(1, 0, 0).validate().is_err());
    }

    #[test]
    fn test_transposed_out_len() {
        let p = Conv1dParams::new(2, 0, 1);
        assert_eq!(p.transposed_out_len(3, 3).unwrap(), 7);
        let p = Conv1dParams::new(2, 1, 1).with_output_padding(1);
        assert_eq!(p.transposed_out_len(3, 3).unwrap(), 6);
    }

    #[test]
    fn test_conv2d_out_hw() {
        let p = Conv2dParams::new(1, 1, 1);
        assert_eq!(p.out_hw(4, 5, 3, 3).unwrap(), (4, 5));
        let p = Conv2dParams::new(2, 0, 1);
        assert_eq!(p.transposed_out_hw(2, 3, 2, 2).unwrap(), (4, 6));
    }

    #[test]
    fn test_pool_out_hw() {
        let p = Pool2dParams::square(2);
        assert_eq!(p.out_hw(4, 5).unwrap(), (2, 2));
        assert!(p.out_hw(1, 5).is_err());
        assert!(Pool2dParams { stride_h: 0, ..p }.validate().is_err());
    }

    #[test]
    fn test_empty_input_sizes_to_empty_output() {
        assert_eq!(Conv1dParams::default().out_len(0, 3).unwrap(), 0);
        assert_eq!(Conv1dParams::new(2, 1, 3).out_len(0, 5).unwrap(), 0);
        assert_eq!(Conv1dParams::new(2, 0, 1).transposed_out_len(0, 3).unwrap(), 0);
        assert_eq!(Conv2dParams::default().out_hw(0, 4, 3, 3).unwrap(), (0, 0));
        assert_eq!(Conv2dParams::default().out_hw(4, 0, 3, 3).unwrap(), (0, 0));
        assert_eq!(Conv2dParams::new(2, 0, 1).transposed_out_hw(0, 0, 2, 2).unwrap(), (0, 0));
        assert_eq!(Pool2dParams::square(2).out_hw(0, 0).unwrap(), (0, 0));
        assert_eq!(Pool2dParams::square(2).out_hw(0, 5).unwrap(), (0, 0));

        // A bad stride is still rejected, empty or not.
        assert!(Conv1dParams::new(0, 0, 1).out_len(0, 3).is_err());
        assert!(Pool2dParams { stride_w: 0, ..Pool2dParams::square(2) }.out_hw(0, 0).is_err());
    }

    #[test]
    fn test_rope_config() {
        assert!(RopeConfig::default().validate().is_ok());
        assert!(RopeConfig::new(7, 10_000.0).validate().is_err());
        assert!(RopeConfig::new(8, 0.0).validate().is_err());
    }
}
