use std::error::Error;
use std::fmt::{Display, Formatter};

/// Output spatial extent of a convolution,
/// `floor((in + 2*pad - dilation*(filter - 1) - 1) / stride) + 1`.
///
/// Where the vendor library exposes its own shape inference the case asks the
/// library instead; this formula is the documented contract those queries
/// must agree with.
pub fn conv_output_size(input: i64, filter: i64, pad: i64, stride: i64, dilation: i64) -> i64 {
    (input + 2 * pad - dilation * (filter - 1) - 1) / stride + 1
}

/// Output spatial extent of a pooling window,
/// `floor((in + 2*pad - window) / stride) + 1`.
pub fn pooling_output_size(input: i64, window: i64, pad: i64, stride: i64) -> i64 {
    (input + 2 * pad - window) / stride + 1
}

pub type ArgResult<T> = Result<T, ArgError>;

/// The harness hands every case an ordered list of integer range parameters;
/// interpretation is operation-specific.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ArgError {
    Missing { index: usize, name: &'static str },
}

impl Display for ArgError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgError::Missing { index, name } => {
                write!(f, "missing range argument {} ({})", index, name)
            }
        }
    }
}

impl Error for ArgError {}

fn arg(args: &[i64], index: usize, name: &'static str) -> ArgResult<i64> {
    args.get(index).copied().ok_or(ArgError::Missing { index, name })
}

/// A plain 4d tensor extent. A height or width of `-1` means "absent" and is
/// treated as 1.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TensorShape {
    pub n: i64,
    pub c: i64,
    pub h: i64,
    pub w: i64,
}

impl TensorShape {
    pub fn from_args(args: &[i64]) -> ArgResult<Self> {
        let missing_to_one = |v: i64| if v == -1 { 1 } else { v };
        Ok(TensorShape {
            n: arg(args, 0, "batch_size")?,
            c: arg(args, 1, "channels")?,
            h: missing_to_one(arg(args, 2, "height")?),
            w: missing_to_one(arg(args, 3, "width")?),
        })
    }

    pub fn element_count(&self) -> i64 {
        self.n * self.c * self.h * self.w
    }

    pub fn dims(&self) -> [i32; 4] {
        [self.n as i32, self.c as i32, self.h as i32, self.w as i32]
    }
}

/// The convolution problem tuple shared by the conv backward cases.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConvShape {
    pub batch_size: i64,
    pub channels: i64,
    pub height: i64,
    pub width: i64,
    pub num_filters: i64,
    pub filter_width: i64,
    pub filter_height: i64,
    pub pad_width: i64,
    pub pad_height: i64,
    pub stride_width: i64,
    pub stride_height: i64,
    pub dilation_height: i64,
    pub dilation_width: i64,
    pub group: i64,
}

impl ConvShape {
    pub fn from_args(args: &[i64]) -> ArgResult<Self> {
        Ok(ConvShape {
            batch_size: arg(args, 0, "batch_size")?,
            channels: arg(args, 1, "channels")?,
            height: arg(args, 2, "height")?,
            width: arg(args, 3, "width")?,
            num_filters: arg(args, 4, "num_filters")?,
            filter_width: arg(args, 5, "filter_width")?,
            filter_height: arg(args, 6, "filter_height")?,
            pad_width: arg(args, 7, "pad_width")?,
            pad_height: arg(args, 8, "pad_height")?,
            stride_width: arg(args, 9, "stride_width")?,
            stride_height: arg(args, 10, "stride_height")?,
            dilation_height: arg(args, 11, "dilation_height")?,
            dilation_width: arg(args, 12, "dilation_width")?,
            // a group argument of 0 (or an absent one) means ungrouped
            group: match args.get(13).copied() {
                None | Some(0) => 1,
                Some(group) => group,
            },
        })
    }

    pub fn input_shape(&self) -> TensorShape {
        TensorShape {
            n: self.batch_size,
            c: self.channels,
            h: self.height,
            w: self.width,
        }
    }

    /// Output extent by the closed-form formula. The cases prefer the
    /// library's own inference; this is used where no query exists and as a
    /// cross-check.
    pub fn output_shape(&self) -> TensorShape {
        TensorShape {
            n: self.batch_size,
            c: self.num_filters,
            h: conv_output_size(
                self.height,
                self.filter_height,
                self.pad_height,
                self.stride_height,
                self.dilation_height,
            ),
            w: conv_output_size(
                self.width,
                self.filter_width,
                self.pad_width,
                self.stride_width,
                self.dilation_width,
            ),
        }
    }

    pub fn filter_dims(&self) -> [i32; 4] {
        [
            self.num_filters as i32,
            self.channels as i32,
            self.filter_height as i32,
            self.filter_width as i32,
        ]
    }
}

/// GEMM problem tuple: `m, n, k, trans_a, trans_b, alpha, beta`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GemmShape {
    pub m: i64,
    pub n: i64,
    pub k: i64,
    pub trans_a: bool,
    pub trans_b: bool,
    pub alpha: f32,
    pub beta: f32,
}

impl GemmShape {
    pub fn from_args(args: &[i64]) -> ArgResult<Self> {
        Ok(GemmShape {
            m: arg(args, 0, "m")?,
            n: arg(args, 1, "n")?,
            k: arg(args, 2, "k")?,
            trans_a: arg(args, 3, "trans_a")? != 0,
            trans_b: arg(args, 4, "trans_b")? != 0,
            alpha: arg(args, 5, "alpha")? as f32,
            beta: arg(args, 6, "beta")? as f32,
        })
    }

    pub fn lda(&self) -> i64 {
        if self.trans_a {
            self.k
        } else {
            self.m
        }
    }

    pub fn ldb(&self) -> i64 {
        if self.trans_b {
            self.n
        } else {
            self.k
        }
    }
}

/// Pooling problem tuple: tensor extent plus window, padding and stride.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PoolingShape {
    pub input: TensorShape,
    pub window_height: i64,
    pub window_width: i64,
    pub vertical_padding: i64,
    pub horizontal_padding: i64,
    pub vertical_stride: i64,
    pub horizontal_stride: i64,
}

impl PoolingShape {
    pub fn from_args(args: &[i64]) -> ArgResult<Self> {
        Ok(PoolingShape {
            input: TensorShape {
                n: arg(args, 0, "batch_size")?,
                c: arg(args, 1, "channels")?,
                h: arg(args, 2, "height")?,
                w: arg(args, 3, "width")?,
            },
            window_height: arg(args, 4, "window_height")?,
            window_width: arg(args, 5, "window_width")?,
            vertical_padding: arg(args, 6, "vertical_padding")?,
            horizontal_padding: arg(args, 7, "horizontal_padding")?,
            vertical_stride: arg(args, 8, "vertical_stride")?,
            horizontal_stride: arg(args, 9, "horizontal_stride")?,
        })
    }
}

/// Scale-tensor problem tuple: tensor extent plus the scale coefficient.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScaleShape {
    pub input: TensorShape,
    pub alpha: f32,
}

impl ScaleShape {
    pub fn from_args(args: &[i64]) -> ArgResult<Self> {
        Ok(ScaleShape {
            input: TensorShape {
                n: arg(args, 0, "batch_size")?,
                c: arg(args, 1, "channels")?,
                h: arg(args, 2, "height")?,
                w: arg(args, 3, "width")?,
            },
            alpha: arg(args, 4, "alpha")? as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conv_output_formula() {
        // 8 wide, 3x3 filter, pad 1, stride 1, dense
        assert_eq!(conv_output_size(8, 3, 1, 1, 1), 8);
        // stride 2 halves, floor division
        assert_eq!(conv_output_size(7, 3, 0, 2, 1), 3);
        // dilation widens the effective filter
        assert_eq!(conv_output_size(9, 3, 0, 1, 2), 5);
    }

    #[test]
    fn pooling_output_formula() {
        assert_eq!(pooling_output_size(8, 2, 0, 2), 4);
        assert_eq!(pooling_output_size(7, 3, 1, 2), 4);
    }

    #[test]
    fn tensor_args_map_absent_extent_to_one() {
        let shape = TensorShape::from_args(&[2, 16, -1, -1]).unwrap();
        assert_eq!(shape, TensorShape { n: 2, c: 16, h: 1, w: 1 });
        assert_eq!(shape.element_count(), 32);
    }

    #[test]
    fn conv_args_map_zero_group_to_one() {
        let mut args = vec![1, 3, 8, 8, 4, 3, 3, 1, 1, 1, 1, 1, 1, 0];
        assert_eq!(ConvShape::from_args(&args).unwrap().group, 1);
        args[13] = 4;
        assert_eq!(ConvShape::from_args(&args).unwrap().group, 4);
        args.truncate(13);
        assert_eq!(ConvShape::from_args(&args).unwrap().group, 1);
    }

    #[test]
    fn missing_arg_is_reported_by_position() {
        assert_eq!(
            GemmShape::from_args(&[128, 128]),
            Err(ArgError::Missing { index: 2, name: "k" })
        );
    }

    #[test]
    fn gemm_leading_dimensions() {
        let shape = GemmShape::from_args(&[128, 64, 32, 0, 0, 1, 0]).unwrap();
        assert_eq!((shape.lda(), shape.ldb()), (128, 32));
        let shape = GemmShape::from_args(&[128, 64, 32, 1, 1, 1, 0]).unwrap();
        assert_eq!((shape.lda(), shape.ldb()), (32, 64));
    }
}
