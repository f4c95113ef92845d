//! Predicted arithmetic-operation counts, derived from problem geometry
//! alone. These feed the `predicted_flops_count` counter and the throughput
//! metrics; they are never compared against measured results.

use crate::device::{ActivationMode, BatchNormMode, ConvBwdDataAlgo};
use crate::shape::{ConvShape, GemmShape, TensorShape};

/// Sentinel reported for algorithm variants without a modeled cost formula.
/// Consumers treat it as "absent", not as a fault.
pub const UNMODELED: f64 = -1.0;

pub fn gemm(shape: &GemmShape) -> f64 {
    2.0 * shape.m as f64 * shape.n as f64 * shape.k as f64
}

pub fn activation_backward(mode: ActivationMode, input: &TensorShape) -> f64 {
    match mode {
        ActivationMode::Identity => 0.0,
        ActivationMode::Sigmoid
        | ActivationMode::Relu
        | ActivationMode::Tanh
        | ActivationMode::ClippedRelu
        | ActivationMode::Elu => input.element_count() as f64,
    }
}

pub fn batchnorm_forward(mode: BatchNormMode, input: &TensorShape) -> f64 {
    match mode {
        BatchNormMode::PerActivation | BatchNormMode::Spatial | BatchNormMode::SpatialPersistent => {
            input.element_count() as f64
        }
    }
}

/// Cost of one convolution backward-data call for the given algorithm.
///
/// Direct algorithms: `2·K·C·R·S·N·P·Q`. FFT algorithms:
/// `N·C·K·H·W + (NC + CK + NK)·H·W·log2(H·W)`. The Winograd variants are
/// unmodeled. Modeled costs are divided by the group count; the sentinel is
/// returned untouched.
pub fn conv_backward_data(algo: ConvBwdDataAlgo, shape: &ConvShape, output: [i32; 4]) -> f64 {
    let n = shape.batch_size as f64;
    let c = shape.channels as f64;
    let k = shape.num_filters as f64;
    let h = shape.height as f64;
    let w = shape.width as f64;
    let r = shape.filter_height as f64;
    let s = shape.filter_width as f64;
    let p = output[2] as f64;
    let q = output[3] as f64;

    let modeled = match algo {
        ConvBwdDataAlgo::Algo0 | ConvBwdDataAlgo::Algo1 => 2.0 * k * c * r * s * n * p * q,
        ConvBwdDataAlgo::Fft | ConvBwdDataAlgo::FftTiling => {
            n * c * k * h * w + (n * c + c * k + n * k) * (h * w) * (h * w).log2()
        }
        ConvBwdDataAlgo::Winograd | ConvBwdDataAlgo::WinogradNonfused => return UNMODELED,
    };
    modeled / shape.group as f64
}

pub fn dropout_forward(input: &TensorShape) -> f64 {
    input.element_count() as f64
}

pub fn pooling_backward(input: &TensorShape) -> f64 {
    input.element_count() as f64
}

pub fn scale_tensor(input: &TensorShape) -> f64 {
    input.element_count() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::GemmShape;

    fn conv_3x3() -> ConvShape {
        ConvShape::from_args(&[2, 16, 8, 8, 32, 3, 3, 1, 1, 1, 1, 1, 1, 0]).unwrap()
    }

    #[test]
    fn gemm_cost() {
        let shape = GemmShape::from_args(&[128, 128, 128, 0, 0, 1, 0]).unwrap();
        assert_eq!(gemm(&shape), 4_194_304.0);
    }

    #[test]
    fn direct_conv_cost() {
        let shape = conv_3x3();
        let output = [2, 32, 8, 8];
        let expected = 2.0 * 32.0 * 16.0 * 3.0 * 3.0 * 2.0 * 8.0 * 8.0;
        assert_eq!(conv_backward_data(ConvBwdDataAlgo::Algo0, &shape, output), expected);
        assert_eq!(conv_backward_data(ConvBwdDataAlgo::Algo1, &shape, output), expected);
    }

    #[test]
    fn grouped_conv_divides_modeled_cost_only() {
        let mut args = vec![2, 16, 8, 8, 32, 3, 3, 1, 1, 1, 1, 1, 1, 4];
        let grouped = ConvShape::from_args(&args).unwrap();
        args[13] = 0;
        let dense = ConvShape::from_args(&args).unwrap();
        let output = [2, 32, 8, 8];

        assert_eq!(
            conv_backward_data(ConvBwdDataAlgo::Algo1, &grouped, output),
            conv_backward_data(ConvBwdDataAlgo::Algo1, &dense, output) / 4.0
        );
        // the sentinel must stay exactly -1, never -1/group
        assert_eq!(conv_backward_data(ConvBwdDataAlgo::Winograd, &grouped, output), UNMODELED);
        assert_eq!(
            conv_backward_data(ConvBwdDataAlgo::WinogradNonfused, &grouped, output),
            UNMODELED
        );
    }

    #[test]
    fn fft_cost_is_deterministic() {
        let shape = conv_3x3();
        let output = [2, 32, 8, 8];
        let first = conv_backward_data(ConvBwdDataAlgo::Fft, &shape, output);
        let second = conv_backward_data(ConvBwdDataAlgo::Fft, &shape, output);
        assert!(first > 0.0);
        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(
            first,
            conv_backward_data(ConvBwdDataAlgo::FftTiling, &shape, output)
        );
    }

    #[test]
    fn identity_activation_is_free() {
        let input = TensorShape { n: 1, c: 3, h: 4, w: 4 };
        assert_eq!(activation_backward(ActivationMode::Identity, &input), 0.0);
        assert_eq!(activation_backward(ActivationMode::Relu, &input), 48.0);
    }
}
