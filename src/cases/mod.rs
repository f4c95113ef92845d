//! The benchmark cases, one module per vendor operation.
//!
//! Every case follows the same arc: parse the range arguments into a problem
//! shape, acquire descriptors and buffers through scoped wrappers, record the
//! shape and prediction counters, then hand exactly one [OpCall] to
//! [CaseState::measure]. Cases never touch the vendor API directly.

use crate::device::{
    ActivationMode, BatchNormMode, ConvBwdDataAlgo, Device, DeviceResult, PoolingMode,
};
use crate::device::scoped::ScopedBuffer;
use crate::dtype::ElementKind;
use crate::runner::{self, BenchContext, CaseReport, CaseState, RunOptions};

pub mod activation_bwd;
pub mod batchnorm_fwd;
pub mod conv_bwd_bias;
pub mod conv_bwd_data;
pub mod dropout_fwd;
pub mod gemm;
pub mod pooling_bwd;
pub mod scale_tensor;

/// All tensors are laid out NCHW, reported as the vendor layout tag.
const NCHW_LAYOUT: f64 = 0.0;

/// The operation a case instantiates, with its algorithm or mode variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OpKind {
    Gemm,
    ActivationBackward(ActivationMode),
    BatchNormForward { mode: BatchNormMode, training: bool },
    ConvBackwardBias,
    ConvBackwardData(ConvBwdDataAlgo),
    DropoutForward,
    PoolingBackward(PoolingMode),
    ScaleTensor,
}

/// One case: operation variant, element kind and the ordered range arguments
/// whose interpretation is operation-specific.
#[derive(Debug, Clone)]
pub struct CaseConfig {
    pub op: OpKind,
    pub element: ElementKind,
    pub args: Vec<i64>,
}

impl CaseConfig {
    /// Stable case name, `library/operation[/variant]/element`.
    pub fn name(&self) -> String {
        match self.op {
            OpKind::Gemm => format!("cublas/gemm/{}", self.element),
            OpKind::ActivationBackward(mode) => {
                format!("cudnn/activation_bwd/{}/{}", mode.name(), self.element)
            }
            OpKind::BatchNormForward { mode, training } => {
                let phase = if training { "train" } else { "infer" };
                format!("cudnn/batchnorm_fwd/{}/{}/{}", mode.name(), phase, self.element)
            }
            OpKind::ConvBackwardBias => format!("cudnn/conv_bwd_bias/{}", self.element),
            OpKind::ConvBackwardData(algo) => {
                format!("cudnn/conv_bwd_data/{}/{}", algo.name(), self.element)
            }
            OpKind::DropoutForward => format!("cudnn/dropout_fwd/{}", self.element),
            OpKind::PoolingBackward(mode) => {
                format!("cudnn/pooling_bwd/{}/{}", mode.name(), self.element)
            }
            OpKind::ScaleTensor => format!("cudnn/scale_tensor/{}", self.element),
        }
    }

    /// Run this case inside the [runner::run_case] boundary.
    pub fn run(&self, ctx: &BenchContext, options: RunOptions) -> CaseReport {
        runner::run_case(ctx, &self.name(), options, |state| match self.op {
            OpKind::Gemm => gemm::run(state, self.element, &self.args),
            OpKind::ActivationBackward(mode) => {
                activation_bwd::run(state, self.element, mode, &self.args)
            }
            OpKind::BatchNormForward { mode, training } => {
                batchnorm_fwd::run(state, self.element, mode, training, &self.args)
            }
            OpKind::ConvBackwardBias => conv_bwd_bias::run(state, self.element, &self.args),
            OpKind::ConvBackwardData(algo) => {
                conv_bwd_data::run(state, self.element, algo, &self.args)
            }
            OpKind::DropoutForward => dropout_fwd::run(state, self.element, &self.args),
            OpKind::PoolingBackward(mode) => {
                pooling_bwd::run(state, self.element, mode, &self.args)
            }
            OpKind::ScaleTensor => scale_tensor::run(state, self.element, &self.args),
        })
    }
}

fn dims_product(dims: [i32; 4]) -> i64 {
    dims.iter().map(|&d| d as i64).product()
}

fn ones_buffer<'a>(
    device: &'a dyn Device,
    kind: ElementKind,
    elements: usize,
) -> DeviceResult<ScopedBuffer<'a>> {
    ScopedBuffer::from_host(device, &kind.fill_ones(elements))
}

fn zeros_buffer<'a>(
    device: &'a dyn Device,
    kind: ElementKind,
    elements: usize,
) -> DeviceResult<ScopedBuffer<'a>> {
    ScopedBuffer::from_host(device, &kind.fill_zeros(elements))
}

/// The `input_size`/`input_*` counter block shared by the tensor-shaped
/// cases.
fn record_input_dims(state: &mut CaseState, dims: [i32; 4]) {
    state.counter("input_size", dims_product(dims) as f64);
    state.counter("input_batch_size", dims[0] as f64);
    state.counter("input_channels", dims[1] as f64);
    state.counter("input_height", dims[2] as f64);
    state.counter("input_width", dims[3] as f64);
}

/// The matching `output_size`/`output_*` block.
fn record_output_dims(state: &mut CaseState, dims: [i32; 4]) {
    state.counter("output_size", dims_product(dims) as f64);
    state.counter("output_batch_size", dims[0] as f64);
    state.counter("output_channels", dims[1] as f64);
    state.counter("output_height", dims[2] as f64);
    state.counter("output_width", dims[3] as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_names() {
        let gemm = CaseConfig {
            op: OpKind::Gemm,
            element: ElementKind::F16,
            args: vec![],
        };
        assert_eq!(gemm.name(), "cublas/gemm/f16");

        let conv = CaseConfig {
            op: OpKind::ConvBackwardData(ConvBwdDataAlgo::FftTiling),
            element: ElementKind::F32,
            args: vec![],
        };
        assert_eq!(conv.name(), "cudnn/conv_bwd_data/fft_tiling/f32");

        let bn = CaseConfig {
            op: OpKind::BatchNormForward {
                mode: BatchNormMode::Spatial,
                training: false,
            },
            element: ElementKind::F64,
            args: vec![],
        };
        assert_eq!(bn.name(), "cudnn/batchnorm_fwd/spatial/infer/f64");
    }
}
