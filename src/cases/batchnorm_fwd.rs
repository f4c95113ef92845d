//! Batch normalization forward, training and inference phases. The
//! per-channel parameter tensor is derived by the library from the data
//! descriptor, never shaped by hand.

use crate::cases::{dims_product, ones_buffer, record_input_dims, record_output_dims, zeros_buffer, NCHW_LAYOUT};
use crate::device::scoped::{ScopedBuffer, ScopedDescriptor};
use crate::device::{BatchNormMode, OpCall};
use crate::dtype::ElementKind;
use crate::flops;
use crate::runner::{CaseResult, CaseState, SetupStep};
use crate::shape::TensorShape;

const EXPONENTIAL_AVERAGE_FACTOR: f64 = 1.0;
const EPSILON: f64 = 1e-5;

pub(crate) fn run(
    state: &mut CaseState,
    element: ElementKind,
    mode: BatchNormMode,
    training: bool,
    args: &[i64],
) -> CaseResult<()> {
    let shape = TensorShape::from_args(args)?;
    let exec = element.execution_kind();
    let dims = shape.dims();

    record_input_dims(state, dims);
    record_output_dims(state, dims);
    state.counter("is_training", training as i64 as f64);
    state.counter("x_tensor_layout", NCHW_LAYOUT);
    state.counter("batchnorm_mode", mode.index() as f64);
    state.counter("predicted_flops_count", flops::batchnorm_forward(mode, &shape));
    state.set_items_per_iteration(shape.element_count() as u64);

    let device = state.device();
    let data = ScopedDescriptor::tensor(device, exec, dims).step("create tensor descriptor")?;
    let (param, param_dims) = ScopedDescriptor::batchnorm_param(device, exec, &data, mode)
        .step("derive parameter descriptor")?;
    let param_elements = dims_product(param_dims) as usize;

    let elements = shape.element_count() as usize;
    let x = ones_buffer(device, exec, elements).step("allocate x")?;
    let y = zeros_buffer(device, exec, elements).step("allocate y")?;
    let scale = ones_buffer(device, exec, param_elements).step("allocate scale")?;
    let bias = zeros_buffer(device, exec, param_elements).step("allocate bias")?;
    // training writes the batch statistics here, inference reads them as the
    // running estimates (mean 0, variance 1 keeps the transform finite)
    let mean = zeros_buffer(device, exec, param_elements).step("allocate mean")?;
    let variance = ones_buffer(device, exec, param_elements).step("allocate variance")?;

    let saved: Option<(ScopedBuffer, ScopedBuffer)> = if training {
        let saved_mean = zeros_buffer(device, exec, param_elements).step("allocate saved mean")?;
        let saved_variance =
            zeros_buffer(device, exec, param_elements).step("allocate saved variance")?;
        Some((saved_mean, saved_variance))
    } else {
        None
    };

    state.measure(&OpCall::BatchNormForward {
        mode,
        training,
        alpha: 1.0,
        beta: 0.0,
        data: data.id(),
        param: param.id(),
        x: x.id(),
        y: y.id(),
        scale: scale.id(),
        bias: bias.id(),
        mean: mean.id(),
        variance: variance.id(),
        saved_mean: saved.as_ref().map(|(m, _)| m.id()),
        saved_variance: saved.as_ref().map(|(_, v)| v.id()),
        average_factor: EXPONENTIAL_AVERAGE_FACTOR,
        epsilon: EPSILON,
    })
}
