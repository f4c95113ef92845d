//! Activation backward: `dx = alpha * mode'(x, y, dy) + beta * dx`, with one
//! shared tensor descriptor for all four operands.

use crate::cases::{ones_buffer, record_input_dims, record_output_dims, zeros_buffer, NCHW_LAYOUT};
use crate::device::scoped::ScopedDescriptor;
use crate::device::{ActivationMode, OpCall};
use crate::dtype::ElementKind;
use crate::flops;
use crate::runner::{CaseResult, CaseState, SetupStep};
use crate::shape::TensorShape;

pub(crate) fn run(
    state: &mut CaseState,
    element: ElementKind,
    mode: ActivationMode,
    args: &[i64],
) -> CaseResult<()> {
    let shape = TensorShape::from_args(args)?;
    let exec = element.execution_kind();
    let dims = shape.dims();

    record_input_dims(state, dims);
    record_output_dims(state, dims);
    state.counter("x_tensor_layout", NCHW_LAYOUT);
    state.counter("activation_mode", mode.index() as f64);
    state.counter("predicted_flops_count", flops::activation_backward(mode, &shape));
    state.set_items_per_iteration(shape.element_count() as u64);

    let device = state.device();
    let data = ScopedDescriptor::tensor(device, exec, dims).step("create tensor descriptor")?;
    let activation =
        ScopedDescriptor::activation(device, mode, 1.0).step("create activation descriptor")?;

    let elements = shape.element_count() as usize;
    let y = ones_buffer(device, exec, elements).step("allocate y")?;
    let dy = ones_buffer(device, exec, elements).step("allocate dy")?;
    let x = ones_buffer(device, exec, elements).step("allocate x")?;
    let dx = zeros_buffer(device, exec, elements).step("allocate dx")?;

    state.measure(&OpCall::ActivationBackward {
        activation: activation.id(),
        alpha: 1.0,
        beta: 0.0,
        data: data.id(),
        y: y.id(),
        dy: dy.id(),
        x: x.id(),
        dx: dx.id(),
    })
}
