//! In-place tensor scale, `x = alpha * x`, one multiply per element.

use crate::cases::{ones_buffer, NCHW_LAYOUT};
use crate::device::scoped::ScopedDescriptor;
use crate::device::OpCall;
use crate::dtype::ElementKind;
use crate::flops;
use crate::runner::{CaseResult, CaseState, SetupStep};
use crate::shape::ScaleShape;

pub(crate) fn run(state: &mut CaseState, element: ElementKind, args: &[i64]) -> CaseResult<()> {
    let shape = ScaleShape::from_args(args)?;
    let exec = element.execution_kind();
    let dims = shape.input.dims();

    state.counter("input_size", shape.input.element_count() as f64);
    state.counter("input_n", shape.input.n as f64);
    state.counter("input_c", shape.input.c as f64);
    state.counter("input_h", shape.input.h as f64);
    state.counter("input_w", shape.input.w as f64);
    state.counter("x_tensor_layout", NCHW_LAYOUT);
    state.counter("alpha", shape.alpha as f64);
    state.counter("predicted_flops_count", flops::scale_tensor(&shape.input));
    state.set_items_per_iteration(shape.input.element_count() as u64);

    let device = state.device();
    let data = ScopedDescriptor::tensor(device, exec, dims).step("create tensor descriptor")?;
    let buffer =
        ones_buffer(device, exec, shape.input.element_count() as usize).step("allocate x")?;

    state.measure(&OpCall::ScaleTensor {
        data: data.id(),
        buffer: buffer.id(),
        alpha: shape.alpha,
    })
}
