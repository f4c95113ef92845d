//! Pooling backward. The output extent comes from the library's pooling
//! shape query; `y`/`dy` live at that extent, `x`/`dx` at the input extent.

use crate::cases::{dims_product, ones_buffer, record_input_dims, record_output_dims, zeros_buffer, NCHW_LAYOUT};
use crate::device::scoped::ScopedDescriptor;
use crate::device::{OpCall, PoolingMode};
use crate::dtype::ElementKind;
use crate::flops;
use crate::runner::{CaseResult, CaseState, SetupStep};
use crate::shape::PoolingShape;

pub(crate) fn run(
    state: &mut CaseState,
    element: ElementKind,
    mode: PoolingMode,
    args: &[i64],
) -> CaseResult<()> {
    let shape = PoolingShape::from_args(args)?;
    let exec = element.execution_kind();
    let input_dims = shape.input.dims();

    let device = state.device();
    let input = ScopedDescriptor::tensor(device, exec, input_dims).step("create x descriptor")?;
    let pooling = ScopedDescriptor::pooling(
        device,
        mode,
        [shape.window_height as i32, shape.window_width as i32],
        [shape.vertical_padding as i32, shape.horizontal_padding as i32],
        [shape.vertical_stride as i32, shape.horizontal_stride as i32],
    )
    .step("create pooling descriptor")?;
    let output_dims = device
        .pooling_output_dims(pooling.id(), input.id())
        .step("infer output dims")?;
    let output = ScopedDescriptor::tensor(device, exec, output_dims).step("create y descriptor")?;

    record_input_dims(state, input_dims);
    record_output_dims(state, output_dims);
    state.counter("window_height", shape.window_height as f64);
    state.counter("window_width", shape.window_width as f64);
    state.counter("vertical_padding", shape.vertical_padding as f64);
    state.counter("horizontal_padding", shape.horizontal_padding as f64);
    state.counter("vertical_stride", shape.vertical_stride as f64);
    state.counter("horizontal_stride", shape.horizontal_stride as f64);
    state.counter("x_tensor_layout", NCHW_LAYOUT);
    state.counter("y_tensor_layout", NCHW_LAYOUT);
    state.counter("pooling_mode", mode.index() as f64);
    state.counter("predicted_flops_count", flops::pooling_backward(&shape.input));
    state.set_items_per_iteration(shape.input.element_count() as u64);

    let input_elements = shape.input.element_count() as usize;
    let output_elements = dims_product(output_dims) as usize;
    let y = ones_buffer(device, exec, output_elements).step("allocate y")?;
    let dy = ones_buffer(device, exec, output_elements).step("allocate dy")?;
    let x = ones_buffer(device, exec, input_elements).step("allocate x")?;
    let dx = zeros_buffer(device, exec, input_elements).step("allocate dx")?;

    state.measure(&OpCall::PoolingBackward {
        pooling: pooling.id(),
        alpha: 1.0,
        beta: 0.0,
        output: output.id(),
        y: y.id(),
        dy: dy.id(),
        input: input.id(),
        x: x.id(),
        dx: dx.id(),
    })
}
