//! Convolution backward-bias: reduce the output-gradient tensor over
//! everything but the channel axis into a `[1, K, 1, 1]` bias gradient.

use crate::cases::{ones_buffer, record_input_dims, record_output_dims, zeros_buffer, NCHW_LAYOUT};
use crate::device::scoped::ScopedDescriptor;
use crate::device::OpCall;
use crate::dtype::ElementKind;
use crate::flops::UNMODELED;
use crate::runner::{CaseResult, CaseState, SetupStep};
use crate::shape::ConvShape;

pub(crate) fn run(state: &mut CaseState, element: ElementKind, args: &[i64]) -> CaseResult<()> {
    let shape = ConvShape::from_args(args)?;
    let exec = element.execution_kind();
    // no convolution descriptor is involved, the output extent comes from
    // the closed-form formula
    let output = shape.output_shape();
    let output_dims = output.dims();

    record_input_dims(state, shape.input_shape().dims());
    state.counter("num_filters", shape.num_filters as f64);
    state.counter("filter_height", shape.filter_height as f64);
    state.counter("filter_width", shape.filter_width as f64);
    state.counter("pad_height", shape.pad_height as f64);
    state.counter("pad_width", shape.pad_width as f64);
    state.counter("stride_height", shape.stride_height as f64);
    state.counter("stride_width", shape.stride_width as f64);
    state.counter("dilation_height", shape.dilation_height as f64);
    state.counter("dilation_width", shape.dilation_width as f64);
    record_output_dims(state, output_dims);
    state.counter("x_tensor_layout", NCHW_LAYOUT);
    state.counter("y_tensor_layout", NCHW_LAYOUT);
    state.counter("w_filter_layout", NCHW_LAYOUT);
    state.counter("predicted_flops_count", UNMODELED);
    let items = shape.batch_size * shape.num_filters * shape.channels * shape.height * shape.width;
    state.set_items_per_iteration(items as u64);

    let device = state.device();
    let diff = ScopedDescriptor::tensor(device, exec, output_dims).step("create diff descriptor")?;
    let bias_dims = [1, shape.num_filters as i32, 1, 1];
    let bias = ScopedDescriptor::tensor(device, exec, bias_dims).step("create bias descriptor")?;

    let dy = ones_buffer(device, exec, output.element_count() as usize).step("allocate dy")?;
    let db = zeros_buffer(device, exec, shape.num_filters as usize).step("allocate db")?;

    state.measure(&OpCall::ConvBackwardBias {
        alpha: 1.0,
        beta: 0.0,
        diff: diff.id(),
        dy: dy.id(),
        bias: bias.id(),
        db: db.id(),
    })
}
