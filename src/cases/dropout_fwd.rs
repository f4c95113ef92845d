//! Dropout forward with a fixed rate and seed. The RNG state buffer is sized
//! by the library and bound into the dropout descriptor; the reserve space is
//! sized per input tensor.

use crate::cases::{ones_buffer, record_input_dims, record_output_dims, zeros_buffer, NCHW_LAYOUT};
use crate::device::scoped::{ScopedBuffer, ScopedDescriptor};
use crate::device::OpCall;
use crate::dtype::ElementKind;
use crate::flops;
use crate::runner::{CaseResult, CaseState, SetupStep};
use crate::shape::TensorShape;

const DROPOUT_RATE: f32 = 0.5;
const DROPOUT_SEED: u64 = 0;

pub(crate) fn run(state: &mut CaseState, element: ElementKind, args: &[i64]) -> CaseResult<()> {
    let shape = TensorShape::from_args(args)?;
    let exec = element.execution_kind();
    let dims = shape.dims();

    record_input_dims(state, dims);
    record_output_dims(state, dims);
    state.counter("x_tensor_layout", NCHW_LAYOUT);
    state.counter("dropout", DROPOUT_RATE as f64);
    state.counter("predicted_flops_count", flops::dropout_forward(&shape));
    state.set_items_per_iteration(shape.element_count() as u64);

    let device = state.device();
    let data = ScopedDescriptor::tensor(device, exec, dims).step("create tensor descriptor")?;

    let states_bytes = device.dropout_states_bytes().step("query states size")?;
    let states = ScopedBuffer::alloc(device, states_bytes).step("allocate states")?;
    let dropout = ScopedDescriptor::dropout(device, DROPOUT_RATE, DROPOUT_SEED, &states)
        .step("create dropout descriptor")?;

    let reserve_bytes = device.dropout_reserve_bytes(data.id()).step("query reserve size")?;
    let reserve = ScopedBuffer::alloc(device, reserve_bytes).step("allocate reserve")?;

    let elements = shape.element_count() as usize;
    let x = ones_buffer(device, exec, elements).step("allocate x")?;
    let y = zeros_buffer(device, exec, elements).step("allocate y")?;

    state.measure(&OpCall::DropoutForward {
        dropout: dropout.id(),
        data: data.id(),
        x: x.id(),
        y: y.id(),
        reserve: reserve.id(),
        reserve_bytes,
    })
}
