//! An in-memory stand-in for the vendor library.
//!
//! [TrackingDevice] performs no computation; it hands out ids, keeps books on
//! every allocation, descriptor and launch, and answers the shape-inference
//! queries with the documented formulas. The test suite uses it to verify
//! resource accounting and metric derivation, and `layerbench --dry-run`
//! uses it to exercise a suite without a GPU.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::device::{
    ActivationMode, BatchNormMode, BufferId, ConvBwdDataAlgo, ConvBwdDataPerf, ConvSettings, DescriptorId, Device,
    DeviceError, DeviceResult, OpCall, PoolingMode,
};
use crate::dtype::ElementKind;
use crate::shape::{conv_output_size, pooling_output_size};

const SAMPLE_MS: f32 = 1.5;
const DROPOUT_STATES_BYTES: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum DescriptorData {
    Tensor { kind: ElementKind, dims: [i32; 4] },
    Filter { kind: ElementKind, dims: [i32; 4] },
    Conv { settings: ConvSettings },
    Activation { mode: ActivationMode, coef: f64 },
    Pooling { window: [i32; 2], padding: [i32; 2], stride: [i32; 2] },
    Dropout { rate: f32, seed: u64 },
}

#[derive(Debug, Default)]
struct Books {
    next_id: u64,
    live_buffers: HashMap<u64, usize>,
    live_descriptors: HashMap<u64, DescriptorData>,
    allocs: usize,
    frees: usize,
    stray_frees: usize,
    descriptor_creates: usize,
    descriptor_destroys: usize,
    stray_destroys: usize,
    uploads: usize,
    launches: Vec<OpCall>,
    sample_open: bool,
}

/// Allocation-tracking double of the [Device] trait.
#[derive(Debug, Default)]
pub struct TrackingDevice {
    books: RefCell<Books>,
    /// Fail the nth allocation (0-based) when set.
    pub fail_alloc_at: Cell<Option<usize>>,
    /// Fail the nth launch (0-based) when set.
    pub fail_launch_at: Cell<Option<usize>>,
    /// Panic on every launch when set, to exercise the case boundary.
    pub panic_on_launch: Cell<bool>,
    /// Make the workspace-size query fail when set.
    pub fail_workspace_query: Cell<bool>,
    /// Make the advised-algorithm query fail when set.
    pub fail_advise_query: Cell<bool>,
    /// The algorithm the heuristic recommends.
    pub advised_algo: Cell<Option<ConvBwdDataAlgo>>,
}

impl TrackingDevice {
    pub fn new() -> Self {
        let device = TrackingDevice::default();
        device.advised_algo.set(Some(ConvBwdDataAlgo::Algo1));
        device
    }

    pub fn live_buffers(&self) -> usize {
        self.books.borrow().live_buffers.len()
    }

    pub fn live_descriptors(&self) -> usize {
        self.books.borrow().live_descriptors.len()
    }

    pub fn allocs(&self) -> usize {
        self.books.borrow().allocs
    }

    pub fn uploads(&self) -> usize {
        self.books.borrow().uploads
    }

    pub fn launches(&self) -> Vec<OpCall> {
        self.books.borrow().launches.clone()
    }

    /// True when every acquisition was released exactly once: nothing is
    /// still live, and no release ever targeted an unknown id.
    pub fn balanced(&self) -> bool {
        let books = self.books.borrow();
        books.live_buffers.is_empty()
            && books.live_descriptors.is_empty()
            && books.stray_frees == 0
            && books.stray_destroys == 0
            && books.allocs == books.frees
            && books.descriptor_creates == books.descriptor_destroys
    }

    fn create(&self, data: DescriptorData) -> DescriptorId {
        let mut books = self.books.borrow_mut();
        let id = books.next_id;
        books.next_id += 1;
        books.live_descriptors.insert(id, data);
        books.descriptor_creates += 1;
        DescriptorId(id)
    }

    fn descriptor(&self, id: DescriptorId, call: &'static str) -> DeviceResult<DescriptorData> {
        self.books
            .borrow()
            .live_descriptors
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DeviceError::new(call, format!("unknown descriptor {:?}", id)))
    }

    fn tensor_dims(&self, id: DescriptorId, call: &'static str) -> DeviceResult<[i32; 4]> {
        match self.descriptor(id, call)? {
            DescriptorData::Tensor { dims, .. } => Ok(dims),
            other => Err(DeviceError::new(call, format!("expected tensor descriptor, got {:?}", other))),
        }
    }

    fn check_call_ids(&self, call: &OpCall) -> DeviceResult<()> {
        let books = self.books.borrow();
        for buffer in call_buffers(call) {
            if !books.live_buffers.contains_key(&buffer.0) {
                return Err(DeviceError::new("launch", format!("unknown buffer {:?}", buffer)));
            }
        }
        for descriptor in call_descriptors(call) {
            if !books.live_descriptors.contains_key(&descriptor.0) {
                return Err(DeviceError::new(
                    "launch",
                    format!("unknown descriptor {:?}", descriptor),
                ));
            }
        }
        Ok(())
    }
}

fn call_buffers(call: &OpCall) -> Vec<BufferId> {
    match *call {
        OpCall::Gemm { a, b, c, .. } => vec![a, b, c],
        OpCall::ActivationBackward { y, dy, x, dx, .. } => vec![y, dy, x, dx],
        OpCall::BatchNormForward {
            x,
            y,
            scale,
            bias,
            mean,
            variance,
            saved_mean,
            saved_variance,
            ..
        } => {
            let mut buffers = vec![x, y, scale, bias, mean, variance];
            buffers.extend(saved_mean);
            buffers.extend(saved_variance);
            buffers
        }
        OpCall::ConvBackwardBias { dy, db, .. } => vec![dy, db],
        OpCall::ConvBackwardData { w, dy, dx, workspace, .. } => vec![w, dy, dx, workspace],
        OpCall::DropoutForward { x, y, reserve, .. } => vec![x, y, reserve],
        OpCall::PoolingBackward { y, dy, x, dx, .. } => vec![y, dy, x, dx],
        OpCall::ScaleTensor { buffer, .. } => vec![buffer],
    }
}

fn call_descriptors(call: &OpCall) -> Vec<DescriptorId> {
    match *call {
        OpCall::Gemm { .. } => vec![],
        OpCall::ActivationBackward { activation, data, .. } => vec![activation, data],
        OpCall::BatchNormForward { data, param, .. } => vec![data, param],
        OpCall::ConvBackwardBias { diff, bias, .. } => vec![diff, bias],
        OpCall::ConvBackwardData { conv, filter, diff, grad, .. } => vec![conv, filter, diff, grad],
        OpCall::DropoutForward { dropout, data, .. } => vec![dropout, data],
        OpCall::PoolingBackward { pooling, output, input, .. } => vec![pooling, output, input],
        OpCall::ScaleTensor { data, .. } => vec![data],
    }
}

impl Device for TrackingDevice {
    fn name(&self) -> String {
        "tracking device".to_owned()
    }

    fn alloc(&self, len_bytes: usize) -> DeviceResult<BufferId> {
        let mut books = self.books.borrow_mut();
        if self.fail_alloc_at.get() == Some(books.allocs) {
            return Err(DeviceError::new("alloc", "injected allocation failure"));
        }
        let id = books.next_id;
        books.next_id += 1;
        books.live_buffers.insert(id, len_bytes);
        books.allocs += 1;
        Ok(BufferId(id))
    }

    fn free(&self, buffer: BufferId) {
        let mut books = self.books.borrow_mut();
        if books.live_buffers.remove(&buffer.0).is_some() {
            books.frees += 1;
        } else {
            books.stray_frees += 1;
        }
    }

    fn upload(&self, buffer: BufferId, data: &[u8]) -> DeviceResult<()> {
        let mut books = self.books.borrow_mut();
        match books.live_buffers.get(&buffer.0) {
            Some(&len) if len >= data.len() => {
                books.uploads += 1;
                Ok(())
            }
            Some(&len) => Err(DeviceError::new(
                "upload",
                format!("{} bytes into {}-byte buffer", data.len(), len),
            )),
            None => Err(DeviceError::new("upload", format!("unknown buffer {:?}", buffer))),
        }
    }

    fn create_tensor(&self, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<DescriptorId> {
        Ok(self.create(DescriptorData::Tensor { kind, dims }))
    }

    fn create_filter(&self, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<DescriptorId> {
        Ok(self.create(DescriptorData::Filter { kind, dims }))
    }

    fn create_conv(&self, _kind: ElementKind, settings: &ConvSettings) -> DeviceResult<DescriptorId> {
        Ok(self.create(DescriptorData::Conv { settings: *settings }))
    }

    fn create_activation(&self, mode: ActivationMode, coef: f64) -> DeviceResult<DescriptorId> {
        Ok(self.create(DescriptorData::Activation { mode, coef }))
    }

    fn create_pooling(
        &self,
        _mode: PoolingMode,
        window: [i32; 2],
        padding: [i32; 2],
        stride: [i32; 2],
    ) -> DeviceResult<DescriptorId> {
        Ok(self.create(DescriptorData::Pooling { window, padding, stride }))
    }

    fn create_dropout(
        &self,
        rate: f32,
        seed: u64,
        states: BufferId,
        states_bytes: usize,
    ) -> DeviceResult<DescriptorId> {
        let books = self.books.borrow();
        match books.live_buffers.get(&states.0) {
            Some(&len) if len >= states_bytes => {}
            _ => return Err(DeviceError::new("create_dropout", "bad states buffer")),
        }
        drop(books);
        Ok(self.create(DescriptorData::Dropout { rate, seed }))
    }

    fn destroy(&self, descriptor: DescriptorId) {
        let mut books = self.books.borrow_mut();
        if books.live_descriptors.remove(&descriptor.0).is_some() {
            books.descriptor_destroys += 1;
        } else {
            books.stray_destroys += 1;
        }
    }

    fn conv_output_dims(
        &self,
        conv: DescriptorId,
        input: DescriptorId,
        filter: DescriptorId,
    ) -> DeviceResult<[i32; 4]> {
        let call = "conv_output_dims";
        let settings = match self.descriptor(conv, call)? {
            DescriptorData::Conv { settings } => settings,
            other => return Err(DeviceError::new(call, format!("expected conv descriptor, got {:?}", other))),
        };
        let [n, c, h, w] = self.tensor_dims(input, call)?;
        let [k, fc, fh, fw] = match self.descriptor(filter, call)? {
            DescriptorData::Filter { dims, .. } => dims,
            other => return Err(DeviceError::new(call, format!("expected filter descriptor, got {:?}", other))),
        };
        // grouped filters may carry either the full or the per-group channel count
        if c != fc && c != fc * settings.group_count {
            return Err(DeviceError::new(
                call,
                format!("input channels {} do not match filter channels {}", c, fc),
            ));
        }
        let out_h = conv_output_size(
            h as i64,
            fh as i64,
            settings.pad_height as i64,
            settings.stride_height as i64,
            settings.dilation_height as i64,
        );
        let out_w = conv_output_size(
            w as i64,
            fw as i64,
            settings.pad_width as i64,
            settings.stride_width as i64,
            settings.dilation_width as i64,
        );
        Ok([n, k, out_h as i32, out_w as i32])
    }

    fn pooling_output_dims(&self, pooling: DescriptorId, input: DescriptorId) -> DeviceResult<[i32; 4]> {
        let call = "pooling_output_dims";
        let (window, padding, stride) = match self.descriptor(pooling, call)? {
            DescriptorData::Pooling { window, padding, stride } => (window, padding, stride),
            other => {
                return Err(DeviceError::new(call, format!("expected pooling descriptor, got {:?}", other)))
            }
        };
        let [n, c, h, w] = self.tensor_dims(input, call)?;
        let out_h = pooling_output_size(h as i64, window[0] as i64, padding[0] as i64, stride[0] as i64);
        let out_w = pooling_output_size(w as i64, window[1] as i64, padding[1] as i64, stride[1] as i64);
        Ok([n, c, out_h as i32, out_w as i32])
    }

    fn batchnorm_param_dims(&self, input: DescriptorId, mode: BatchNormMode) -> DeviceResult<[i32; 4]> {
        let [_, c, h, w] = self.tensor_dims(input, "batchnorm_param_dims")?;
        match mode {
            BatchNormMode::PerActivation => Ok([1, c, h, w]),
            BatchNormMode::Spatial | BatchNormMode::SpatialPersistent => Ok([1, c, 1, 1]),
        }
    }

    fn dropout_states_bytes(&self) -> DeviceResult<usize> {
        Ok(DROPOUT_STATES_BYTES)
    }

    fn dropout_reserve_bytes(&self, input: DescriptorId) -> DeviceResult<usize> {
        let [n, c, h, w] = self.tensor_dims(input, "dropout_reserve_bytes")?;
        // one mask bit per element, rounded up
        Ok(((n * c * h * w) as usize + 7) / 8)
    }

    fn conv_bwd_data_workspace_bytes(
        &self,
        _algo: ConvBwdDataAlgo,
        _conv: DescriptorId,
        _filter: DescriptorId,
        _diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<usize> {
        if self.fail_workspace_query.get() {
            return Err(DeviceError::new(
                "conv_bwd_data_workspace_bytes",
                "injected query failure",
            ));
        }
        let [n, c, h, w] = self.tensor_dims(grad, "conv_bwd_data_workspace_bytes")?;
        Ok((n * c * h * w) as usize)
    }

    fn advise_conv_bwd_data_algo(
        &self,
        _conv: DescriptorId,
        _filter: DescriptorId,
        _diff: DescriptorId,
        _grad: DescriptorId,
    ) -> DeviceResult<Option<ConvBwdDataAlgo>> {
        if self.fail_advise_query.get() {
            return Err(DeviceError::new("advise_conv_bwd_data_algo", "injected query failure"));
        }
        Ok(self.advised_algo.get())
    }

    fn find_conv_bwd_data_algos(
        &self,
        _conv: DescriptorId,
        _filter: DescriptorId,
        _diff: DescriptorId,
        _grad: DescriptorId,
    ) -> DeviceResult<Vec<ConvBwdDataPerf>> {
        Ok(ConvBwdDataAlgo::ALL
            .into_iter()
            .map(|algo| ConvBwdDataPerf {
                algo,
                time_ms: SAMPLE_MS,
                memory_bytes: 1024,
                deterministic: algo != ConvBwdDataAlgo::Algo0,
            })
            .collect())
    }

    fn launch(&self, call: &OpCall) -> DeviceResult<()> {
        if self.panic_on_launch.get() {
            panic!("injected panic in {}", call.name());
        }
        self.check_call_ids(call)?;
        let mut books = self.books.borrow_mut();
        if self.fail_launch_at.get() == Some(books.launches.len()) {
            return Err(DeviceError::new("launch", "injected launch failure"));
        }
        books.launches.push(call.clone());
        Ok(())
    }

    fn synchronize(&self) -> DeviceResult<()> {
        Ok(())
    }

    fn begin_sample(&self) -> DeviceResult<()> {
        let mut books = self.books.borrow_mut();
        if books.sample_open {
            return Err(DeviceError::new("begin_sample", "sample already open"));
        }
        books.sample_open = true;
        Ok(())
    }

    fn end_sample(&self) -> DeviceResult<f32> {
        let mut books = self.books.borrow_mut();
        if !books.sample_open {
            return Err(DeviceError::new("end_sample", "no open sample"));
        }
        books.sample_open = false;
        Ok(SAMPLE_MS)
    }
}
