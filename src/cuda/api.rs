//! The real [Device] backend: id-keyed maps from the vendor-neutral handles
//! to live cuDNN/cuBLAS objects, plus the launch dispatch.

use std::cell::RefCell;
use std::collections::HashMap;
use std::os::raw::{c_int, c_void};
use std::ptr::null_mut;

use crate::cuda::bindings::*;
use crate::cuda::descriptor::{
    bwd_data_algo, ActivationDescriptor, ConvolutionDescriptor, DropoutDescriptor, FilterDescriptor,
    PoolingDescriptor, TensorDescriptor,
};
use crate::cuda::event::CudaEvent;
use crate::cuda::handle::{bind_device, CublasHandle, CudnnHandle};
use crate::cuda::mem::DeviceMemory;
use crate::cuda::status::{check_cublas, check_cudnn};
use crate::device::{
    ActivationMode, BatchNormMode, BufferId, ConvBwdDataAlgo, ConvBwdDataPerf, ConvSettings, DescriptorId,
    Device, DeviceError, DeviceResult, MathMode, OpCall, PoolingMode,
};
use crate::dtype::ElementKind;

const FIND_ALGO_MAX: usize = 10;
const CUDNN_DETERMINISTIC: cudnnDeterminism_t = 1;

#[derive(Debug)]
enum AnyDescriptor {
    Tensor { desc: TensorDescriptor, kind: ElementKind },
    Filter(FilterDescriptor),
    Conv(ConvolutionDescriptor),
    Activation(ActivationDescriptor),
    Pooling(PoolingDescriptor),
    Dropout(DropoutDescriptor),
}

#[derive(Debug, Default)]
struct ApiState {
    next_id: u64,
    buffers: HashMap<u64, DeviceMemory>,
    descriptors: HashMap<u64, AnyDescriptor>,
}

impl ApiState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn buffer(&self, id: BufferId) -> DeviceResult<*mut c_void> {
        self.buffers
            .get(&id.0)
            .map(|mem| mem.ptr())
            .ok_or_else(|| DeviceError::new("buffer lookup", format!("unknown buffer id {}", id.0)))
    }

    fn any(&self, id: DescriptorId) -> DeviceResult<&AnyDescriptor> {
        self.descriptors
            .get(&id.0)
            .ok_or_else(|| DeviceError::new("descriptor lookup", format!("unknown descriptor id {}", id.0)))
    }

    fn tensor(&self, id: DescriptorId) -> DeviceResult<(cudnnTensorDescriptor_t, ElementKind)> {
        match self.any(id)? {
            AnyDescriptor::Tensor { desc, kind } => Ok((desc.raw(), *kind)),
            _ => Err(DeviceError::new("descriptor lookup", "expected a tensor descriptor")),
        }
    }

    fn filter(&self, id: DescriptorId) -> DeviceResult<cudnnFilterDescriptor_t> {
        match self.any(id)? {
            AnyDescriptor::Filter(desc) => Ok(desc.raw()),
            _ => Err(DeviceError::new("descriptor lookup", "expected a filter descriptor")),
        }
    }

    fn conv(&self, id: DescriptorId) -> DeviceResult<cudnnConvolutionDescriptor_t> {
        match self.any(id)? {
            AnyDescriptor::Conv(desc) => Ok(desc.raw()),
            _ => Err(DeviceError::new("descriptor lookup", "expected a convolution descriptor")),
        }
    }

    fn activation(&self, id: DescriptorId) -> DeviceResult<cudnnActivationDescriptor_t> {
        match self.any(id)? {
            AnyDescriptor::Activation(desc) => Ok(desc.raw()),
            _ => Err(DeviceError::new("descriptor lookup", "expected an activation descriptor")),
        }
    }

    fn pooling(&self, id: DescriptorId) -> DeviceResult<cudnnPoolingDescriptor_t> {
        match self.any(id)? {
            AnyDescriptor::Pooling(desc) => Ok(desc.raw()),
            _ => Err(DeviceError::new("descriptor lookup", "expected a pooling descriptor")),
        }
    }

    fn dropout(&self, id: DescriptorId) -> DeviceResult<cudnnDropoutDescriptor_t> {
        match self.any(id)? {
            AnyDescriptor::Dropout(desc) => Ok(desc.raw()),
            _ => Err(DeviceError::new("descriptor lookup", "expected a dropout descriptor")),
        }
    }
}

/// cuDNN scaling parameters are host floats for every data type except
/// double tensors, which take host doubles.
enum Scaling {
    Single(f32),
    Double(f64),
}

impl Scaling {
    fn new(kind: ElementKind, value: f32) -> Scaling {
        match kind {
            ElementKind::F64 => Scaling::Double(value as f64),
            _ => Scaling::Single(value),
        }
    }

    fn ptr(&self) -> *const c_void {
        match self {
            Scaling::Single(value) => value as *const f32 as *const c_void,
            Scaling::Double(value) => value as *const f64 as *const c_void,
        }
    }
}

fn blas_op(transpose: bool) -> cublasOperation_t {
    if transpose {
        CUBLAS_OP_T
    } else {
        CUBLAS_OP_N
    }
}

pub struct CudaApi {
    ordinal: i32,
    cudnn: CudnnHandle,
    cublas: CublasHandle,
    start: CudaEvent,
    stop: CudaEvent,
    state: RefCell<ApiState>,
}

impl CudaApi {
    /// Bind the given device ordinal and bring up the library handles.
    pub fn new(ordinal: i32) -> DeviceResult<Self> {
        bind_device(ordinal)?;
        Ok(CudaApi {
            ordinal,
            cudnn: CudnnHandle::new()?,
            cublas: CublasHandle::new()?,
            start: CudaEvent::new()?,
            stop: CudaEvent::new()?,
            state: RefCell::new(ApiState::default()),
        })
    }

    fn insert_descriptor(&self, descriptor: AnyDescriptor) -> DescriptorId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.descriptors.insert(id, descriptor);
        DescriptorId(id)
    }

    fn launch_gemm(&self, call: &OpCall) -> DeviceResult<()> {
        let OpCall::Gemm {
            kind,
            math,
            m,
            n,
            k,
            trans_a,
            trans_b,
            alpha,
            beta,
            lda,
            ldb,
            a,
            b,
            c,
        } = call
        else {
            unreachable!()
        };
        let state = self.state.borrow();
        let (d_a, d_b, d_c) = (state.buffer(*a)?, state.buffer(*b)?, state.buffer(*c)?);

        let math_mode = match math {
            MathMode::Default => CUBLAS_DEFAULT_MATH,
            MathMode::TensorOp => CUBLAS_TENSOR_OP_MATH,
        };
        check_cublas("cublasSetMathMode", unsafe {
            cublasSetMathMode(self.cublas.raw(), math_mode)
        })?;

        match kind {
            ElementKind::F32 => check_cublas("cublasSgemm", unsafe {
                cublasSgemm_v2(
                    self.cublas.raw(),
                    blas_op(*trans_a),
                    blas_op(*trans_b),
                    *m,
                    *n,
                    *k,
                    alpha,
                    d_a,
                    *lda,
                    d_b,
                    *ldb,
                    beta,
                    d_c,
                    *m,
                )
            }),
            ElementKind::F64 => {
                let (alpha, beta) = (*alpha as f64, *beta as f64);
                check_cublas("cublasDgemm", unsafe {
                    cublasDgemm_v2(
                        self.cublas.raw(),
                        blas_op(*trans_a),
                        blas_op(*trans_b),
                        *m,
                        *n,
                        *k,
                        &alpha,
                        d_a,
                        *lda,
                        d_b,
                        *ldb,
                        &beta,
                        d_c,
                        *m,
                    )
                })
            }
            ElementKind::F16 => {
                // half inputs with single-precision accumulate
                let algo = match math {
                    MathMode::TensorOp => CUBLAS_GEMM_DFALT_TENSOR_OP,
                    MathMode::Default => CUBLAS_GEMM_DFALT,
                };
                check_cublas("cublasGemmEx", unsafe {
                    cublasGemmEx(
                        self.cublas.raw(),
                        blas_op(*trans_a),
                        blas_op(*trans_b),
                        *m,
                        *n,
                        *k,
                        alpha as *const f32 as *const c_void,
                        d_a,
                        CUDA_R_16F,
                        *lda,
                        d_b,
                        CUDA_R_16F,
                        *ldb,
                        beta as *const f32 as *const c_void,
                        d_c,
                        CUDA_R_16F,
                        *m,
                        CUDA_R_32F,
                        algo,
                    )
                })
            }
            ElementKind::I8 | ElementKind::I32 => Err(DeviceError::new(
                "cublasGemmEx",
                format!("no gemm entry point for element kind {}", kind),
            )),
        }
    }
}

impl Device for CudaApi {
    fn name(&self) -> String {
        format!("cuda:{}", self.ordinal)
    }

    fn alloc(&self, len_bytes: usize) -> DeviceResult<BufferId> {
        let memory = DeviceMemory::alloc(len_bytes)?;
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.buffers.insert(id, memory);
        Ok(BufferId(id))
    }

    fn free(&self, buffer: BufferId) {
        self.state.borrow_mut().buffers.remove(&buffer.0);
    }

    fn upload(&self, buffer: BufferId, data: &[u8]) -> DeviceResult<()> {
        let state = self.state.borrow();
        let memory = state
            .buffers
            .get(&buffer.0)
            .ok_or_else(|| DeviceError::new("buffer lookup", format!("unknown buffer id {}", buffer.0)))?;
        memory.upload(data)
    }

    fn create_tensor(&self, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<DescriptorId> {
        let desc = TensorDescriptor::new(kind, dims)?;
        Ok(self.insert_descriptor(AnyDescriptor::Tensor { desc, kind }))
    }

    fn create_filter(&self, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<DescriptorId> {
        let desc = FilterDescriptor::new(kind, dims)?;
        Ok(self.insert_descriptor(AnyDescriptor::Filter(desc)))
    }

    fn create_conv(&self, kind: ElementKind, settings: &ConvSettings) -> DeviceResult<DescriptorId> {
        let desc = ConvolutionDescriptor::new(kind, settings)?;
        Ok(self.insert_descriptor(AnyDescriptor::Conv(desc)))
    }

    fn create_activation(&self, mode: ActivationMode, coef: f64) -> DeviceResult<DescriptorId> {
        let desc = ActivationDescriptor::new(mode, coef)?;
        Ok(self.insert_descriptor(AnyDescriptor::Activation(desc)))
    }

    fn create_pooling(
        &self,
        mode: PoolingMode,
        window: [i32; 2],
        padding: [i32; 2],
        stride: [i32; 2],
    ) -> DeviceResult<DescriptorId> {
        let desc = PoolingDescriptor::new(mode, window, padding, stride)?;
        Ok(self.insert_descriptor(AnyDescriptor::Pooling(desc)))
    }

    fn create_dropout(
        &self,
        rate: f32,
        seed: u64,
        states: BufferId,
        states_bytes: usize,
    ) -> DeviceResult<DescriptorId> {
        let states_ptr = self.state.borrow().buffer(states)?;
        let desc = DropoutDescriptor::new(&self.cudnn, rate, seed, states_ptr, states_bytes)?;
        Ok(self.insert_descriptor(AnyDescriptor::Dropout(desc)))
    }

    fn destroy(&self, descriptor: DescriptorId) {
        self.state.borrow_mut().descriptors.remove(&descriptor.0);
    }

    fn conv_output_dims(
        &self,
        conv: DescriptorId,
        input: DescriptorId,
        filter: DescriptorId,
    ) -> DeviceResult<[i32; 4]> {
        let state = self.state.borrow();
        let conv = state.conv(conv)?;
        let (input, _) = state.tensor(input)?;
        let filter = state.filter(filter)?;
        let mut dims = [0 as c_int; 4];
        check_cudnn("cudnnGetConvolution2dForwardOutputDim", unsafe {
            cudnnGetConvolution2dForwardOutputDim(
                conv,
                input,
                filter,
                &mut dims[0],
                &mut dims[1],
                &mut dims[2],
                &mut dims[3],
            )
        })?;
        Ok(dims)
    }

    fn pooling_output_dims(&self, pooling: DescriptorId, input: DescriptorId) -> DeviceResult<[i32; 4]> {
        let state = self.state.borrow();
        let pooling = state.pooling(pooling)?;
        let (input, _) = state.tensor(input)?;
        let mut dims = [0 as c_int; 4];
        check_cudnn("cudnnGetPooling2dForwardOutputDim", unsafe {
            cudnnGetPooling2dForwardOutputDim(pooling, input, &mut dims[0], &mut dims[1], &mut dims[2], &mut dims[3])
        })?;
        Ok(dims)
    }

    fn batchnorm_param_dims(&self, input: DescriptorId, mode: BatchNormMode) -> DeviceResult<[i32; 4]> {
        let state = self.state.borrow();
        let AnyDescriptor::Tensor { desc, .. } = state.any(input)? else {
            return Err(DeviceError::new("descriptor lookup", "expected a tensor descriptor"));
        };
        let derived = desc.derive_batchnorm_param(mode)?;

        let mut data_type = 0;
        let mut dims = [0 as c_int; 4];
        let mut strides = [0 as c_int; 4];
        check_cudnn("cudnnGetTensor4dDescriptor", unsafe {
            cudnnGetTensor4dDescriptor(
                derived.raw(),
                &mut data_type,
                &mut dims[0],
                &mut dims[1],
                &mut dims[2],
                &mut dims[3],
                &mut strides[0],
                &mut strides[1],
                &mut strides[2],
                &mut strides[3],
            )
        })?;
        Ok(dims)
    }

    fn dropout_states_bytes(&self) -> DeviceResult<usize> {
        let mut size = 0;
        check_cudnn("cudnnDropoutGetStatesSize", unsafe {
            cudnnDropoutGetStatesSize(self.cudnn.raw(), &mut size)
        })?;
        Ok(size)
    }

    fn dropout_reserve_bytes(&self, input: DescriptorId) -> DeviceResult<usize> {
        let state = self.state.borrow();
        let (input, _) = state.tensor(input)?;
        let mut size = 0;
        check_cudnn("cudnnDropoutGetReserveSpaceSize", unsafe {
            cudnnDropoutGetReserveSpaceSize(input, &mut size)
        })?;
        Ok(size)
    }

    fn conv_bwd_data_workspace_bytes(
        &self,
        algo: ConvBwdDataAlgo,
        conv: DescriptorId,
        filter: DescriptorId,
        diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<usize> {
        let state = self.state.borrow();
        let conv = state.conv(conv)?;
        let filter = state.filter(filter)?;
        let (diff, _) = state.tensor(diff)?;
        let (grad, _) = state.tensor(grad)?;
        let mut size = 0;
        check_cudnn("cudnnGetConvolutionBackwardDataWorkspaceSize", unsafe {
            cudnnGetConvolutionBackwardDataWorkspaceSize(
                self.cudnn.raw(),
                filter,
                diff,
                conv,
                grad,
                bwd_data_algo(algo),
                &mut size,
            )
        })?;
        Ok(size)
    }

    fn advise_conv_bwd_data_algo(
        &self,
        conv: DescriptorId,
        filter: DescriptorId,
        diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<Option<ConvBwdDataAlgo>> {
        let state = self.state.borrow();
        let conv = state.conv(conv)?;
        let filter = state.filter(filter)?;
        let (diff, _) = state.tensor(diff)?;
        let (grad, _) = state.tensor(grad)?;

        let mut results: [cudnnConvolutionBwdDataAlgoPerf_t; FIND_ALGO_MAX] = unsafe { std::mem::zeroed() };
        let mut returned = 0;
        check_cudnn("cudnnGetConvolutionBackwardDataAlgorithm_v7", unsafe {
            cudnnGetConvolutionBackwardDataAlgorithm_v7(
                self.cudnn.raw(),
                filter,
                diff,
                conv,
                grad,
                FIND_ALGO_MAX as c_int,
                &mut returned,
                results.as_mut_ptr(),
            )
        })?;
        let advised = results[..returned as usize]
            .iter()
            .find(|perf| perf.status == CUDNN_STATUS_SUCCESS)
            .and_then(|perf| ConvBwdDataAlgo::from_index(perf.algo as i64));
        Ok(advised)
    }

    fn find_conv_bwd_data_algos(
        &self,
        conv: DescriptorId,
        filter: DescriptorId,
        diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<Vec<ConvBwdDataPerf>> {
        let state = self.state.borrow();
        let conv = state.conv(conv)?;
        let filter = state.filter(filter)?;
        let (diff, _) = state.tensor(diff)?;
        let (grad, _) = state.tensor(grad)?;

        let mut results: [cudnnConvolutionBwdDataAlgoPerf_t; FIND_ALGO_MAX] = unsafe { std::mem::zeroed() };
        let mut returned = 0;
        check_cudnn("cudnnFindConvolutionBackwardDataAlgorithm", unsafe {
            cudnnFindConvolutionBackwardDataAlgorithm(
                self.cudnn.raw(),
                filter,
                diff,
                conv,
                grad,
                FIND_ALGO_MAX as c_int,
                &mut returned,
                results.as_mut_ptr(),
            )
        })?;

        let perfs = results[..returned as usize]
            .iter()
            .filter(|perf| perf.status == CUDNN_STATUS_SUCCESS)
            .filter_map(|perf| {
                ConvBwdDataAlgo::from_index(perf.algo as i64).map(|algo| ConvBwdDataPerf {
                    algo,
                    time_ms: perf.time,
                    memory_bytes: perf.memory,
                    deterministic: perf.determinism == CUDNN_DETERMINISTIC,
                })
            })
            .collect();
        Ok(perfs)
    }

    fn launch(&self, call: &OpCall) -> DeviceResult<()> {
        match call {
            OpCall::Gemm { .. } => self.launch_gemm(call),
            OpCall::ActivationBackward {
                activation,
                alpha,
                beta,
                data,
                y,
                dy,
                x,
                dx,
            } => {
                let state = self.state.borrow();
                let activation = state.activation(*activation)?;
                let (data, kind) = state.tensor(*data)?;
                let (alpha, beta) = (Scaling::new(kind, *alpha), Scaling::new(kind, *beta));
                check_cudnn("cudnnActivationBackward", unsafe {
                    cudnnActivationBackward(
                        self.cudnn.raw(),
                        activation,
                        alpha.ptr(),
                        data,
                        state.buffer(*y)?,
                        data,
                        state.buffer(*dy)?,
                        data,
                        state.buffer(*x)?,
                        beta.ptr(),
                        data,
                        state.buffer(*dx)?,
                    )
                })
            }
            OpCall::BatchNormForward {
                mode,
                training,
                alpha,
                beta,
                data,
                param,
                x,
                y,
                scale,
                bias,
                mean,
                variance,
                saved_mean,
                saved_variance,
                average_factor,
                epsilon,
            } => {
                let state = self.state.borrow();
                let (data, kind) = state.tensor(*data)?;
                let (param, _) = state.tensor(*param)?;
                let (alpha, beta) = (Scaling::new(kind, *alpha), Scaling::new(kind, *beta));
                let mode = crate::cuda::descriptor::batchnorm_mode(*mode);
                if *training {
                    let saved_mean = saved_mean.map(|id| state.buffer(id)).transpose()?.unwrap_or(null_mut());
                    let saved_variance =
                        saved_variance.map(|id| state.buffer(id)).transpose()?.unwrap_or(null_mut());
                    check_cudnn("cudnnBatchNormalizationForwardTraining", unsafe {
                        cudnnBatchNormalizationForwardTraining(
                            self.cudnn.raw(),
                            mode,
                            alpha.ptr(),
                            beta.ptr(),
                            data,
                            state.buffer(*x)?,
                            data,
                            state.buffer(*y)?,
                            param,
                            state.buffer(*scale)?,
                            state.buffer(*bias)?,
                            *average_factor,
                            state.buffer(*mean)?,
                            state.buffer(*variance)?,
                            *epsilon,
                            saved_mean,
                            saved_variance,
                        )
                    })
                } else {
                    check_cudnn("cudnnBatchNormalizationForwardInference", unsafe {
                        cudnnBatchNormalizationForwardInference(
                            self.cudnn.raw(),
                            mode,
                            alpha.ptr(),
                            beta.ptr(),
                            data,
                            state.buffer(*x)?,
                            data,
                            state.buffer(*y)?,
                            param,
                            state.buffer(*scale)?,
                            state.buffer(*bias)?,
                            state.buffer(*mean)?,
                            state.buffer(*variance)?,
                            *epsilon,
                        )
                    })
                }
            }
            OpCall::ConvBackwardBias {
                alpha,
                beta,
                diff,
                dy,
                bias,
                db,
            } => {
                let state = self.state.borrow();
                let (diff, kind) = state.tensor(*diff)?;
                let (bias, _) = state.tensor(*bias)?;
                let (alpha, beta) = (Scaling::new(kind, *alpha), Scaling::new(kind, *beta));
                check_cudnn("cudnnConvolutionBackwardBias", unsafe {
                    cudnnConvolutionBackwardBias(
                        self.cudnn.raw(),
                        alpha.ptr(),
                        diff,
                        state.buffer(*dy)?,
                        beta.ptr(),
                        bias,
                        state.buffer(*db)?,
                    )
                })
            }
            OpCall::ConvBackwardData {
                alpha,
                beta,
                algo,
                conv,
                filter,
                w,
                diff,
                dy,
                grad,
                dx,
                workspace,
                workspace_bytes,
            } => {
                let state = self.state.borrow();
                let conv = state.conv(*conv)?;
                let filter = state.filter(*filter)?;
                let (diff, kind) = state.tensor(*diff)?;
                let (grad, _) = state.tensor(*grad)?;
                let (alpha, beta) = (Scaling::new(kind, *alpha), Scaling::new(kind, *beta));
                check_cudnn("cudnnConvolutionBackwardData", unsafe {
                    cudnnConvolutionBackwardData(
                        self.cudnn.raw(),
                        alpha.ptr(),
                        filter,
                        state.buffer(*w)?,
                        diff,
                        state.buffer(*dy)?,
                        conv,
                        bwd_data_algo(*algo),
                        state.buffer(*workspace)?,
                        *workspace_bytes,
                        beta.ptr(),
                        grad,
                        state.buffer(*dx)?,
                    )
                })
            }
            OpCall::DropoutForward {
                dropout,
                data,
                x,
                y,
                reserve,
                reserve_bytes,
            } => {
                let state = self.state.borrow();
                let dropout = state.dropout(*dropout)?;
                let (data, _) = state.tensor(*data)?;
                check_cudnn("cudnnDropoutForward", unsafe {
                    cudnnDropoutForward(
                        self.cudnn.raw(),
                        dropout,
                        data,
                        state.buffer(*x)?,
                        data,
                        state.buffer(*y)?,
                        state.buffer(*reserve)?,
                        *reserve_bytes,
                    )
                })
            }
            OpCall::PoolingBackward {
                pooling,
                alpha,
                beta,
                output,
                y,
                dy,
                input,
                x,
                dx,
            } => {
                let state = self.state.borrow();
                let pooling = state.pooling(*pooling)?;
                let (output, kind) = state.tensor(*output)?;
                let (input, _) = state.tensor(*input)?;
                let (alpha, beta) = (Scaling::new(kind, *alpha), Scaling::new(kind, *beta));
                check_cudnn("cudnnPoolingBackward", unsafe {
                    cudnnPoolingBackward(
                        self.cudnn.raw(),
                        pooling,
                        alpha.ptr(),
                        output,
                        state.buffer(*y)?,
                        output,
                        state.buffer(*dy)?,
                        input,
                        state.buffer(*x)?,
                        beta.ptr(),
                        input,
                        state.buffer(*dx)?,
                    )
                })
            }
            OpCall::ScaleTensor { data, buffer, alpha } => {
                let state = self.state.borrow();
                let (data, kind) = state.tensor(*data)?;
                let alpha = Scaling::new(kind, *alpha);
                check_cudnn("cudnnScaleTensor", unsafe {
                    cudnnScaleTensor(self.cudnn.raw(), data, state.buffer(*buffer)?, alpha.ptr())
                })
            }
        }
    }

    fn synchronize(&self) -> DeviceResult<()> {
        crate::cuda::status::check_cuda("cudaDeviceSynchronize", unsafe { cudaDeviceSynchronize() })
    }

    fn begin_sample(&self) -> DeviceResult<()> {
        self.start.record()
    }

    fn end_sample(&self) -> DeviceResult<f32> {
        self.stop.record()?;
        self.stop.synchronize()?;
        self.stop.elapsed_since(&self.start)
    }
}

impl std::fmt::Debug for CudaApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaApi").field("ordinal", &self.ordinal).finish()
    }
}
