//! RAII owners of the raw cuDNN descriptors and the enum translations from
//! the crate's vendor-neutral types.

use std::os::raw::c_void;
use std::ptr::null_mut;

use crate::cuda::bindings::*;
use crate::cuda::handle::CudnnHandle;
use crate::cuda::status::check_cudnn;
use crate::device::{ActivationMode, BatchNormMode, ConvBwdDataAlgo, ConvSettings, DeviceResult, MathMode, PoolingMode};
use crate::dtype::ElementKind;

pub fn data_type(kind: ElementKind) -> cudnnDataType_t {
    match kind {
        ElementKind::F16 => CUDNN_DATA_HALF,
        ElementKind::F32 => CUDNN_DATA_FLOAT,
        ElementKind::F64 => CUDNN_DATA_DOUBLE,
        ElementKind::I8 => CUDNN_DATA_INT8,
        ElementKind::I32 => CUDNN_DATA_INT32,
    }
}

pub fn activation_mode(mode: ActivationMode) -> cudnnActivationMode_t {
    mode.index() as cudnnActivationMode_t
}

pub fn pooling_mode(mode: PoolingMode) -> cudnnPoolingMode_t {
    mode.index() as cudnnPoolingMode_t
}

pub fn batchnorm_mode(mode: BatchNormMode) -> cudnnBatchNormMode_t {
    mode.index() as cudnnBatchNormMode_t
}

pub fn bwd_data_algo(algo: ConvBwdDataAlgo) -> cudnnConvolutionBwdDataAlgo_t {
    algo.index() as cudnnConvolutionBwdDataAlgo_t
}

pub fn math_type(math: MathMode) -> cudnnMathType_t {
    match math {
        MathMode::Default => CUDNN_DEFAULT_MATH,
        MathMode::TensorOp => CUDNN_TENSOR_OP_MATH,
    }
}

macro_rules! raii_descriptor {
    ($name:ident, $raw:ty, $create:ident, $destroy:ident) => {
        pub struct $name {
            inner: $raw,
        }

        impl $name {
            fn create() -> DeviceResult<Self> {
                let mut inner = null_mut();
                check_cudnn(stringify!($create), unsafe { $create(&mut inner) })?;
                Ok($name { inner })
            }

            pub fn raw(&self) -> $raw {
                self.inner
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                unsafe {
                    $destroy(self.inner);
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name)).field("inner", &self.inner).finish()
            }
        }
    };
}

raii_descriptor!(
    TensorDescriptor,
    cudnnTensorDescriptor_t,
    cudnnCreateTensorDescriptor,
    cudnnDestroyTensorDescriptor
);
raii_descriptor!(
    FilterDescriptor,
    cudnnFilterDescriptor_t,
    cudnnCreateFilterDescriptor,
    cudnnDestroyFilterDescriptor
);
raii_descriptor!(
    ConvolutionDescriptor,
    cudnnConvolutionDescriptor_t,
    cudnnCreateConvolutionDescriptor,
    cudnnDestroyConvolutionDescriptor
);
raii_descriptor!(
    ActivationDescriptor,
    cudnnActivationDescriptor_t,
    cudnnCreateActivationDescriptor,
    cudnnDestroyActivationDescriptor
);
raii_descriptor!(
    PoolingDescriptor,
    cudnnPoolingDescriptor_t,
    cudnnCreatePoolingDescriptor,
    cudnnDestroyPoolingDescriptor
);
raii_descriptor!(
    DropoutDescriptor,
    cudnnDropoutDescriptor_t,
    cudnnCreateDropoutDescriptor,
    cudnnDestroyDropoutDescriptor
);

impl TensorDescriptor {
    pub fn new(kind: ElementKind, dims: [i32; 4]) -> DeviceResult<Self> {
        let desc = Self::create()?;
        check_cudnn("cudnnSetTensor4dDescriptor", unsafe {
            cudnnSetTensor4dDescriptor(
                desc.inner,
                CUDNN_TENSOR_NCHW,
                data_type(kind),
                dims[0],
                dims[1],
                dims[2],
                dims[3],
            )
        })?;
        Ok(desc)
    }

    /// The matching per-channel parameter descriptor for batchnorm over this
    /// tensor, with the library deriving the shape.
    pub fn derive_batchnorm_param(&self, mode: BatchNormMode) -> DeviceResult<Self> {
        let derived = Self::create()?;
        check_cudnn("cudnnDeriveBNTensorDescriptor", unsafe {
            cudnnDeriveBNTensorDescriptor(derived.inner, self.inner, batchnorm_mode(mode))
        })?;
        Ok(derived)
    }
}

impl FilterDescriptor {
    pub fn new(kind: ElementKind, dims: [i32; 4]) -> DeviceResult<Self> {
        let desc = Self::create()?;
        check_cudnn("cudnnSetFilter4dDescriptor", unsafe {
            cudnnSetFilter4dDescriptor(
                desc.inner,
                data_type(kind),
                CUDNN_TENSOR_NCHW,
                dims[0],
                dims[1],
                dims[2],
                dims[3],
            )
        })?;
        Ok(desc)
    }
}

impl ConvolutionDescriptor {
    pub fn new(kind: ElementKind, settings: &ConvSettings) -> DeviceResult<Self> {
        let desc = Self::create()?;
        check_cudnn("cudnnSetConvolution2dDescriptor", unsafe {
            cudnnSetConvolution2dDescriptor(
                desc.inner,
                settings.pad_height,
                settings.pad_width,
                settings.stride_height,
                settings.stride_width,
                settings.dilation_height,
                settings.dilation_width,
                CUDNN_CROSS_CORRELATION,
                data_type(kind),
            )
        })?;
        if settings.group_count != 1 {
            check_cudnn("cudnnSetConvolutionGroupCount", unsafe {
                cudnnSetConvolutionGroupCount(desc.inner, settings.group_count)
            })?;
        }
        check_cudnn("cudnnSetConvolutionMathType", unsafe {
            cudnnSetConvolutionMathType(desc.inner, math_type(settings.math))
        })?;
        Ok(desc)
    }
}

impl ActivationDescriptor {
    pub fn new(mode: ActivationMode, coef: f64) -> DeviceResult<Self> {
        let desc = Self::create()?;
        check_cudnn("cudnnSetActivationDescriptor", unsafe {
            cudnnSetActivationDescriptor(desc.inner, activation_mode(mode), CUDNN_PROPAGATE_NAN, coef)
        })?;
        Ok(desc)
    }
}

impl PoolingDescriptor {
    pub fn new(
        mode: PoolingMode,
        window: [i32; 2],
        padding: [i32; 2],
        stride: [i32; 2],
    ) -> DeviceResult<Self> {
        let desc = Self::create()?;
        check_cudnn("cudnnSetPooling2dDescriptor", unsafe {
            cudnnSetPooling2dDescriptor(
                desc.inner,
                pooling_mode(mode),
                CUDNN_PROPAGATE_NAN,
                window[0],
                window[1],
                padding[0],
                padding[1],
                stride[0],
                stride[1],
            )
        })?;
        Ok(desc)
    }
}

impl DropoutDescriptor {
    pub fn new(
        handle: &CudnnHandle,
        rate: f32,
        seed: u64,
        states: *mut c_void,
        states_bytes: usize,
    ) -> DeviceResult<Self> {
        let desc = Self::create()?;
        check_cudnn("cudnnSetDropoutDescriptor", unsafe {
            cudnnSetDropoutDescriptor(desc.inner, handle.raw(), rate, states, states_bytes, seed)
        })?;
        Ok(desc)
    }
}
