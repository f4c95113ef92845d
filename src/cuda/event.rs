//! Device-side timestamp events, the basis of the measured loop's timing.

use std::ptr::null_mut;

use crate::cuda::bindings::{
    cudaEventCreate, cudaEventDestroy, cudaEventElapsedTime, cudaEventRecord, cudaEventSynchronize,
    cudaEvent_t,
};
use crate::cuda::status::check_cuda;
use crate::device::DeviceResult;

pub struct CudaEvent {
    inner: cudaEvent_t,
}

impl CudaEvent {
    pub fn new() -> DeviceResult<Self> {
        let mut inner = null_mut();
        check_cuda("cudaEventCreate", unsafe { cudaEventCreate(&mut inner) })?;
        Ok(CudaEvent { inner })
    }

    /// Record on the default stream.
    pub fn record(&self) -> DeviceResult<()> {
        check_cuda("cudaEventRecord", unsafe { cudaEventRecord(self.inner, null_mut()) })
    }

    pub fn synchronize(&self) -> DeviceResult<()> {
        check_cuda("cudaEventSynchronize", unsafe { cudaEventSynchronize(self.inner) })
    }

    /// Milliseconds from `start` to `self`; both must have been recorded.
    pub fn elapsed_since(&self, start: &CudaEvent) -> DeviceResult<f32> {
        let mut ms = 0.0;
        check_cuda("cudaEventElapsedTime", unsafe {
            cudaEventElapsedTime(&mut ms, start.inner, self.inner)
        })?;
        Ok(ms)
    }
}

impl Drop for CudaEvent {
    fn drop(&mut self) {
        unsafe {
            cudaEventDestroy(self.inner);
        }
    }
}

impl std::fmt::Debug for CudaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaEvent").field("inner", &self.inner).finish()
    }
}
