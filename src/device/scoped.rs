//! Scoped ownership of device resources.
//!
//! Every acquisition returns a wrapper whose `Drop` releases the resource,
//! so a case that bails out half way through setup still frees everything it
//! managed to acquire, exactly once.

use crate::device::{
    ActivationMode, BatchNormMode, BufferId, ConvSettings, DescriptorId, Device, DeviceResult, PoolingMode,
};
use crate::dtype::ElementKind;

/// An owned region of device memory, freed on drop.
pub struct ScopedBuffer<'a> {
    device: &'a dyn Device,
    id: BufferId,
    len_bytes: usize,
}

impl<'a> ScopedBuffer<'a> {
    pub fn alloc(device: &'a dyn Device, len_bytes: usize) -> DeviceResult<Self> {
        let id = device.alloc(len_bytes)?;
        Ok(ScopedBuffer { device, id, len_bytes })
    }

    /// Allocate and populate from a host buffer. If the transfer fails the
    /// fresh allocation is freed by the wrapper drop before the error is
    /// returned.
    pub fn from_host(device: &'a dyn Device, data: &[u8]) -> DeviceResult<Self> {
        let buffer = ScopedBuffer::alloc(device, data.len())?;
        buffer.device.upload(buffer.id, data)?;
        Ok(buffer)
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn len_bytes(&self) -> usize {
        self.len_bytes
    }
}

impl Drop for ScopedBuffer<'_> {
    fn drop(&mut self) {
        self.device.free(self.id);
    }
}

impl std::fmt::Debug for ScopedBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedBuffer")
            .field("id", &self.id)
            .field("len_bytes", &self.len_bytes)
            .finish()
    }
}

/// An owned vendor descriptor, destroyed on drop.
pub struct ScopedDescriptor<'a> {
    device: &'a dyn Device,
    id: DescriptorId,
}

impl<'a> ScopedDescriptor<'a> {
    fn wrap(device: &'a dyn Device, id: DescriptorId) -> Self {
        ScopedDescriptor { device, id }
    }

    pub fn tensor(device: &'a dyn Device, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<Self> {
        Ok(Self::wrap(device, device.create_tensor(kind, dims)?))
    }

    pub fn filter(device: &'a dyn Device, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<Self> {
        Ok(Self::wrap(device, device.create_filter(kind, dims)?))
    }

    pub fn conv(device: &'a dyn Device, kind: ElementKind, settings: &ConvSettings) -> DeviceResult<Self> {
        Ok(Self::wrap(device, device.create_conv(kind, settings)?))
    }

    pub fn activation(device: &'a dyn Device, mode: ActivationMode, coef: f64) -> DeviceResult<Self> {
        Ok(Self::wrap(device, device.create_activation(mode, coef)?))
    }

    pub fn pooling(
        device: &'a dyn Device,
        mode: PoolingMode,
        window: [i32; 2],
        padding: [i32; 2],
        stride: [i32; 2],
    ) -> DeviceResult<Self> {
        Ok(Self::wrap(device, device.create_pooling(mode, window, padding, stride)?))
    }

    pub fn dropout(
        device: &'a dyn Device,
        rate: f32,
        seed: u64,
        states: &ScopedBuffer,
    ) -> DeviceResult<Self> {
        let id = device.create_dropout(rate, seed, states.id(), states.len_bytes())?;
        Ok(Self::wrap(device, id))
    }

    /// Tensor descriptor for the per-channel parameters of a batchnorm over
    /// `input`, with dims derived by the library.
    pub fn batchnorm_param(
        device: &'a dyn Device,
        kind: ElementKind,
        input: &ScopedDescriptor,
        mode: BatchNormMode,
    ) -> DeviceResult<(Self, [i32; 4])> {
        let dims = device.batchnorm_param_dims(input.id(), mode)?;
        Ok((Self::tensor(device, kind, dims)?, dims))
    }

    pub fn id(&self) -> DescriptorId {
        self.id
    }
}

impl Drop for ScopedDescriptor<'_> {
    fn drop(&mut self) {
        self.device.destroy(self.id);
    }
}

impl std::fmt::Debug for ScopedDescriptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedDescriptor").field("id", &self.id).finish()
    }
}
