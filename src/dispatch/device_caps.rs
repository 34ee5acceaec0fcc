//! Device capability descriptor and the constant-memory policy.
//!
//! The descriptor is filled in by the device-enumeration layer; nothing here
//! queries a device.

use serde::{Deserialize, Serialize};

use crate::kernel_types::DeviceUid;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceCaps {
    /// Human-readable device name, as used in persisted parameter files.
    pub name: String,
    pub uid: DeviceUid,
    /// Largest single buffer allocation in bytes.
    pub max_mem_alloc_size: u64,
    /// Largest constant (read-only, cached) buffer in bytes.
    pub max_constant_buffer_size: u64,
    pub max_work_group_size: usize,
}

impl DeviceCaps {
    /// True when any allocatable buffer also fits into constant memory.
    pub fn constant_memory_fits(&self) -> bool {
        self.max_constant_buffer_size > 0 && self.max_mem_alloc_size <= self.max_constant_buffer_size
    }
}

/// Whether operand buffers should be declared as constant memory on `device`.
///
/// Pure and deterministic for a given descriptor; callers may cache the result
/// per device. Always false without the `cmem` feature.
pub fn should_use_constant_memory(device: &DeviceCaps) -> bool {
    cfg!(feature = "cmem") && device.constant_memory_fits()
}
