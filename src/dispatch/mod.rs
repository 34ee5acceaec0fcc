//! Policy decisions that gate kernel-family selection.
//!
//! Both decisions are pure functions of their inputs: whether operand buffers
//! go to constant memory on a device, and whether the MNK kernel family is
//! applicable to a stack.

pub mod device_caps;
pub mod suitability;

pub use device_caps::{should_use_constant_memory, DeviceCaps};
pub use suitability::{is_suitable, SupportedTypes};
