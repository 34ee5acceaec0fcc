//! Kernel-related types shared by keys, configurations and the codec.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type of a kernel variant.
///
/// Discriminants are the DBCSR data-type codes, which is also what the
/// persisted `type` field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum ElemType {
    F32 = 1,
    F64 = 3,
    C32 = 5,
    C64 = 7,
}

/// Precision class used to bucket performance statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    Single,
    Double,
}

impl ElemType {
    /// Convert to the persisted type code.
    #[inline(always)]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Convert from a persisted type code.
    #[inline(always)]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ElemType::F32),
            3 => Some(ElemType::F64),
            5 => Some(ElemType::C32),
            7 => Some(ElemType::C64),
            _ => None,
        }
    }

    /// Size of one element in bytes.
    #[inline(always)]
    pub const fn size_bytes(self) -> usize {
        match self {
            ElemType::F32 => 4,
            ElemType::F64 | ElemType::C32 => 8,
            ElemType::C64 => 16,
        }
    }

    #[inline(always)]
    pub const fn precision(self) -> Precision {
        match self {
            ElemType::F32 | ElemType::C32 => Precision::Single,
            ElemType::F64 | ElemType::C64 => Precision::Double,
        }
    }

    #[inline(always)]
    pub const fn is_complex(self) -> bool {
        matches!(self, ElemType::C32 | ElemType::C64)
    }

    /// Floating-point operations per multiply-accumulate.
    #[inline(always)]
    pub const fn flops_per_mac(self) -> u64 {
        if self.is_complex() {
            8
        } else {
            2
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElemType::F32 => "f32",
            ElemType::F64 => "f64",
            ElemType::C32 => "c32",
            ElemType::C64 => "c64",
        }
    }
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric device identity resolved by the device-enumeration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct DeviceUid(pub i32);

impl fmt::Display for DeviceUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference into the compute API's compiled-program registry.
///
/// The cache never owns or releases the kernel behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelHandle(pub u64);

/// A compiled kernel together with the work-group size it was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundKernel {
    pub handle: KernelHandle,
    pub wgsize: usize,
}

/// Which of the two kernel slots of an SMM configuration to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelVariant {
    Primary = 0,
    Alternate = 1,
}

impl KernelVariant {
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Rule for choosing between the primary and alternate SMM kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VariantPolicy {
    /// Always launch the primary kernel.
    #[default]
    PrimaryOnly,
    /// Launch the alternate kernel when the stack is not a whole number of
    /// intra-kernel batches (`stack_size % bs != 0`).
    AlternateForPartialBatch,
}

impl VariantPolicy {
    pub fn choose(self, stack_size: usize, bs: i32) -> KernelVariant {
        match self {
            VariantPolicy::PrimaryOnly => KernelVariant::Primary,
            VariantPolicy::AlternateForPartialBatch => {
                if bs > 1 && stack_size % bs as usize != 0 {
                    KernelVariant::Alternate
                } else {
                    KernelVariant::Primary
                }
            }
        }
    }
}
