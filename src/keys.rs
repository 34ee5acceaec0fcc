//! Identity keys for kernel variants.
//!
//! Keys compare field by field; there is no fuzzy matching. The transpose key
//! carries no device because transpose cost is treated as device-insensitive,
//! while SMM tuning is device-specific.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::kernel_types::{DeviceUid, ElemType};

/// Common bound for everything used as a store key.
pub trait TuningKey: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn elem_type(&self) -> ElemType;
}

/// Transpose-kernel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransKey {
    pub ty: ElemType,
    pub m: i32,
    pub n: i32,
}

impl TransKey {
    pub const fn new(ty: ElemType, m: i32, n: i32) -> Self {
        Self { ty, m, n }
    }
}

impl TuningKey for TransKey {
    fn elem_type(&self) -> ElemType {
        self.ty
    }
}

impl fmt::Display for TransKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trans_{}_{}x{}", self.ty, self.m, self.n)
    }
}

/// SMM-kernel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SmmKey {
    pub ty: ElemType,
    pub m: i32,
    pub n: i32,
    pub k: i32,
    pub device: DeviceUid,
}

impl SmmKey {
    pub const fn new(ty: ElemType, m: i32, n: i32, k: i32, device: DeviceUid) -> Self {
        Self { ty, m, n, k, device }
    }

    /// Floating-point operations of one product in the stack.
    pub fn flops(&self) -> u64 {
        [self.m, self.n, self.k]
            .iter()
            .fold(self.ty.flops_per_mac(), |acc, &d| acc.saturating_mul(d.max(0) as u64))
    }

    /// FLOP per byte moved for one product (A and B read, C written).
    pub fn arithmetic_intensity(&self) -> f64 {
        let (m, n, k) = (self.m as f64, self.n as f64, self.k as f64);
        let bytes = self.ty.size_bytes() as f64 * (m * k + k * n + m * n);
        if bytes > 0.0 {
            self.flops() as f64 / bytes
        } else {
            0.0
        }
    }
}

impl TuningKey for SmmKey {
    fn elem_type(&self) -> ElemType {
        self.ty
    }
}

impl fmt::Display for SmmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "smm_{}_{}x{}x{}@{}", self.ty, self.m, self.n, self.k, self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smm_key_equality_is_exact() {
        let a = SmmKey::new(ElemType::F64, 4, 4, 4, DeviceUid(7));
        let b = SmmKey::new(ElemType::F64, 4, 4, 4, DeviceUid(8));
        assert_ne!(a, b);
        assert_eq!(a, SmmKey::new(ElemType::F64, 4, 4, 4, DeviceUid(7)));
    }

    #[test]
    fn test_arithmetic_intensity() {
        // 2*4*4*4 FLOP over 8 * 48 bytes
        let key = SmmKey::new(ElemType::F64, 4, 4, 4, DeviceUid(0));
        assert_eq!(key.flops(), 128);
        assert!((key.arithmetic_intensity() - 128.0 / 384.0).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        let key = TransKey::new(ElemType::F32, 23, 5);
        assert_eq!(key.to_string(), "trans_f32_23x5");
        let key = SmmKey::new(ElemType::F64, 4, 5, 6, DeviceUid(2));
        assert_eq!(key.to_string(), "smm_f64_4x5x6@2");
    }
}
