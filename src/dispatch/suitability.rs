//! Whether the dimension-parameterized (MNK) kernel family applies to a stack.

use serde::{Deserialize, Serialize};

use crate::kernel_types::ElemType;

/// Element types the MNK kernels are built for. Complex types are never
/// supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedTypes {
    pub f32: bool,
    pub f64: bool,
}

impl Default for SupportedTypes {
    fn default() -> Self {
        Self {
            f32: cfg!(feature = "f32"),
            f64: cfg!(feature = "f64"),
        }
    }
}

impl SupportedTypes {
    pub fn allows(&self, ty: ElemType) -> bool {
        match ty {
            ElemType::F32 => self.f32,
            ElemType::F64 => self.f64,
            ElemType::C32 | ElemType::C64 => false,
        }
    }

    /// Decide whether a stack can use the MNK kernel family.
    ///
    /// `def_mnk` is true when the stack is homogeneous in (m, n, k) so a
    /// specialized kernel may be used at all. Every dimension must lie in
    /// `1..=max_kernel_dim`.
    #[allow(clippy::too_many_arguments)]
    pub fn is_suitable(
        &self,
        def_mnk: bool,
        ty: ElemType,
        stack_size: i32,
        m_max: i32,
        n_max: i32,
        k_max: i32,
        max_kernel_dim: i32,
    ) -> bool {
        let dims_ok = [m_max, n_max, k_max]
            .iter()
            .all(|&d| 0 < d && d <= max_kernel_dim);
        def_mnk && self.allows(ty) && stack_size > 0 && dims_ok
    }
}

/// [`SupportedTypes::is_suitable`] with the types enabled at build time.
#[allow(clippy::too_many_arguments)]
pub fn is_suitable(
    def_mnk: bool,
    ty: ElemType,
    stack_size: i32,
    m_max: i32,
    n_max: i32,
    k_max: i32,
    max_kernel_dim: i32,
) -> bool {
    SupportedTypes::default().is_suitable(def_mnk, ty, stack_size, m_max, n_max, k_max, max_kernel_dim)
}
