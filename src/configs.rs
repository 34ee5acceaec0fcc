//! Kernel configurations stored per identity key.
//!
//! A configuration holds the tuned parameters plus the slot(s) for the compiled
//! kernel. Kernel slots bind once: a configuration restored from a parameter
//! buffer is inserted unbound and its kernels are attached on first use.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{TuneError, TuneResult};
use crate::kernel_types::{BoundKernel, KernelVariant, VariantPolicy};

/// Declares a named set of integer tuning parameters together with the
/// canonical field order used by the codec.
macro_rules! tuning_params {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* $field:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: i32, )+
        }

        impl $name {
            /// Field names in canonical order.
            pub const NAMES: &'static [&'static str] = &[$(stringify!($field)),+];

            /// Values in canonical order.
            pub fn values(&self) -> Vec<i32> {
                vec![$(self.$field),+]
            }

            pub fn get(&self, name: &str) -> Option<i32> {
                $(if name == stringify!($field) {
                    return Some(self.$field);
                })+
                None
            }

            /// Set a parameter by name; returns false for unknown names.
            pub fn set(&mut self, name: &str, value: i32) -> bool {
                $(if name == stringify!($field) {
                    self.$field = value;
                    return true;
                })+
                false
            }
        }
    };
}

tuning_params! {
    /// Tuned (or pre-tuned) SMM kernel parameters. Zero selects the kernel's
    /// built-in default for that parameter.
    pub struct SmmParams {
        /// Stack size the parameters were tuned for.
        s,
        /// Intra-kernel batch size (stack entries per work item).
        bs,
        /// Block size along M.
        bm,
        /// Block size along N.
        bn,
        /// Block size along K.
        bk,
        /// Minimum work-group size.
        ws,
        /// Work-group size rounding mode.
        wg,
        /// Loop unroll factor.
        lu,
        /// Skip zero blocks.
        nz,
        /// Algorithm variant.
        al,
        /// Transposed B in local memory.
        tb,
        /// Transposed C in local memory.
        tc,
        /// Atomic update policy for C.
        ap,
        /// Access/accumulation mode for A.
        aa,
        /// Access/accumulation mode for B.
        ab,
        /// Access/accumulation mode for C.
        ac,
    }
}

/// SMM configuration: parameters plus primary and alternate kernel slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmmConfig {
    pub params: SmmParams,
    kernels: [OnceLock<BoundKernel>; 2],
}

impl SmmConfig {
    pub fn new(params: SmmParams) -> Self {
        Self {
            params,
            kernels: Default::default(),
        }
    }

    /// Attach a compiled kernel to one slot. Each slot binds at most once.
    pub fn bind_kernel(&self, variant: KernelVariant, kernel: BoundKernel) -> TuneResult<()> {
        self.kernels[variant.index()]
            .set(kernel)
            .map_err(|_| TuneError::KernelAlreadyBound(variant))
    }

    pub fn kernel(&self, variant: KernelVariant) -> Option<BoundKernel> {
        self.kernels[variant.index()].get().copied()
    }

    /// Work-group size of a bound slot (0 if unbound).
    pub fn wgsize(&self, variant: KernelVariant) -> usize {
        self.kernel(variant).map(|k| k.wgsize).unwrap_or(0)
    }

    /// Pick the kernel to launch for a stack. An alternate choice falls back
    /// to the primary slot when no alternate kernel is bound.
    pub fn select_kernel(
        &self,
        policy: VariantPolicy,
        stack_size: usize,
    ) -> Option<(KernelVariant, BoundKernel)> {
        let wanted = policy.choose(stack_size, self.params.bs);
        if let Some(kernel) = self.kernel(wanted) {
            return Some((wanted, kernel));
        }
        self.kernel(KernelVariant::Primary)
            .map(|k| (KernelVariant::Primary, k))
    }
}

/// Transpose configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransConfig {
    /// Requested work-group size (0 = device default).
    pub wgsize: usize,
    kernel: OnceLock<BoundKernel>,
}

impl TransConfig {
    pub fn new(wgsize: usize) -> Self {
        Self {
            wgsize,
            kernel: OnceLock::new(),
        }
    }

    pub fn bind_kernel(&self, kernel: BoundKernel) -> TuneResult<()> {
        self.kernel
            .set(kernel)
            .map_err(|_| TuneError::KernelAlreadyBound(KernelVariant::Primary))
    }

    pub fn kernel(&self) -> Option<BoundKernel> {
        self.kernel.get().copied()
    }
}
