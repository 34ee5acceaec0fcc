//! Matrix dump for inspecting kernel inputs and results.
//!
//! Only compiled into debug builds or with the `debug-print` feature.

use std::io::Write;

use crate::error::{TuneError, TuneResult};
use crate::kernel_types::ElemType;

fn read_f32(bytes: &[u8]) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    f32::from_ne_bytes(raw)
}

fn read_f64(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    f64::from_ne_bytes(raw)
}

fn format_elem(ty: ElemType, elem: &[u8]) -> String {
    match ty {
        ElemType::F32 => format!("{:.6}", read_f32(elem)),
        ElemType::F64 => format!("{:.6}", read_f64(elem)),
        ElemType::C32 => format!("({:.6},{:.6})", read_f32(elem), read_f32(&elem[4..])),
        ElemType::C64 => format!("({:.6},{:.6})", read_f64(elem), read_f64(&elem[8..])),
    }
}

/// Print the row-major `m x n` matrix held in `data` (native byte order).
pub fn print_matrix<W: Write + ?Sized>(
    out: &mut W,
    label: &str,
    ty: ElemType,
    data: &[u8],
    m: usize,
    n: usize,
) -> TuneResult<()> {
    let size = ty.size_bytes();
    let too_large = || TuneError::InvalidConfig(format!("{label}: {m}x{n} {ty} matrix is too large"));
    let row_bytes = n.checked_mul(size).ok_or_else(too_large)?;
    let needed = m.checked_mul(row_bytes).ok_or_else(too_large)?;
    if data.len() < needed {
        return Err(TuneError::InvalidConfig(format!(
            "{label}: buffer holds {} bytes, {m}x{n} {ty} needs {needed}",
            data.len()
        )));
    }
    let mut text = format!("{label} ({m}x{n} {ty})\n");
    for row in data.chunks_exact(row_bytes.max(size)).take(m) {
        let cells: Vec<String> = row.chunks_exact(size).map(|e| format_elem(ty, e)).collect();
        text.push_str(&cells.join(" "));
        text.push('\n');
    }
    out.write_all(text.as_bytes()).map_err(TuneError::StreamWrite)
}
