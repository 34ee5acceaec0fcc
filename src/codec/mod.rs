//! Text format for tuning records.
//!
//! One record per line, fields as `name=value` separated by spaces:
//!
//! ```text
//! type=3 m=4 n=4 k=4 device=gfx90a s=30000 bs=8 bm=4 bn=4 bk=1 ws=16 wg=0 lu=1 nz=0 al=0 tb=0 tc=0 ap=0 aa=0 ab=0 ac=0 nexec=12 gflops=41.250
//! ```
//!
//! The same line can be handed in through `LIBSMM_SMM_PARAMS` to force a
//! configuration.

pub mod fields;
pub mod parser;
pub mod writer;

pub use parser::{parse_smm_line, parse_smm_line_with, parse_trans_line, ParsedSmm, ParsedTrans};
pub use writer::{write_smm_header, write_smm_params, write_trans_params, FieldStyle, WriteOptions};
