//! Pipeline stages of a file-to-SQL conversion.
//!
//! Each submodule implements exactly one step of the job lifecycle.
//! [`crate::convert`] sequences them; none of them holds state between calls.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ chunk ──▶ upload ──▶ poll ──▶ retrieve
//! (path)   (blocks)  (parts)   (status)  (SQL stream)
//! ```
//!
//! 1. [`input`]    — check and open the local source file
//! 2. [`chunk`]    — read the file in fixed-size blocks, one at a time
//! 3. [`upload`]   — send each block as a numbered part, strictly in order
//! 4. [`poll`]     — re-read the job status with backoff and a soft deadline
//! 5. [`retrieve`] — stream the generated SQL from the result location

pub mod chunk;
pub mod input;
pub mod poll;
pub mod retrieve;
pub mod upload;
