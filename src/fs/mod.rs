//! Filesystem utilities for jobgate.
//!
//! Completion markers are written through `atomic_write` so a reader never
//! observes a half-written record.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file};

/// Turn an arbitrary name into a single, portable file name component.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`; an empty result or one
/// made only of dots becomes `_`.
pub fn safe_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        stem
    }
}
