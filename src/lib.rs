//! Root crate: hosts cross-crate end-to-end tests only. See `tests/`.
