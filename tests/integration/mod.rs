//! Integration tests for atomic batch execution.
//!
//! Each module drives [`jsonapi_atomic::AtomicOperations`] end to end, either
//! over plain in-memory storage or through the recording backend in
//! `common::recording` when the shape of the transaction chain matters.

pub mod batch_results;
pub mod concurrency;
pub mod failures;
