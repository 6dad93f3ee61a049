//! Shared pieces of the mrt cluster: the framed wire protocol spoken
//! between the coordinator and its workers, the error taxonomy for a
//! single exchange, and the map-function types that workloads implement.
//!
//! The input lives on the coordinator's filesystem and is shipped to
//! workers segment by segment, so there is no shared storage layer.

use std::collections::HashMap;

pub mod codec;
pub mod error;

/////////////////////////////////////////////////////////////////////////////
// Map application types
/////////////////////////////////////////////////////////////////////////////

/// Keyed counts produced by one map invocation over one segment.
pub type PartialResult = HashMap<String, u64>;

/// A map function takes a segment payload and an auxiliary argument
/// (workload-specific, e.g. the keyword to filter on) and returns the
/// partial counts for that segment.
pub type MapFn = fn(payload: &str, aux: &str) -> PartialResult;

/// A map application, resolvable by name on the worker side.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
}
