//! Map applications that can run on an mrt worker.
//!
//! Each workload is a pure function from a segment payload (plus an
//! auxiliary argument) to keyed counts. Workers pick one by name on the
//! command line; the coordinator never needs to know which one is in use.

use common::Workload;

pub mod keyword;
pub mod word_count;

/// Resolve a workload by its registered name.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "wc" => Some(Workload {
            map_fn: word_count::map,
        }),
        "keyword" => Some(Workload {
            map_fn: keyword::map,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_workloads() {
        assert!(try_named("wc").is_some());
        assert!(try_named("keyword").is_some());
        assert!(try_named("sort").is_none());
    }
}
