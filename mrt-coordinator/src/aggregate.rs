//! Order-independent merge of partial results into the final mapping.

use std::collections::HashMap;

use common::PartialResult;

/// Sums counts per key. The merge is commutative and associative, so the
/// final mapping does not depend on session completion order.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    totals: HashMap<String, u64>,
}

impl ResultAggregator {
    pub fn absorb(&mut self, partial: PartialResult) {
        for (key, count) in partial {
            *self.totals.entry(key).or_insert(0) += count;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn into_totals(self) -> HashMap<String, u64> {
        self.totals
    }
}
