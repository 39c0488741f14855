//! Insert, erase, and value-change planning.
//!
//! An update runs in three phases per depth, top-down:
//! 1. [`requests`]: collect what each touched node must become
//! 2. [`plan`]: compile requests into explicit operations with final
//!    reference counts
//! 3. [`apply`]: execute the operations, collecting requests for the depth
//!    below

pub mod apply;
pub mod plan;
pub mod requests;

use crate::store::NodeStore;
use crate::value::{KeyPart, Value};

use plan::UpdatePlan;
use requests::UpdateRequests;

/// Runs `requests` and everything they imply down to depth 1.
pub fn execute<K: KeyPart, V: Value>(store: &mut NodeStore<K, V>, requests: UpdateRequests<K, V>) {
    let mut pending = Some(requests);
    while let Some(requests) = pending.take() {
        let plan = UpdatePlan::compile(requests, store);
        pending = plan.apply(store);
    }
}
