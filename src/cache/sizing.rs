//! Size Estimation Module
//!
//! Approximates the memory footprint of cache entries for byte-budget
//! accounting. The primary path measures the serialized form of a value;
//! values that cannot be serialized (cyclic graphs) fall through to a
//! recursive walk that tracks the shared nodes currently on the recursion
//! path, so the estimate is finite and deterministic for any finite-depth
//! value graph.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::Value;

// == Constants ==
/// Fixed per-entry overhead for timestamp/TTL bookkeeping, in bytes.
pub const ENTRY_OVERHEAD: usize = 24;

/// Flat charge for a shared node already on the current recursion path.
pub const CIRCULAR_REF_COST: usize = 20;

/// Bracket/brace overhead per container in the fallback walk.
const CONTAINER_OVERHEAD: usize = 2;

/// Separator overhead per element or field in the fallback walk.
const SEPARATOR_OVERHEAD: usize = 2;

// == Entry Size ==
/// Estimates the total footprint of an entry: two bytes per key character,
/// the value's serialized size, and the fixed metadata overhead.
pub fn estimate_entry_size(key: &str, value: &Value) -> usize {
    2 * key.chars().count() + estimate_value_size(value) + ENTRY_OVERHEAD
}

// == Value Size ==
/// Estimates a value's footprint at two bytes per serialized character,
/// falling back to the recursive walk when serialization fails.
pub fn estimate_value_size(value: &Value) -> usize {
    match serde_json::to_string(value) {
        Ok(json) => 2 * json.chars().count(),
        Err(_) => {
            let mut on_path = HashSet::new();
            walk(value, &mut on_path)
        }
    }
}

// == Fallback Walk ==
/// Recursive estimator keyed by shared-node identity.
///
/// The visited set holds only the nodes on the current recursion path:
/// a diamond (the same node reached twice along different paths) is counted
/// each time it is reached, while a back-edge to a node still being sized
/// is charged `CIRCULAR_REF_COST` instead of recursed into.
fn walk(value: &Value, on_path: &mut HashSet<usize>) -> usize {
    match value {
        Value::Null => 2 * 4,
        Value::Bool(b) => 2 * if *b { 4 } else { 5 },
        Value::Int(n) => 2 * n.to_string().chars().count(),
        Value::Float(x) => 2 * x.to_string().chars().count(),
        Value::Text(s) => 2 * (s.chars().count() + 2),
        Value::List(items) => {
            CONTAINER_OVERHEAD
                + items
                    .iter()
                    .map(|item| walk(item, on_path) + SEPARATOR_OVERHEAD)
                    .sum::<usize>()
        }
        Value::Map(fields) => {
            CONTAINER_OVERHEAD
                + fields
                    .iter()
                    .map(|(key, field)| {
                        2 * key.chars().count() + walk(field, on_path) + SEPARATOR_OVERHEAD
                    })
                    .sum::<usize>()
        }
        Value::Shared(node) => {
            let addr = Arc::as_ptr(node) as usize;
            if !on_path.insert(addr) {
                return CIRCULAR_REF_COST;
            }
            let guard = node.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            let size = walk(&guard, on_path);
            on_path.remove(&addr);
            size
        }
    }
}
