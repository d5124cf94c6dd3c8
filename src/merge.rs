use serde_yaml::{Mapping, Value};

/// Merge `overlay` into `base`, key by key.
///
/// Two mappings under the same key are merged recursively; for any other
/// pair the overlay value replaces the base value in its slot. Keys already
/// in `base` keep their position and new keys are appended in overlay order,
/// so merging `--set` tokens one at a time preserves the order they were given.
pub fn deep_merge(mut base: Mapping, overlay: Mapping) -> Mapping {
    for (key, overlay_val) in overlay {
        let Some(slot) = base.get_mut(&key) else {
            base.insert(key, overlay_val);
            continue;
        };
        match (slot, overlay_val) {
            (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
                let merged = deep_merge(std::mem::take(base_map), overlay_map);
                *base_map = merged;
            }
            (slot, overlay_val) => *slot = overlay_val,
        }
    }
    base
}
