use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use jellyfish_core::NodeId;

pub(crate) fn calculate_hash<T: Hash>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}

/// Picks one of `choices` by `hash`, or `None` if there is no choice.
pub(crate) fn pick(choices: &[NodeId], hash: u64) -> Option<NodeId> {
    (!choices.is_empty()).then(|| choices[hash as usize % choices.len()])
}
