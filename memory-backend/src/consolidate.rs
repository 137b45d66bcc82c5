//! Consolidation candidates: memories sharing a tag

use std::collections::BTreeMap;

use crate::memory::MemoryStore;

/// Tag → store-relative paths of every memory carrying it. Only tags shared by
/// more than one memory are kept. Tags iterate in lexicographic order, members
/// in scan order.
pub fn suggest_groups(store: &MemoryStore) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for doc in store.scan() {
        for tag in doc.metadata.tags() {
            let members = groups.entry(tag).or_default();
            if !members.contains(&doc.rel_path) {
                members.push(doc.rel_path.clone());
            }
        }
    }

    groups.retain(|_, members| members.len() > 1);
    log::debug!("[CONSOLIDATE] {} tag group(s) with shared memories", groups.len());
    groups
}
