//! `@+id/` declarations in layouts, menus and other id-generating XML.

use std::collections::BTreeSet;

use super::MarkupEvent;
use crate::resource::{ResourceType, ResourceUrl};

/// Names of all ids declared with `@+id/name` in any attribute.
///
/// The result is sorted and free of duplicates, so two scans of the same
/// content compare equal.
pub fn collect_ids(events: &[MarkupEvent]) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for event in events {
        let MarkupEvent::Start { attributes, .. } = event else {
            continue;
        };
        for (_, value) in attributes {
            if !value.starts_with("@+") {
                continue;
            }
            if let Some(url) = ResourceUrl::parse(value) {
                if url.create && url.resource_type == ResourceType::Id && url.namespace.is_none() {
                    ids.insert(url.name);
                }
            }
        }
    }
    ids
}
