//! Changed element filtering
//!
//! Pure predicates over entries, evaluated on every pass. A parent that
//! fails its own test still shows when any descendant passes.

use crate::elements::EntryLookup;
use crate::types::{ChangedElementEntry, Opcode, TypeOfChange};
use indexmap::IndexMap;
use std::collections::HashSet;

/// What the user wants to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    /// Show inserted elements
    pub want_added: bool,
    /// Show deleted elements
    pub want_deleted: bool,
    /// Show modified elements
    pub want_modified: bool,
    /// Show unchanged tree nodes
    pub want_unchanged: bool,
    /// Apply `wanted_type_of_change` to modified elements
    pub want_type_of_change: bool,
    /// Type of change bits to keep
    pub wanted_type_of_change: TypeOfChange,
    /// Apply `wanted_properties` to property changes
    pub want_property_filtering: bool,
    /// Per-property visibility, in insertion order
    pub wanted_properties: IndexMap<String, bool>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        make_default_filter_options(std::iter::empty::<String>())
    }
}

/// Options that show everything, with every given property visible
pub fn make_default_filter_options<I, S>(property_names: I) -> FilterOptions
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    FilterOptions {
        want_added: true,
        want_deleted: true,
        want_modified: true,
        want_unchanged: true,
        want_type_of_change: true,
        wanted_type_of_change: TypeOfChange::all(),
        want_property_filtering: false,
        wanted_properties: property_names
            .into_iter()
            .map(|name| (name.into(), true))
            .collect(),
    }
}

/// Whether `options` would not hide anything
///
/// Property filtering hides properties missing from `wanted_properties`, so
/// options with it enabled are never the default, whatever the map holds.
pub fn is_default_filter_options(options: &FilterOptions) -> bool {
    options.want_added
        && options.want_deleted
        && options.want_modified
        && options.want_unchanged
        && options.wanted_type_of_change.is_all()
        && !options.want_property_filtering
        && options.wanted_properties.values().all(|visible| *visible)
}

/// Whether a modified entry passes the type of change and property filters
pub fn modified_entry_matches_filters(entry: &ChangedElementEntry, options: &FilterOptions) -> bool {
    if !options.want_type_of_change {
        return true;
    }

    // Indirect entries only show through their children
    if entry.indirect {
        return false;
    }

    if !options.wanted_type_of_change.intersects(entry.type_of_change) {
        return false;
    }

    if options.want_property_filtering
        && entry
            .type_of_change
            .intersects(TypeOfChange::PROPERTY | TypeOfChange::INDIRECT)
    {
        return entry
            .properties
            .keys()
            .any(|name| options.wanted_properties.get(name).copied().unwrap_or(false));
    }

    true
}

/// Whether an entry passes on its own merits
pub fn want_show_entry(entry: &ChangedElementEntry, options: &FilterOptions) -> bool {
    if entry.indirect && entry.children.is_empty() {
        return true;
    }

    match entry.opcode {
        Opcode::Insert => options.want_added,
        Opcode::Delete => options.want_deleted,
        Opcode::Update => options.want_modified && modified_entry_matches_filters(entry, options),
    }
}

/// Whether any descendant of `parent` passes
pub fn children_want_show(
    parent: &ChangedElementEntry,
    options: &FilterOptions,
    entries: &impl EntryLookup,
) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(parent.id.as_str());
    descendants_want_show(parent, options, entries, &mut visited)
}

fn descendants_want_show<'a>(
    parent: &'a ChangedElementEntry,
    options: &FilterOptions,
    entries: &'a impl EntryLookup,
    visited: &mut HashSet<&'a str>,
) -> bool {
    for child_id in &parent.children {
        if !visited.insert(child_id.as_str()) {
            continue;
        }
        let Some(child) = entries.lookup(child_id) else {
            continue;
        };
        if want_show_entry(child, options) || descendants_want_show(child, options, entries, visited)
        {
            return true;
        }
    }
    false
}

/// A row of the comparison tree. Unchanged nodes carry no opcode.
#[derive(Debug, Clone, Copy)]
pub struct TreeNode<'a> {
    /// Change kind, `None` for unchanged elements
    pub opcode: Option<Opcode>,
    /// Changed element backing the row
    pub entry: Option<&'a ChangedElementEntry>,
}

/// Whether a tree row should render
pub fn want_show_node(node: &TreeNode<'_>, options: &FilterOptions, entries: &impl EntryLookup) -> bool {
    match (node.opcode, node.entry) {
        (Some(_), Some(entry)) => {
            want_show_entry(entry, options) || children_want_show(entry, options, entries)
        }
        _ => options.want_unchanged,
    }
}

/// IDs of the entries to display, or `None` when nothing is filtered
pub fn filter_entries<'a>(
    candidates: impl IntoIterator<Item = &'a ChangedElementEntry>,
    options: &FilterOptions,
    entries: &impl EntryLookup,
) -> Option<Vec<String>> {
    if is_default_filter_options(options) {
        return None;
    }

    Some(
        candidates
            .into_iter()
            .filter(|e| want_show_entry(e, options) || children_want_show(e, options, entries))
            .map(|e| e.id.clone())
            .collect(),
    )
}
