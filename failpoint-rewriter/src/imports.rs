//! Figures out which local identifiers, in a given source file, refer
//! to the `failpoint` marker functions — either because the file
//! imports them directly (`use failpoint::Inject;`) or imports the
//! crate itself and calls them qualified (`failpoint::Inject(...)`,
//! or `fp::Inject(...)` after `use failpoint as fp;`).

use std::collections::{HashMap, HashSet};

use syn::{File, Item, UseTree};

pub(crate) const MARKER_NAMES: &[&str] = &[
    "Inject",
    "InjectContext",
    "InjectCall",
    "Label",
    "Goto",
    "Fallthrough",
    "break",
    "continue",
    "return",
];

/// What a file's imports tell us about resolving marker calls.
#[derive(Default)]
pub(crate) struct ImportMap {
    /// Local identifiers that refer to the `failpoint` crate/module
    /// itself, so `ident::Name(...)` is a marker call if `Name` is
    /// recognized.
    module_aliases: HashSet<String>,
    /// Local identifier -> canonical marker name, for markers
    /// imported directly (possibly renamed via `as`).
    direct: HashMap<String, String>,
}

impl ImportMap {
    pub(crate) fn build(file: &File) -> ImportMap {
        let mut map = ImportMap::default();
        // `failpoint` is a crate name, so `failpoint::Name(...)` resolves
        // as a path root even without an explicit `use failpoint;` —
        // true of any 2018+-edition extern crate name.
        map.module_aliases.insert("failpoint".to_string());
        for item in &file.items {
            if let Item::Use(use_item) = item {
                walk_tree(&use_item.tree, &mut Vec::new(), &mut map);
            }
        }
        map
    }

    /// Resolves a one- or two-segment call path to a canonical marker
    /// name (`"Inject"`, `"break"`, ...), if it refers to one.
    pub(crate) fn resolve(&self, segments: &[String]) -> Option<&'static str> {
        let canon = |name: &str| MARKER_NAMES.iter().find(|m| **m == name).copied();
        match segments {
            [single] => {
                let target = self.direct.get(single).map(String::as_str).unwrap_or(single);
                canon(target)
            }
            [module, name] if self.module_aliases.contains(module) => canon(name),
            _ => None,
        }
    }
}

fn walk_tree(tree: &UseTree, prefix: &mut Vec<String>, map: &mut ImportMap) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            walk_tree(&path.tree, prefix, map);
            prefix.pop();
        }
        UseTree::Name(name) => {
            let ident = name.ident.to_string();
            if prefix.last().map(String::as_str) == Some("failpoint") {
                map.direct.insert(ident.clone(), ident);
            } else if ident == "failpoint" {
                map.module_aliases.insert(ident);
            }
        }
        UseTree::Rename(rename) => {
            let local = rename.rename.to_string();
            let original = rename.ident.to_string();
            if prefix.last().map(String::as_str) == Some("failpoint") {
                map.direct.insert(local, original);
            } else if original == "failpoint" {
                map.module_aliases.insert(local);
            }
        }
        UseTree::Glob(_) => {
            if prefix.last().map(String::as_str) == Some("failpoint") {
                for name in MARKER_NAMES {
                    map.direct.insert((*name).to_string(), (*name).to_string());
                }
            }
        }
        UseTree::Group(group) => {
            for item in &group.items {
                walk_tree(item, prefix, map);
            }
        }
    }
}
