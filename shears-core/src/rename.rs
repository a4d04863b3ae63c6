//! Import/export renaming
//!
//! Applies a rename mapping to the names crossing the module boundary:
//! property keys of the `wasmImports` object and the names read through
//! `wasmExports[...]`. Used when the binary module's import and export names
//! were shortened after the glue was generated.

use std::collections::BTreeMap;

use crate::patterns::{imports_properties_mut, property_key_name, WASM_EXPORTS};
use crate::walk::full;
use crate::{build, Node};

fn rename_key(key: &mut Node, mapping: &BTreeMap<String, String>) -> bool {
    let Some(new_name) = property_key_name(key).and_then(|old| mapping.get(old)) else {
        return false;
    };
    *key = build::str_lit(new_name);
    true
}

fn rename_export_use(node: &mut Node, mapping: &BTreeMap<String, String>) -> bool {
    let Node::MemberExpression {
        object,
        property,
        computed,
        ..
    } = node
    else {
        return false;
    };
    if !object.is_identifier(WASM_EXPORTS) {
        return false;
    }
    let old = if *computed {
        property.string_literal()
    } else {
        property.identifier_name()
    };
    let Some(new_name) = old.and_then(|old| mapping.get(old)) else {
        return false;
    };
    **property = build::str_lit(new_name);
    *computed = true;
    true
}

/// Rename import keys and export accessors found in `mapping`
///
/// Returns the number of names changed.
pub fn apply_import_export_name_changes(
    program: &mut Node,
    mapping: &BTreeMap<String, String>,
) -> usize {
    if mapping.is_empty() {
        return 0;
    }
    let mut renamed = 0;
    full(program, &mut |node| {
        if let Some(properties) = imports_properties_mut(node) {
            for property in properties.iter_mut() {
                if let Node::Property {
                    key,
                    computed: false,
                    ..
                } = property
                {
                    if rename_key(key, mapping) {
                        renamed += 1;
                    }
                }
            }
        } else if rename_export_use(node, mapping) {
            renamed += 1;
        }
    });
    renamed
}
