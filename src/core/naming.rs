//! Derivation of names for clones the engine creates on its own.

use super::registry::MenuReferenceRegistry;

/// Derives a clone name from the parent instance (or toplevel) name and the
/// master being cloned: `parent + "." + child`, with the child's dots turned
/// into `#` so the result stays one path component. While any registry
/// record holds the name, `#2`, `#3`, ... is appended.
pub fn derive_clone_name(registry: &MenuReferenceRegistry, parent: &str, child: &str) -> String {
    let mangled = child.replace('.', "#");
    let base = if parent.ends_with('.') {
        format!("{parent}{mangled}")
    } else {
        format!("{parent}.{mangled}")
    };
    if !registry.contains(&base) {
        return base;
    }
    (2u32..)
        .map(|suffix| format!("{base}#{suffix}"))
        .find(|candidate| !registry.contains(candidate))
        .unwrap_or(base)
}
