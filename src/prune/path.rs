//! Bidirectional mapping between modules and their dotted tree paths.
//!
//! Pure lookups with no side effects. Paths are stable only as long as the
//! module tree is not restructured between resolution calls.

use crate::nn::Module;

/// Identity of a module reference, independent of its vtable.
fn data_ptr(module: &dyn Module) -> *const () {
    (module as *const dyn Module).cast::<()>()
}

/// Resolve the dotted path of `module` inside `model`.
///
/// Depth-first search in child declaration order; the terminal component is
/// compared by identity, not by value. Returns `None` if the module is not
/// reachable from the root. The root itself has no path.
#[must_use]
pub fn module_to_path(model: &dyn Module, module: &dyn Module) -> Option<String> {
    fn walk(node: &dyn Module, target: *const (), prefix: &str) -> Option<String> {
        for (name, child) in node.named_children() {
            let path = format!("{prefix}.{name}");
            if data_ptr(child) == target {
                return Some(path);
            }
            if let Some(found) = walk(child, target, &path) {
                return Some(found);
            }
        }
        None
    }

    walk(model, data_ptr(module), "")
        .map(|path| path.strip_prefix('.').unwrap_or(&path).to_string())
}

/// Resolve a dotted path to a module reference inside `model`.
///
/// Splits the path on `'.'` and walks child lookups component by component;
/// returns `None` if any component is absent.
#[must_use]
pub fn path_to_module<'a>(model: &'a dyn Module, path: &str) -> Option<&'a dyn Module> {
    let mut current = model;
    for name in path.split('.') {
        current = current.child(name)?;
    }
    Some(current)
}

/// Resolve a dotted path to a mutable module reference inside `model`.
#[must_use]
pub fn path_to_module_mut<'a>(
    model: &'a mut dyn Module,
    path: &str,
) -> Option<&'a mut dyn Module> {
    let mut current = model;
    for name in path.split('.') {
        current = current.child_mut(name)?;
    }
    Some(current)
}
