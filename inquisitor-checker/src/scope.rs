use std::collections::BTreeMap;

use crate::types::Type;

/// Handle to a scope record inside a [`Scopes`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct ScopeRecord {
    bindings: BTreeMap<String, Type>,
    parent: Option<ScopeId>,
}

/// Arena of lexical scopes. Index 0 is the outermost scope.
#[derive(Debug)]
pub struct Scopes {
    records: Vec<ScopeRecord>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            records: vec![ScopeRecord::default()],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn extend(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.records.len());
        self.records.push(ScopeRecord {
            bindings: BTreeMap::new(),
            parent: Some(parent),
        });
        id
    }

    /// Releases `scope` and every scope created after it.
    ///
    /// Child scopes only live as long as the block that opened them, so the
    /// arena behaves like a stack.
    pub fn discard(&mut self, scope: ScopeId) {
        if scope.0 > 0 && scope.0 < self.records.len() {
            self.records.truncate(scope.0);
        }
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Type> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let record = self.records.get(id.0)?;
            if let Some(ty) = record.bindings.get(name) {
                return Some(ty);
            }
            current = record.parent;
        }
        None
    }

    pub fn contains(&self, scope: ScopeId, name: &str) -> bool {
        self.lookup(scope, name).is_some()
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Type> {
        self.records
            .get(scope.0)
            .and_then(|record| record.bindings.get(name))
    }

    /// Binds `name` in `scope` only, shadowing any ancestor binding.
    pub fn add(&mut self, scope: ScopeId, name: impl Into<String>, ty: Type) {
        if let Some(record) = self.records.get_mut(scope.0) {
            record.bindings.insert(name.into(), ty);
        }
    }

    pub fn bindings(&self, scope: ScopeId) -> impl Iterator<Item = (&String, &Type)> {
        self.records
            .get(scope.0)
            .into_iter()
            .flat_map(|record| record.bindings.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents_and_add_shadows_locally() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.add(root, "x", Type::int());

        let child = scopes.extend(root);
        assert_eq!(scopes.lookup(child, "x"), Some(&Type::int()));
        assert!(scopes.lookup_local(child, "x").is_none());

        scopes.add(child, "x", Type::str());
        assert_eq!(scopes.lookup(child, "x"), Some(&Type::str()));
        assert_eq!(scopes.lookup(root, "x"), Some(&Type::int()));
    }

    #[test]
    fn none_binding_is_distinct_from_missing() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.add(root, "nothing", Type::none());

        assert!(scopes.contains(root, "nothing"));
        assert!(!scopes.contains(root, "missing"));
        assert_eq!(scopes.lookup(root, "nothing"), Some(&Type::none()));
    }

    #[test]
    fn discard_releases_child_scopes_but_never_the_root() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        let child = scopes.extend(root);
        let grandchild = scopes.extend(child);
        scopes.add(grandchild, "y", Type::float());

        scopes.discard(child);
        scopes.discard(root);
        assert!(scopes.lookup(grandchild, "y").is_none());

        scopes.add(root, "z", Type::bool());
        assert_eq!(scopes.bindings(root).count(), 1);
    }
}
