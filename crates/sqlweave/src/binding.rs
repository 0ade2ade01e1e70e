//! Binding registry: the ordered placeholder → value map of one statement.
//!
//! Placeholder names are generated, never chosen by the caller. A requested
//! base name is sanitized to a legal identifier and, when already taken,
//! suffixed with a per-registry counter (`status`, `status_1`, `status_2`...).
//! Bindings iterate in insertion order, which is the order placeholders appear
//! in the emitted SQL.

use crate::value::{TypeHint, Value};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One `(placeholder, value)` pair sent alongside the statement text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    name: String,
    value: Value,
    type_hint: TypeHint,
}

impl Binding {
    /// Create a binding; the type hint is derived from the value.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        let type_hint = value.type_hint();
        Self {
            name: name.into(),
            value,
            type_hint,
        }
    }

    /// Placeholder name without the leading `:`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn type_hint(&self) -> TypeHint {
        self.type_hint
    }

    /// Placeholder as it appears in statement text (`:name`).
    pub fn placeholder(&self) -> String {
        format!(":{}", self.name)
    }
}

/// Ordered, collision-free set of bindings for one compiled statement.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    prefix: String,
    entries: Vec<Binding>,
    taken: HashSet<String>,
    counters: HashMap<String, usize>,
    scopes: usize,
}

impl Bindings {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry whose generated names all start with `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Open a child registry for a nested statement.
    ///
    /// Every child gets a prefix unique within this registry (`s1_`, `s2_`, and
    /// `s1_s1_` for a grandchild), so merging it back never renames anything.
    pub fn scoped(&mut self) -> Bindings {
        self.scopes += 1;
        Bindings::with_prefix(format!("{}s{}_", self.prefix, self.scopes))
    }

    /// Register `value` under a name derived from `base_name` and return that name.
    pub fn make_and_set(&mut self, base_name: &str, value: Value) -> String {
        let base = format!("{}{}", self.prefix, sanitize(base_name));
        let name = self.unique_name(base);
        self.insert(name.clone(), value);
        name
    }

    /// Copy every binding of `other` into this registry, in order.
    ///
    /// Names are preserved unless they collide; a colliding binding is renamed
    /// and `(old, new)` is returned so the caller can patch the embedded SQL.
    pub fn add_from(&mut self, other: &Bindings) -> Vec<(String, String)> {
        let mut renames = Vec::new();
        for binding in &other.entries {
            let name = if self.taken.contains(&binding.name) {
                let renamed = self.unique_name(binding.name.clone());
                renames.push((binding.name.clone(), renamed.clone()));
                renamed
            } else {
                binding.name.clone()
            };
            self.insert(name, binding.value.clone());
        }
        renames
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Bindings in placeholder order.
    pub fn iter(&self) -> std::slice::Iter<'_, Binding> {
        self.entries.iter()
    }

    /// Look up a binding by placeholder name.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.iter().find(|b| b.name == name)
    }

    pub fn into_vec(self) -> Vec<Binding> {
        self.entries
    }

    fn unique_name(&mut self, base: String) -> String {
        if !self.taken.contains(&base) {
            return base;
        }
        let counter = self.counters.entry(base.clone()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{base}_{counter}");
            if !self.taken.contains(&candidate) {
                return candidate;
            }
        }
    }

    fn insert(&mut self, name: String, value: Value) {
        self.taken.insert(name.clone());
        self.entries.push(Binding::new(name, value));
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Turn an arbitrary field expression into a placeholder-safe identifier.
///
/// `u.name` → `u_name`, `COUNT(*)` → `count`, `2fa` → `p2fa`.
pub(crate) fn sanitize(base: &str) -> String {
    let mut out = String::with_capacity(base.len());
    let mut last_underscore = true;
    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    match out.chars().next() {
        None => "p".to_string(),
        Some(c) if c.is_ascii_digit() => format!("p{out}"),
        Some(_) => out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("u.name"), "u_name");
        assert_eq!(sanitize("COUNT(*)"), "count");
        assert_eq!(sanitize("2fa"), "p2fa");
        assert_eq!(sanitize("***"), "p");
        assert_eq!(sanitize("LOWER(u.email)"), "lower_u_email");
    }

    #[test]
    fn test_make_and_set_disambiguates() {
        let mut b = Bindings::new();
        assert_eq!(b.make_and_set("status", Value::from("a")), "status");
        assert_eq!(b.make_and_set("status", Value::from("b")), "status_1");
        assert_eq!(b.make_and_set("status", Value::from("c")), "status_2");
        let names: Vec<&str> = b.iter().map(Binding::name).collect();
        assert_eq!(names, vec!["status", "status_1", "status_2"]);
    }

    #[test]
    fn test_counter_skips_names_taken_verbatim() {
        let mut b = Bindings::new();
        b.make_and_set("id_1", Value::Int(1));
        b.make_and_set("id", Value::Int(2));
        assert_eq!(b.make_and_set("id", Value::Int(3)), "id_2");
    }

    #[test]
    fn test_scoped_prefixes_are_unique() {
        let mut parent = Bindings::new();
        let mut first = parent.scoped();
        let second = parent.scoped();
        assert_eq!(first.make_and_set("id", Value::Int(1)), "s1_id");
        assert_eq!(second.prefix, "s2_");
        let grandchild = first.scoped();
        assert_eq!(grandchild.prefix, "s1_s1_");
    }

    #[test]
    fn test_add_from_preserves_order_and_renames_collisions() {
        let mut child = Bindings::new();
        child.make_and_set("id", Value::Int(1));
        child.make_and_set("name", Value::from("x"));

        let mut parent = Bindings::new();
        parent.make_and_set("id", Value::Int(9));
        let renames = parent.add_from(&child);

        assert_eq!(renames, vec![("id".to_string(), "id_1".to_string())]);
        let names: Vec<&str> = parent.iter().map(Binding::name).collect();
        assert_eq!(names, vec!["id", "id_1", "name"]);
        assert_eq!(parent.get("id_1").map(Binding::value), Some(&Value::Int(1)));
    }

    #[test]
    fn test_binding_type_hint() {
        let b = Binding::new("flag", Value::Bool(true));
        assert_eq!(b.type_hint(), TypeHint::Bool);
        assert_eq!(b.placeholder(), ":flag");
    }
}
