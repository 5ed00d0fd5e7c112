//! Leaf traversal over JSON document trees.
//!
//! Every leaf is visited exactly once, depth-first. Object members are visited
//! in the map's iteration order and array elements in index order. A leaf is a
//! scalar or an empty array/object; non-empty containers are never handed to
//! the visitor.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// One step into a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object member name.
    Key(String),
    /// Array index.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Location of a leaf inside a tree. Displays dot-joined (`a.b.0.c`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        Path(segments.into_iter().collect())
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// RFC 6901 JSON pointer for this path.
    pub fn to_pointer(&self) -> String {
        self.0
            .iter()
            .map(|segment| match segment {
                Segment::Key(key) => format!("/{}", key.replace('~', "~0").replace('/', "~1")),
                Segment::Index(index) => format!("/{}", index),
            })
            .collect()
    }

    fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A leaf visited by [`fold`].
#[derive(Debug, Clone, Copy)]
pub struct Leaf<'a> {
    value: &'a Value,
    path: &'a Path,
}

impl<'a> Leaf<'a> {
    /// The leaf value.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// The leaf value if it is a string.
    pub fn as_str(&self) -> Option<&'a str> {
        self.value.as_str()
    }

    /// Where the leaf sits in the tree.
    pub fn path(&self) -> &'a Path {
        self.path
    }
}

/// A leaf visited by [`fold_mut`], which may be replaced in place.
#[derive(Debug)]
pub struct LeafMut<'a> {
    value: &'a mut Value,
    path: &'a Path,
}

impl<'a> LeafMut<'a> {
    /// The leaf value.
    pub fn value(&self) -> &Value {
        &*self.value
    }

    /// The leaf value if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Where the leaf sits in the tree.
    pub fn path(&self) -> &'a Path {
        self.path
    }

    /// Replace the leaf, returning the previous value.
    pub fn replace(&mut self, value: impl Into<Value>) -> Value {
        std::mem::replace(self.value, value.into())
    }
}

/// Fold over every leaf without modifying the tree.
pub fn fold<A, F>(tree: &Value, init: A, mut visit: F) -> A
where
    F: FnMut(A, Leaf<'_>) -> A,
{
    let mut path = Path::root();
    fold_node(tree, &mut path, init, &mut visit)
}

fn fold_node<A, F>(node: &Value, path: &mut Path, mut acc: A, visit: &mut F) -> A
where
    F: FnMut(A, Leaf<'_>) -> A,
{
    match node {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                path.push(Segment::Key(key.clone()));
                acc = fold_node(child, path, acc, visit);
                path.pop();
            }
            acc
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                path.push(Segment::Index(index));
                acc = fold_node(child, path, acc, visit);
                path.pop();
            }
            acc
        }
        _ => visit(acc, Leaf { value: node, path }),
    }
}

/// Fold over every leaf, letting the visitor replace leaves as it goes.
pub fn fold_mut<A, F>(tree: &mut Value, init: A, mut visit: F) -> A
where
    F: FnMut(A, LeafMut<'_>) -> A,
{
    let mut path = Path::root();
    fold_node_mut(tree, &mut path, init, &mut visit)
}

fn fold_node_mut<A, F>(node: &mut Value, path: &mut Path, mut acc: A, visit: &mut F) -> A
where
    F: FnMut(A, LeafMut<'_>) -> A,
{
    match node {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map.iter_mut() {
                path.push(Segment::Key(key.clone()));
                acc = fold_node_mut(child, path, acc, visit);
                path.pop();
            }
            acc
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter_mut().enumerate() {
                path.push(Segment::Index(index));
                acc = fold_node_mut(child, path, acc, visit);
                path.pop();
            }
            acc
        }
        _ => visit(acc, LeafMut { value: node, path }),
    }
}

/// Overwrite the value at `path`. Returns `false` if the path does not resolve.
pub fn set_path(tree: &mut Value, path: &Path, value: impl Into<Value>) -> bool {
    match tree.pointer_mut(&path.to_pointer()) {
        Some(slot) => {
            *slot = value.into();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf_paths(tree: &Value) -> Vec<String> {
        fold(tree, Vec::new(), |mut acc, leaf| {
            acc.push(leaf.path().to_string());
            acc
        })
    }

    #[test]
    fn test_visits_leaves_only() {
        let tree = json!({ "a": { "b": "x", "c": [1, 2, { "d": null }] }, "e": true });
        assert_eq!(leaf_paths(&tree), vec!["a.b", "a.c.0", "a.c.1", "a.c.2.d", "e"]);
    }

    #[test]
    fn test_empty_containers_are_leaves() {
        let tree = json!({ "a": {}, "b": [] });
        assert_eq!(leaf_paths(&tree), vec!["a", "b"]);
    }

    #[test]
    fn test_scalar_root_is_a_leaf() {
        let tree = json!("hello");
        let visited = fold(&tree, Vec::new(), |mut acc, leaf| {
            acc.push((leaf.path().is_root(), leaf.as_str().map(str::to_string)));
            acc
        });
        assert_eq!(visited, vec![(true, Some("hello".to_string()))]);
    }

    #[test]
    fn test_fold_mut_replaces_in_place() {
        let mut tree = json!({ "a": ["x", "y"], "b": { "c": "z" } });
        let replaced = fold_mut(&mut tree, 0usize, |count, mut leaf| {
            if leaf.as_str() == Some("y") {
                let old = leaf.replace("Y");
                assert_eq!(old, json!("y"));
                count + 1
            } else {
                count
            }
        });
        assert_eq!(replaced, 1);
        assert_eq!(tree, json!({ "a": ["x", "Y"], "b": { "c": "z" } }));
    }

    #[test]
    fn test_deep_nesting() {
        let mut tree = json!("leaf");
        for i in 0..200 {
            tree = if i % 2 == 0 { json!([tree]) } else { json!({ "k": tree }) };
        }
        assert_eq!(leaf_paths(&tree).len(), 1);
    }

    #[test]
    fn test_path_display_and_pointer() {
        let path = Path::from_segments([
            Segment::Key("a/b".into()),
            Segment::Index(3),
            Segment::Key("c~d".into()),
        ]);
        assert_eq!(path.to_string(), "a/b.3.c~d");
        assert_eq!(path.to_pointer(), "/a~1b/3/c~0d");
        assert_eq!(Path::root().to_pointer(), "");
        assert_eq!(serde_json::to_value(&path).unwrap(), json!("a/b.3.c~d"));
    }

    #[test]
    fn test_set_path() {
        let mut tree = json!({ "a": { "b": ["x", "y"] }, "key.with.dots": "v" });
        let path = Path::from_segments([
            Segment::Key("a".into()),
            Segment::Key("b".into()),
            Segment::Index(1),
        ]);
        assert!(set_path(&mut tree, &path, "Y"));
        assert_eq!(tree["a"]["b"][1], json!("Y"));

        let dotted = Path::from_segments([Segment::Key("key.with.dots".into())]);
        assert!(set_path(&mut tree, &dotted, "w"));
        assert_eq!(tree["key.with.dots"], json!("w"));

        let missing = Path::from_segments([Segment::Key("nope".into()), Segment::Index(0)]);
        assert!(!set_path(&mut tree, &missing, "z"));
    }

    #[test]
    fn test_paths_from_fold_resolve_with_set_path() {
        let mut tree = json!({ "x": [{ "y": "1" }, "2"], "z": "3" });
        let paths = fold(&tree, Vec::new(), |mut acc, leaf| {
            acc.push(leaf.path().clone());
            acc
        });
        for path in &paths {
            assert!(set_path(&mut tree, path, path.to_string()));
        }
        assert_eq!(tree, json!({ "x": [{ "y": "x.0.y" }, "x.1"], "z": "z" }));
    }

    // Property-based tests
    use proptest::prelude::*;

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z:/]{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(4, 64, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..6)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Rewriting every leaf with its current value leaves the tree unchanged
        #[test]
        fn prop_identity_rewrite(tree in arb_json()) {
            let mut copy = tree.clone();
            fold_mut(&mut copy, (), |(), mut leaf| {
                let value = leaf.value().clone();
                leaf.replace(value);
            });
            prop_assert_eq!(copy, tree);
        }

        /// Every visited path points back at the visited value
        #[test]
        fn prop_paths_resolve(tree in arb_json()) {
            let leaves = fold(&tree, Vec::new(), |mut acc, leaf| {
                acc.push((leaf.path().to_pointer(), leaf.value().clone()));
                acc
            });
            for (pointer, value) in leaves {
                prop_assert_eq!(tree.pointer(&pointer), Some(&value));
            }
        }
    }
}
