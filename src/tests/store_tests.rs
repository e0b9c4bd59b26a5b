use crate::error::CoreError;
use crate::tree::{Attributes, ChildGrowth, NodeFlags, NodeKind, NodeRef, NodeStore, Span};
use cograph_common::Position;

fn store_with_growth(growth: ChildGrowth) -> NodeStore {
    let mut store = NodeStore::new(1 << 16);
    store.set_growth(growth);
    store
}

fn node(store: &mut NodeStore, kind: NodeKind, name: &str) -> NodeRef {
    let node = store.create(kind, Some(name), None, None).unwrap();
    store.assign_id(node).unwrap();
    node
}

fn names(store: &NodeStore, parent: NodeRef) -> Vec<String> {
    store
        .children(parent)
        .map(|child| store.name(child).unwrap_or("").to_string())
        .collect()
}

#[test]
fn test_create_zeroes_relationships() {
    let mut store = NodeStore::new(4096);
    let span = Span::new(Position::new(2, 4, 30), Position::new(2, 6, 32));
    let lit = store
        .create(NodeKind::Literal, Some("n"), Some("42"), Some(span))
        .unwrap();

    assert!(store.id(lit).is_none());
    assert!(store.parent_id(lit).is_none());
    assert_eq!(store.depth(lit), 0);
    assert_eq!(store.child_count(lit), 0);
    assert_eq!(store.flags(lit), NodeFlags::empty());
    assert_eq!(store.kind(lit), NodeKind::Literal);
    assert_eq!(store.name(lit), Some("n"));
    assert_eq!(store.value(lit), Some("42"));
    assert_eq!(store.span(lit), span);
    assert!(store.attributes(lit).is_empty());
    assert_eq!(lit.offset() % 8, 0);
}

#[test]
fn test_header_reads_match_accessors() {
    let mut store = NodeStore::new(4096);
    let parent = node(&mut store, NodeKind::Block, "body");
    let child = node(&mut store, NodeKind::Statement, "s");
    store.append_child(parent, child).unwrap();

    let header = store.header(child).unwrap();
    assert_eq!(header.kind, NodeKind::Statement);
    assert_eq!(header.id, store.id(child));
    assert_eq!(header.parent, store.id(parent));
    assert_eq!(header.depth, 1);
    assert_eq!(header.name, store.name_atom(child));

    let parent_header = store.header(parent).unwrap();
    assert_eq!(parent_header.child_count, 1);
    assert_eq!(parent_header.children.capacity, 1);
}

#[test]
fn test_append_sets_parent_and_depth() {
    let mut store = NodeStore::new(4096);
    let root = node(&mut store, NodeKind::Program, "root");
    let a = node(&mut store, NodeKind::Statement, "a");
    let b = node(&mut store, NodeKind::Statement, "b");

    assert_eq!(store.append_child(root, a).unwrap(), 0);
    assert_eq!(store.append_child(root, b).unwrap(), 1);

    assert_eq!(store.parent_id(a), store.id(root));
    assert_eq!(store.depth(a), 1);
    assert_eq!(store.depth(b), 1);
    assert_eq!(store.child(root, 0), Some(a));
    assert_eq!(store.child(root, 1), Some(b));
    assert_eq!(store.child(root, 2), None);
    assert_eq!(store.child_index(root, b), Some(1));
    assert_eq!(names(&store, root), vec!["a", "b"]);
}

#[test]
fn test_insert_child_is_positional_and_clamped() {
    let mut store = NodeStore::new(4096);
    let root = node(&mut store, NodeKind::Block, "root");
    for (name, index, expected) in [("b", 0, 0), ("d", 9, 1), ("a", 0, 0), ("c", 2, 2)] {
        let child = node(&mut store, NodeKind::Statement, name);
        assert_eq!(store.insert_child(root, index, child).unwrap(), expected);
    }
    assert_eq!(names(&store, root), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_remove_child_detaches() {
    let mut store = NodeStore::new(4096);
    let root = node(&mut store, NodeKind::Block, "root");
    let kids: Vec<NodeRef> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            let child = node(&mut store, NodeKind::Statement, name);
            store.append_child(root, child).unwrap();
            child
        })
        .collect();
    let grandchild = node(&mut store, NodeKind::Expression, "e");
    store.append_child(kids[1], grandchild).unwrap();

    assert_eq!(store.remove_child(root, kids[1]).unwrap(), 1);
    assert_eq!(names(&store, root), vec!["a", "c"]);
    assert!(store.parent_id(kids[1]).is_none());
    assert_eq!(store.depth(kids[1]), 0);
    assert_eq!(store.depth(grandchild), 1);
    assert_eq!(store.child(kids[1], 0), Some(grandchild));

    assert!(store.remove_child(root, kids[1]).is_err());
}

#[test]
fn test_insert_rejects_bad_links() {
    let mut store = NodeStore::new(4096);
    let anonymous = store.create(NodeKind::Block, None, None, None).unwrap();
    let root = node(&mut store, NodeKind::Block, "root");
    let child = node(&mut store, NodeKind::Statement, "child");
    let grandchild = node(&mut store, NodeKind::Expression, "grandchild");

    assert!(matches!(
        store.append_child(anonymous, child),
        Err(CoreError::InvalidOperation(_))
    ));

    store.append_child(root, child).unwrap();
    store.append_child(child, grandchild).unwrap();

    // Already attached.
    let other = node(&mut store, NodeKind::Block, "other");
    assert!(store.append_child(other, child).is_err());
    // Would create a cycle.
    assert!(store.append_child(grandchild, root).is_err());
    assert!(store.append_child(root, root).is_err());
    // Not a header.
    assert!(store.append_child(root, NodeRef(3)).is_err());

    assert_eq!(store.child_count(root), 1);
    assert_eq!(store.child_count(other), 0);
}

#[test]
fn test_attaching_subtree_relevels_descendants() {
    let mut store = NodeStore::new(4096);
    let root = node(&mut store, NodeKind::Program, "root");
    let block = node(&mut store, NodeKind::Block, "block");
    store.append_child(root, block).unwrap();

    let func = node(&mut store, NodeKind::Function, "f");
    let body = node(&mut store, NodeKind::Block, "body");
    let stmt = node(&mut store, NodeKind::Statement, "s");
    store.append_child(func, body).unwrap();
    store.append_child(body, stmt).unwrap();
    assert_eq!(store.depth(stmt), 2);

    store.append_child(block, func).unwrap();
    assert_eq!(store.depth(func), 2);
    assert_eq!(store.depth(body), 3);
    assert_eq!(store.depth(stmt), 4);
}

#[test]
fn test_exact_growth_allocates_one_slot_at_a_time() {
    let mut store = store_with_growth(ChildGrowth::Exact);
    let root = node(&mut store, NodeKind::Block, "root");
    for i in 0..3 {
        let child = node(&mut store, NodeKind::Statement, &i.to_string());
        store.append_child(root, child).unwrap();
    }
    assert_eq!(store.header(root).unwrap().children.capacity, 3);
    assert_eq!(names(&store, root), vec!["0", "1", "2"]);
}

#[test]
fn test_doubling_growth() {
    let mut store = store_with_growth(ChildGrowth::Doubling);
    let root = node(&mut store, NodeKind::Block, "root");
    let mut capacities = Vec::new();
    for i in 0..5 {
        let child = node(&mut store, NodeKind::Statement, &i.to_string());
        store.append_child(root, child).unwrap();
        capacities.push(store.header(root).unwrap().children.capacity);
    }
    assert_eq!(capacities, vec![1, 2, 4, 4, 8]);
    assert_eq!(names(&store, root), vec!["0", "1", "2", "3", "4"]);
}

#[test]
fn test_append_out_of_memory_leaves_parent_intact() {
    // Room for three headers and one single-slot child array, nothing more.
    let mut store = NodeStore::new(3 * 72 + 4);
    let root = node(&mut store, NodeKind::Block, "root");
    let a = node(&mut store, NodeKind::Statement, "a");
    let b = node(&mut store, NodeKind::Statement, "b");
    store.append_child(root, a).unwrap();

    let err = store.append_child(root, b).unwrap_err();
    assert!(matches!(err, CoreError::OutOfMemory { .. }));
    assert_eq!(store.child_count(root), 1);
    assert!(store.parent_id(b).is_none());
}

#[test]
fn test_traverse_is_preorder_and_repeatable() {
    let mut store = NodeStore::new(4096);
    let root = node(&mut store, NodeKind::Program, "r");
    let a = node(&mut store, NodeKind::Statement, "a");
    let a1 = node(&mut store, NodeKind::Expression, "a1");
    let a2 = node(&mut store, NodeKind::Expression, "a2");
    let b = node(&mut store, NodeKind::Statement, "b");
    store.append_child(root, a).unwrap();
    store.append_child(a, a1).unwrap();
    store.append_child(a, a2).unwrap();
    store.append_child(root, b).unwrap();

    let order: Vec<&str> = store
        .traverse(root)
        .map(|n| store.name(n).unwrap())
        .collect();
    assert_eq!(order, vec!["r", "a", "a1", "a2", "b"]);
    assert_eq!(store.traverse(root).count(), 5);
    assert_eq!(store.subtree_size(a), 3);
    assert_eq!(store.traverse(NodeRef(u32::MAX - 7)).count(), 0);
}

#[test]
fn test_find_children() {
    let mut store = NodeStore::new(4096);
    let root = node(&mut store, NodeKind::Block, "root");
    for (kind, name) in [
        (NodeKind::Comment, "c1"),
        (NodeKind::Statement, "s1"),
        (NodeKind::Comment, "c2"),
    ] {
        let child = node(&mut store, kind, name);
        store.append_child(root, child).unwrap();
    }

    let comments = store.find_children(root, |n| store.kind(n) == NodeKind::Comment);
    assert_eq!(comments.len(), 2);
    let first = store.find_child(root, |n| store.kind(n) == NodeKind::Statement);
    assert_eq!(first.and_then(|n| store.name(n)), Some("s1"));
    assert!(store.find_child(root, |n| store.kind(n) == NodeKind::Loop).is_none());
}

#[test]
fn test_attributes_round_trip() {
    let mut store = NodeStore::new(4096);
    let n = node(&mut store, NodeKind::Declaration, "x");
    store.set_attribute(n, "mutable", "false").unwrap();
    store.set_attribute(n, "type", "i32").unwrap();

    assert_eq!(store.attribute(n, "type").as_deref(), Some("i32"));
    assert_eq!(store.attribute(n, "missing"), None);
    assert_eq!(store.attributes(n).len(), 2);

    assert_eq!(
        store.remove_attribute(n, "mutable").unwrap().as_deref(),
        Some("false")
    );
    assert_eq!(store.remove_attribute(n, "mutable").unwrap(), None);

    store.set_attributes(n, &Attributes::new()).unwrap();
    assert!(store.attributes_atom(n).is_none());
}

#[test]
fn test_equal_attribute_maps_share_an_atom() {
    let mut store = NodeStore::new(4096);
    let a = node(&mut store, NodeKind::Identifier, "a");
    let b = node(&mut store, NodeKind::Identifier, "b");
    store.set_attribute(a, "k1", "v1").unwrap();
    store.set_attribute(a, "k2", "v2").unwrap();
    store.set_attribute(b, "k2", "v2").unwrap();
    store.set_attribute(b, "k1", "v1").unwrap();
    assert_eq!(store.attributes_atom(a), store.attributes_atom(b));
}

#[test]
fn test_malformed_attribute_blob_reads_empty() {
    let mut store = NodeStore::new(4096);
    let n = node(&mut store, NodeKind::Identifier, "a");
    let blob = store.interner_mut().intern("{not json");
    store.set_attributes_atom(n, blob).unwrap();

    assert!(store.attributes(n).is_empty());
    assert_eq!(store.attribute(n, "anything"), None);
    // Writing over a malformed blob starts from an empty map.
    store.set_attribute(n, "k", "v").unwrap();
    assert_eq!(store.attributes(n).len(), 1);
}

#[test]
fn test_clone_node_is_shallow_with_fresh_id() {
    let mut store = NodeStore::new(4096);
    let root = node(&mut store, NodeKind::Function, "f");
    let child = node(&mut store, NodeKind::Block, "body");
    store.append_child(root, child).unwrap();
    store.set_attribute(root, "async", "true").unwrap();
    store.insert_flags(root, NodeFlags::RECOVERED).unwrap();

    let copy = store.clone_node(root).unwrap();
    assert_ne!(store.id(copy), store.id(root));
    assert!(store.id(copy).is_some());
    assert_eq!(store.kind(copy), NodeKind::Function);
    assert_eq!(store.name(copy), Some("f"));
    assert_eq!(store.attribute(copy, "async").as_deref(), Some("true"));
    assert_eq!(store.flags(copy), NodeFlags::RECOVERED);
    assert_eq!(store.child_count(copy), 0);
    assert!(store.parent_id(copy).is_none());

    let detached_child = store.clone_node(child).unwrap();
    assert!(store.parent_id(detached_child).is_none());
    assert_eq!(store.depth(detached_child), 0);
}

#[test]
fn test_deep_clone_is_disjoint() {
    let mut store = NodeStore::new(1 << 14);
    let root = node(&mut store, NodeKind::Function, "f");
    let body = node(&mut store, NodeKind::Block, "body");
    let stmt = node(&mut store, NodeKind::Statement, "s");
    store.append_child(root, body).unwrap();
    store.append_child(body, stmt).unwrap();

    let copy = store.deep_clone(body).unwrap();
    assert_eq!(store.subtree_size(copy), 2);
    assert!(store.parent_id(copy).is_none());
    assert_eq!(store.depth(copy), 0);
    let copied_stmt = store.child(copy, 0).unwrap();
    assert_ne!(copied_stmt, stmt);
    assert_eq!(store.depth(copied_stmt), 1);

    store.set_name(copied_stmt, Some("changed")).unwrap();
    assert_eq!(store.name(stmt), Some("s"));
    assert_eq!(
        store.to_plain(copy).without_ids(),
        {
            let mut expected = store.to_plain(body).without_ids();
            expected.children[0].name = Some("changed".to_string());
            expected
        }
    );
}

#[test]
fn test_display() {
    let mut store = NodeStore::new(4096);
    let root = node(&mut store, NodeKind::BinaryOp, "+");
    let lit = store.create(NodeKind::Literal, None, Some("1"), None).unwrap();
    store.assign_id(lit).unwrap();
    store.append_child(root, lit).unwrap();

    assert_eq!(
        store.display(root).to_string(),
        "BinaryOp \"+\" = \"\" (1 children)"
    );
    assert_eq!(
        store.display(lit).to_string(),
        "Literal \"\" = \"1\" (0 children)"
    );
}

#[test]
fn test_stale_handle_is_rejected_after_rollback() {
    let mut store = NodeStore::new(4096);
    let checkpoint = store.arena().checkpoint();
    let n = node(&mut store, NodeKind::Statement, "gone");
    store.arena_mut().reset_to(checkpoint).unwrap();

    assert!(!store.is_node(n));
    assert!(store.set_span(n, Span::default()).is_err());
    assert!(store.set_name(n, Some("x")).is_err());
    // Interned strings survive the rollback.
    assert!(store.interner().id_of("gone").is_some());
}
