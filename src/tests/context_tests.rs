use std::cell::RefCell;
use std::rc::Rc;

use crate::config::SessionConfig;
use crate::context::{
    ContextEdit, EditAction, EditContext, EditHook, EditResult, EditSession, EditTarget,
};
use crate::edit::NodeUpdate;
use crate::test_fixtures::{SAMPLE_SOURCE, Sample, assert_sound, sample_tree};
use crate::tree::{NodeId, NodeKind, PlainNode};
use cograph_common::Position;

fn session() -> (EditSession, Sample) {
    session_with(&SessionConfig::default())
}

fn session_with(config: &SessionConfig) -> (EditSession, Sample) {
    let mut sample = sample_tree();
    let tree = std::mem::replace(&mut sample.tree, crate::tree::Tree::new(64));
    let session = EditSession::new(tree, config).with_source(SAMPLE_SOURCE);
    (session, sample)
}

fn id_of(session: &EditSession, node: crate::tree::NodeRef) -> NodeId {
    session.tree().store().id(node)
}

struct Recorder {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl EditHook for Recorder {
    fn before_edit(&mut self, context: &EditContext) {
        self.log
            .borrow_mut()
            .push(format!("{} before {}", self.name, context.action));
    }

    fn after_edit(&mut self, _context: &EditContext, result: &EditResult) {
        self.log
            .borrow_mut()
            .push(format!("{} after {}", self.name, result.success));
    }
}

#[test]
fn test_locate_by_node_id() {
    let (session, sample) = session();
    let id = id_of(&session, sample.ident_x);
    let (node, position) = session.locate(&EditTarget::Node { id }).unwrap();
    assert_eq!(node, sample.ident_x);
    assert_eq!(position, Some(Position::new(0, 4, 4)));

    let missing = session.locate(&EditTarget::Node { id: NodeId(u32::MAX) });
    assert!(missing.is_err());
}

#[test]
fn test_locate_by_offset() {
    let (session, sample) = session();
    let (node, position) = session.locate(&EditTarget::Offset { offset: 9 }).unwrap();
    assert_eq!(node, sample.literal);
    assert_eq!(position, Some(Position::new(0, 9, 9)));

    // End of source is still a valid offset.
    let (node, _) = session.locate(&EditTarget::Offset { offset: 22 }).unwrap();
    assert_eq!(node, sample.root);
    assert!(session.locate(&EditTarget::Offset { offset: 23 }).is_err());
}

#[test]
fn test_locate_by_offset_without_source() {
    let sample = sample_tree();
    let session = EditSession::new(sample.tree, &SessionConfig::default());
    let (node, position) = session.locate(&EditTarget::Offset { offset: 9 }).unwrap();
    assert_eq!(node, sample.literal);
    assert_eq!(position, None);
}

#[test]
fn test_locate_by_line_column() {
    let (session, sample) = session();
    let (node, position) = session
        .locate(&EditTarget::LineColumn { line: 1, column: 4 })
        .unwrap();
    assert_eq!(node, sample.decl_y);
    assert_eq!(position, Some(Position::new(1, 4, 16)));

    assert!(
        session
            .locate(&EditTarget::LineColumn { line: 0, column: 12 })
            .is_err()
    );
    assert!(
        session
            .locate(&EditTarget::LineColumn { line: 2, column: 0 })
            .is_err()
    );
}

#[test]
fn test_line_column_needs_source() {
    let sample = sample_tree();
    let mut session = EditSession::new(sample.tree, &SessionConfig::default());
    let result = session.edit_with_context(&ContextEdit::new(
        EditTarget::LineColumn { line: 0, column: 0 },
        EditAction::Delete,
    ));
    assert!(!result.success);
    assert!(result.error.unwrap().contains("need source text"));
}

#[test]
fn test_context_collects_siblings_and_ancestors() {
    let (session, sample) = session();
    let edit = ContextEdit::at_node(id_of(&session, sample.ident_x), EditAction::Delete);
    let context = session.context_for(&edit).unwrap();

    assert_eq!(context.action, "delete");
    assert_eq!(context.target_kind, NodeKind::Identifier);
    assert_eq!(context.siblings.as_slice(), &[id_of(&session, sample.expr)]);
    assert_eq!(
        context.ancestors.as_slice(),
        &[id_of(&session, sample.decl_x), id_of(&session, sample.root)]
    );
}

#[test]
fn test_context_radius_limits_ancestors() {
    let config = SessionConfig {
        context_radius: 1,
        ..SessionConfig::default()
    };
    let (session, sample) = session_with(&config);
    let edit = ContextEdit::at_node(id_of(&session, sample.literal), EditAction::Delete);
    let context = session.context_for(&edit).unwrap();
    assert_eq!(context.ancestors.as_slice(), &[id_of(&session, sample.expr)]);
    assert!(context.siblings.is_empty());
}

#[test]
fn test_hooks_run_in_registration_order() {
    let (mut session, sample) = session();
    let log = Rc::new(RefCell::new(Vec::new()));
    for name in ["first", "second"] {
        let replaced = session.register_hook(
            name,
            Recorder {
                name,
                log: Rc::clone(&log),
            },
        );
        assert!(!replaced);
    }

    let edit = ContextEdit::at_node(id_of(&session, sample.decl_y), EditAction::Delete);
    assert!(session.edit_with_context(&edit).success);
    assert_eq!(
        *log.borrow(),
        vec![
            "first before delete",
            "second before delete",
            "first after true",
            "second after true",
        ]
    );
}

#[test]
fn test_hook_replacement_and_removal() {
    let (mut session, sample) = session();
    let log = Rc::new(RefCell::new(Vec::new()));
    session.register_hook("a", Recorder { name: "old", log: Rc::clone(&log) });
    session.register_hook("b", Recorder { name: "b", log: Rc::clone(&log) });
    assert!(session.register_hook("a", Recorder { name: "new", log: Rc::clone(&log) }));
    assert_eq!(session.hook_names().collect::<Vec<_>>(), vec!["a", "b"]);

    assert!(session.unregister_hook("b"));
    assert!(!session.unregister_hook("b"));

    let root = id_of(&session, sample.root);
    let result = session.edit_with_context(&ContextEdit::at_node(root, EditAction::Delete));
    // Deleting the root fails after the hooks have seen the context.
    assert!(!result.success);
    assert_eq!(*log.borrow(), vec!["new before delete", "new after false"]);
}

#[test]
fn test_unresolved_target_skips_hooks() {
    let (mut session, _sample) = session();
    let log = Rc::new(RefCell::new(Vec::new()));
    session.register_hook("rec", Recorder { name: "rec", log: Rc::clone(&log) });

    let result = session.edit_with_context(&ContextEdit::at_node(
        NodeId(u32::MAX),
        EditAction::Delete,
    ));
    assert!(!result.success);
    assert!(result.operation.is_none());
    assert!(result.error.is_some());

    let result = session.edit_with_context(&ContextEdit::new(
        EditTarget::Offset { offset: 1000 },
        EditAction::Delete,
    ));
    assert!(!result.success);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_insert_at_location() {
    let (mut session, sample) = session();
    let edit = ContextEdit::new(
        EditTarget::Offset { offset: 16 },
        EditAction::Insert {
            node: PlainNode::new(NodeKind::Identifier).with_name("x"),
            index: None,
        },
    );
    let result = session.edit_with_context(&edit);
    assert!(result.success, "{:?}", result.error);
    let inserted = session.tree().find(result.node.unwrap()).unwrap();
    assert_eq!(session.tree().parent(inserted), Some(sample.decl_y));
    assert_eq!(session.tree().store().name(inserted), Some("x"));
    assert_sound(session.tree());

    session.undo().unwrap();
    assert!(session.tree().find(result.node.unwrap()).is_none());
    assert_eq!(session.tree().store().child_count(sample.decl_y), 0);
    session.redo().unwrap();
    assert!(session.tree().find(result.node.unwrap()).is_some());
    assert_sound(session.tree());
}

#[test]
fn test_update_and_move_through_context() {
    let (mut session, sample) = session();
    let literal = id_of(&session, sample.literal);
    let decl_y = id_of(&session, sample.decl_y);

    let result = session.edit_with_context(&ContextEdit::new(
        EditTarget::LineColumn { line: 0, column: 9 },
        EditAction::Update(NodeUpdate {
            value: Some("7".to_string()),
            ..NodeUpdate::default()
        }),
    ));
    assert!(result.success);
    assert_eq!(result.node, Some(literal));
    assert_eq!(session.tree().store().value(sample.literal), Some("7"));

    let result = session.edit_with_context(&ContextEdit::at_node(
        literal,
        EditAction::Move {
            new_parent: decl_y,
            index: Some(0),
        },
    ));
    assert!(result.success);
    assert_eq!(session.tree().parent(sample.literal), Some(sample.decl_y));
    assert_eq!(session.engine().history().len(), 2);
    assert_sound(session.tree());

    session.undo().unwrap();
    session.undo().unwrap();
    assert_eq!(session.tree().parent(sample.literal), Some(sample.expr));
    assert_eq!(session.tree().store().value(sample.literal), Some("42"));
    assert!(session.undo().is_err());
}

#[test]
fn test_failed_move_reports_error() {
    let (mut session, sample) = session();
    let decl_x = id_of(&session, sample.decl_x);
    let literal = id_of(&session, sample.literal);
    let result = session.edit_with_context(&ContextEdit::at_node(
        decl_x,
        EditAction::Move {
            new_parent: literal,
            index: None,
        },
    ));
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("invalid operation"));
    assert!(!session.engine().can_undo());
    assert_sound(session.tree());
}

#[test]
fn test_edit_json_shape() {
    let edit: ContextEdit = serde_json::from_str(
        r#"{"target":{"by":"lineColumn","line":1,"column":0},"action":{"type":"move","newParent":3}}"#,
    )
    .unwrap();
    assert_eq!(
        edit,
        ContextEdit::new(
            EditTarget::LineColumn { line: 1, column: 0 },
            EditAction::Move {
                new_parent: NodeId(3),
                index: None,
            },
        )
    );

    let result = EditResult::failed("boom");
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"success":false,"error":"boom"}"#
    );
}
