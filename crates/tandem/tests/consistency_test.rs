//! Property tests: any sequence of client operations keeps the two documents
//! consistent, and a rejected operation changes nothing.

use proptest::prelude::*;

use tandem::{
    command::{self, Operation},
    geometry::Point,
    identifier::Id,
    notation::DocumentPair,
    semantic::ElementKind,
};

/// An operation whose targets are picked from the live document at run time.
#[derive(Debug, Clone)]
enum Action {
    Add { kind: usize, parent: usize, x: u8, y: u8 },
    Relate { kind: usize, source: usize, target: usize },
    Annotate { comment: usize, target: usize },
    Remove { target: usize },
    Delete { first: usize, second: usize },
    Rename { target: usize },
    Move { target: usize, x: u8, y: u8 },
}

const ADDABLE: [ElementKind; 7] = [
    ElementKind::Package,
    ElementKind::Component,
    ElementKind::Class,
    ElementKind::UseCase,
    ElementKind::Actor,
    ElementKind::Comment,
    ElementKind::ExtensionPoint,
];

const RELATIONSHIPS: [ElementKind; 4] = [
    ElementKind::Include,
    ElementKind::Extend,
    ElementKind::Generalization,
    ElementKind::Association,
];

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0..ADDABLE.len(), any::<usize>(), any::<u8>(), any::<u8>())
            .prop_map(|(kind, parent, x, y)| Action::Add { kind, parent, x, y }),
        2 => (0..RELATIONSHIPS.len(), any::<usize>(), any::<usize>())
            .prop_map(|(kind, source, target)| Action::Relate { kind, source, target }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(comment, target)| Action::Annotate { comment, target }),
        1 => any::<usize>().prop_map(|target| Action::Remove { target }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(first, second)| Action::Delete { first, second }),
        1 => any::<usize>().prop_map(|target| Action::Rename { target }),
        1 => (any::<usize>(), any::<u8>(), any::<u8>())
            .prop_map(|(target, x, y)| Action::Move { target, x, y }),
    ]
}

fn pick(paths: &[Id], index: usize) -> Id {
    paths[index % paths.len()]
}

fn to_operation(pair: &DocumentPair, action: &Action) -> Operation {
    // The root is always a candidate, so a fresh document still has targets.
    let paths: Vec<Id> = std::iter::once(pair.semantic.root())
        .chain(pair.semantic.walk().iter().map(|node| node.path()))
        .collect();
    let comments: Vec<Id> = pair
        .semantic
        .walk()
        .iter()
        .filter(|node| node.kind() == ElementKind::Comment)
        .map(|node| node.path())
        .collect();

    match *action {
        Action::Add { kind, parent, x, y } => Operation::AddElement {
            kind: ADDABLE[kind],
            position: Point::new(f32::from(x), f32::from(y)),
            parent: Some(pick(&paths, parent)),
            name: None,
        },
        Action::Relate {
            kind,
            source,
            target,
        } => Operation::AddRelationship {
            kind: RELATIONSHIPS[kind],
            source: pick(&paths, source),
            target: pick(&paths, target),
            name: None,
        },
        Action::Annotate { comment, target } => Operation::AddCommentEdge {
            comment: if comments.is_empty() {
                pick(&paths, comment)
            } else {
                pick(&comments, comment)
            },
            target: pick(&paths, target),
        },
        Action::Remove { target } => Operation::Remove {
            target: pick(&paths, target),
            expected: None,
        },
        Action::Delete { first, second } => Operation::Delete {
            element_ids: vec![pick(&paths, first), pick(&paths, second)],
        },
        Action::Rename { target } => {
            let target = pick(&paths, target);
            Operation::SetName {
                target,
                expected: pair.semantic.resolve(target).map_or(ElementKind::Model, |n| n.kind()),
                name: Some("renamed".to_string()),
            }
        }
        Action::Move { target, x, y } => Operation::ChangeBounds {
            target: pick(&paths, target),
            position: Some(Point::new(f32::from(x), f32::from(y))),
            size: None,
        },
    }
}

#[test]
fn test_fresh_document_targets_root() {
    let mut pair = DocumentPair::new("model");
    let root = pair.semantic.root();

    let operation = to_operation(&pair, &Action::Add { kind: 3, parent: 7, x: 0, y: 0 });
    assert!(matches!(operation, Operation::AddElement { parent: Some(parent), .. } if parent == root));

    command::execute(&mut pair, &operation).unwrap();
    assert_eq!(pair.semantic.walk().len(), 1);
    assert!(pair.dangling_proxies().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_operations_keep_documents_consistent(
        actions in prop::collection::vec(action(), 1..40)
    ) {
        let mut pair = DocumentPair::new("model");
        for action in &actions {
            let operation = to_operation(&pair, action);
            let before = pair.clone();
            match command::execute(&mut pair, &operation) {
                Ok(_) => {
                    prop_assert!(pair.dangling_proxies().is_empty(), "{operation:?}");
                    prop_assert!(pair.semantic.containment_is_consistent());
                }
                Err(err) => {
                    prop_assert!(err.is_rejection(), "{err}");
                    prop_assert_eq!(&pair, &before);
                }
            }
        }
    }

    #[test]
    fn prop_journal_revert_restores_documents(
        actions in prop::collection::vec(action(), 1..20)
    ) {
        let mut pair = DocumentPair::new("model");
        for action in &actions {
            let operation = to_operation(&pair, action);
            let before = pair.clone();
            if let Ok(applied) = command::execute(&mut pair, &operation) {
                let after = pair.clone();
                let redo = applied.journal.revert(&mut pair).unwrap();
                prop_assert_eq!(&pair, &before);
                redo.revert(&mut pair).unwrap();
                prop_assert_eq!(&pair, &after);
            }
        }
    }
}
