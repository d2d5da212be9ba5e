#[path = "common/mod.rs"]
mod common;

use common::*;
use scored_etl::{build_discussion_tree, Error, NodeId, Thread};

fn post_node(id: &str) -> NodeId {
    NodeId::Post(id.to_string())
}

fn comment_node(id: &str) -> NodeId {
    NodeId::Comment(id.to_string())
}

/// P @1000 <- C1 @1005 <- C2 @1012: three nodes, reply latencies 5 and 7.
#[test]
fn three_node_tree_with_time_diffs() {
    let tree = build_discussion_tree(&tree_thread(), false).unwrap();
    assert_eq!(tree.thread_id(), "p");
    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.edge_count(), 2);

    let e1 = tree.parent_edge(&comment_node("c1")).unwrap();
    assert_eq!(e1.parent, post_node("p"));
    assert_eq!(e1.time_diff_seconds, 5);

    let e2 = tree.parent_edge(&comment_node("c2")).unwrap();
    assert_eq!(e2.parent, comment_node("c1"));
    assert_eq!(e2.time_diff_seconds, 7);

    assert!(tree.parent_edge(&post_node("p")).is_none());
    assert!(tree.nodes().iter().all(|n| n.attrs.is_none()));
}

#[test]
fn node_attributes_are_optional() {
    let tree = build_discussion_tree(&tree_thread(), true).unwrap();
    let c2 = tree.node(&comment_node("c2")).unwrap();
    let attrs = c2.attrs.as_ref().unwrap();
    assert_eq!(attrs.author, "carol");
    assert_eq!(attrs.created, 1012);
    assert!(!attrs.is_deleted);
}

#[test]
fn depths_and_children() {
    let thread = Thread::new(
        "alice",
        post("p", "alice", 1000, "rust"),
        vec![
            comment("a", "bob", 1001, None),
            comment("b", "carol", 1002, None),
            comment("a1", "dave", 1003, Some("a")),
            comment("a1x", "bob", 1004, Some("a1")),
        ],
    );
    let tree = build_discussion_tree(&thread, false).unwrap();
    let depths = tree.depths();
    assert_eq!(depths[&post_node("p")], 0);
    assert_eq!(depths[&comment_node("b")], 1);
    assert_eq!(depths[&comment_node("a1x")], 3);
    assert_eq!(tree.max_depth(), 3);
    assert_eq!(tree.children(&post_node("p")), [&comment_node("a"), &comment_node("b")]);
    assert!(tree.children(&comment_node("b")).is_empty());
}

/// A parent id that resolves nowhere in the thread aborts the build.
#[test]
fn dangling_parent_is_structural() {
    let thread = Thread::new(
        "alice",
        post("p", "alice", 1000, "rust"),
        vec![comment("c1", "bob", 1005, None), comment("c2", "carol", 1012, Some("ghost"))],
    );
    let err = build_discussion_tree(&thread, true).unwrap_err();
    match err {
        Error::Structural { thread, comment, parent } => {
            assert_eq!(thread, "p");
            assert_eq!(comment, "c2");
            assert_eq!(parent, "ghost");
        }
        other => panic!("expected a structural error, got {other}"),
    }
}

/// Replies may not predate what they answer.
#[test]
fn negative_time_difference_is_rejected() {
    let thread = Thread::new(
        "alice",
        post("p", "alice", 1000, "rust"),
        vec![comment("c1", "bob", 1010, None), comment("c2", "carol", 1005, Some("c1"))],
    );
    assert!(build_discussion_tree(&thread, false).unwrap_err().is_validation());

    let early = Thread::new("alice", post("p", "alice", 1000, "rust"), vec![comment("c1", "bob", 999, None)]);
    assert!(build_discussion_tree(&early, false).unwrap_err().is_validation());
}

#[test]
fn duplicate_and_self_parented_comments_are_rejected() {
    let dup = Thread::new(
        "alice",
        post("p", "alice", 1000, "rust"),
        vec![comment("c1", "bob", 1001, None), comment("c1", "carol", 1002, None)],
    );
    assert!(build_discussion_tree(&dup, false).unwrap_err().is_validation());

    let selfie = Thread::new("alice", post("p", "alice", 1000, "rust"), vec![comment("c1", "bob", 1001, Some("c1"))]);
    assert!(build_discussion_tree(&selfie, false).unwrap_err().is_validation());
}

/// Equal timestamps give a zero latency, not an error.
#[test]
fn simultaneous_reply_is_allowed() {
    let thread = Thread::new("alice", post("p", "alice", 1000, "rust"), vec![comment("c1", "bob", 1000, None)]);
    let tree = build_discussion_tree(&thread, false).unwrap();
    assert_eq!(tree.edges()[0].time_diff_seconds, 0);
}

#[test]
fn tree_serializes_to_json() {
    let tree = build_discussion_tree(&tree_thread(), false).unwrap();
    let v = serde_json::to_value(&tree).unwrap();
    assert_eq!(v["edges"][1]["child"], serde_json::json!({"kind": "comment", "id": "c2"}));
    assert_eq!(v["edges"][1]["time_diff_seconds"], 7);
}
