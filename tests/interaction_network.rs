#[path = "common/mod.rs"]
mod common;

use common::*;
use scored_etl::{
    higher_order_interactions, interactions, resolve_interactions, Corpus, InMemoryDataset, Level, MalformedPolicy,
    NetworkOptions, Thread, TimeRange,
};

/// Thread `q`: a reply to a deleted comment next to a good one.
fn deleted_parent_thread() -> Thread {
    Thread::new(
        "c",
        post("q", "c", 2000, "rust"),
        vec![comment("d1", "a", 2001, Some("deleted")), comment("d2", "b", 2002, None)],
    )
}

/// Thread `p` (a→b) resolves, then `deleted_parent_thread`.
fn with_deleted_parent() -> InMemoryDataset {
    InMemoryDataset::new()
        .with_thread(Thread::new("b", post("p", "b", 1000, "rust"), vec![comment("c1", "a", 1001, None)]))
        .with_thread(deleted_parent_thread())
}

/// One reply from a to b gives a single a→b edge; replying to yourself adds nothing.
#[test]
fn single_reply_and_no_self_loops() {
    let thread = Thread::new(
        "b",
        post("p", "b", 1000, "rust"),
        vec![comment("c1", "a", 1001, None), comment("c2", "b", 1002, None), comment("c3", "a", 1003, Some("c1"))],
    );
    let corpus = Corpus::new(InMemoryDataset::new().with_thread(thread));
    let net = corpus.build_interaction_network(None, None).unwrap();

    assert_eq!(net.nodes(), ["a", "b"]);
    assert_eq!(net.edge_count(), 1);
    assert_eq!(net.edges_between("a", "b"), 1);
    assert!(net.edges().iter().all(|e| e.source != e.target));
}

/// Edges accumulate across threads of different owners.
#[test]
fn network_over_sample_dataset() {
    let corpus = Corpus::new(sample_dataset());
    let net = corpus.build_interaction_network(None, None).unwrap();

    // c1 bob→alice, c2 carol→bob, c3 alice→carol, c5 alice→bob, c6 dave→alice; c4 is a self reply.
    assert_eq!(net.edge_count(), 5);
    assert_eq!(net.nodes(), ["bob", "alice", "carol", "dave"]);
    assert_eq!(net.out_degree("alice"), 2);
    assert_eq!(net.in_degree("alice"), 2);
    assert_eq!(net.edges_between("alice", "alice"), 0);

    let c3 = net.edges().iter().find(|e| e.comment_id == "c3").unwrap();
    assert_eq!((c3.source.as_str(), c3.target.as_str(), c3.thread_id.as_str()), ("alice", "carol", "p1"));
}

#[test]
fn time_range_and_community_scope() {
    let corpus = Corpus::new(sample_dataset());

    let early = corpus.build_interaction_network(Some(TimeRange::new(1000, 1012)), None).unwrap();
    assert_eq!(early.edge_count(), 2);

    let python = corpus.build_interaction_network(None, Some("PYTHON")).unwrap();
    assert_eq!(python.edge_count(), 2);
    assert_eq!(python.edges_between("dave", "alice"), 1);

    let nothing = corpus.build_interaction_network(Some(TimeRange::new(5000, 4000)), None).unwrap();
    assert_eq!(nothing.node_count(), 0);
}

/// With a user list both ends of a reply must be listed.
#[test]
fn user_restriction() {
    let corpus = Corpus::new(sample_dataset());
    let opts = NetworkOptions::new().users(["alice", "bob"]);
    let net = corpus.build_interaction_network_with(&opts).unwrap();
    assert_eq!(net.edge_count(), 2);
    assert_eq!(net.edges_between("bob", "alice"), 1);
    assert_eq!(net.edges_between("alice", "bob"), 1);
}

#[test]
fn weighted_edges_collapse_repeats() {
    let thread = Thread::new(
        "b",
        post("p", "b", 1000, "rust"),
        vec![
            comment("c1", "a", 1001, None),
            comment("c2", "a", 1002, None),
            comment("c3", "c", 1003, Some("c1")),
        ],
    );
    let corpus = Corpus::new(InMemoryDataset::new().with_thread(thread));
    let net = corpus.build_interaction_network(None, None).unwrap();

    let all = net.weighted(1);
    assert_eq!(all.len(), 2);
    assert_eq!((all[0].source.as_str(), all[0].target.as_str(), all[0].weight), ("a", "b", 2));
    let strong = net.weighted(2);
    assert_eq!(strong.len(), 1);
}

#[test]
fn dangling_parent_surfaces_as_structural() {
    let thread = Thread::new("b", post("p", "b", 1000, "rust"), vec![comment("c1", "a", 1001, Some("gone"))]);
    let corpus = Corpus::new(InMemoryDataset::new().with_thread(thread));
    assert!(corpus.build_interaction_network(None, None).unwrap_err().is_structural());
}

#[test]
fn dangling_parents_fail_by_default() {
    let corpus = Corpus::new(with_deleted_parent());
    let err = corpus.build_interaction_network(None, None).unwrap_err();
    assert!(err.is_structural());
    assert!(err.to_string().contains("deleted"));
    assert!(corpus.get_all_user_stats().unwrap_err().is_structural());
    assert!(corpus.get_community_stats().unwrap_err().is_structural());
}

/// Under `Skip` only the unresolved reply is dropped; the rest of the scope still counts.
#[test]
fn dangling_parents_can_be_skipped() {
    let corpus = Corpus::new(with_deleted_parent()).with_dangling_policy(MalformedPolicy::Skip);
    let net = corpus.build_interaction_network(None, None).unwrap();
    assert_eq!(net.edge_count(), 2);
    assert_eq!(net.edges_between("a", "b"), 1);
    assert_eq!(net.edges_between("b", "c"), 1);

    let users = corpus.get_all_user_stats().unwrap();
    assert_eq!(users["a"].total_comments, 2);
    assert_eq!(users["a"].total_interactions_sent, 1);
    assert_eq!(users["c"].total_interactions_received, 1);
    assert_eq!(corpus.get_community_stats().unwrap()["rust"].interactions, 2);

    let sliced = corpus.get_time_slice(2000, 3000).build_interaction_network(None, None).unwrap();
    assert_eq!(sliced.edge_count(), 1);

    let strict = Corpus::new(with_deleted_parent());
    let opts = NetworkOptions::new().on_dangling(MalformedPolicy::Skip);
    assert_eq!(strict.build_interaction_network_with(&opts).unwrap().edge_count(), 2);

    let q = deleted_parent_thread();
    assert!(interactions(&q).unwrap_err().is_structural());
    let links = resolve_interactions(&q, MalformedPolicy::Skip).unwrap();
    assert_eq!(links.iter().map(|l| l.comment_id.as_str()).collect::<Vec<_>>(), ["d2"]);
}

/// Replies involving an unknown (empty) author are not links.
#[test]
fn anonymous_records_are_skipped() {
    let thread = Thread::new(
        "b",
        post("p", "", 1000, "rust"),
        vec![comment("c1", "a", 1001, None), comment("c2", "c", 1002, Some("c1"))],
    );
    let links = interactions(&thread).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!((links[0].source.as_str(), links[0].target.as_str()), ("c", "a"));
}

#[test]
fn higher_order_groups() {
    let thread = Thread::new(
        "alice",
        post("p", "alice", 1000, "rust"),
        vec![
            comment("c1", "bob", 1001, None),
            comment("c2", "carol", 1002, Some("c1")),
            comment("c3", "dave", 1003, Some("c1")),
            comment("c4", "bob", 1004, None),
        ],
    );

    let post_level = higher_order_interactions(&thread, Level::Post);
    assert_eq!(post_level.len(), 1);
    assert_eq!(post_level[0].members, ["alice", "bob", "carol", "dave"]);
    assert_eq!(post_level[0].created, 1000);

    let comment_level = higher_order_interactions(&thread, Level::Comment);
    assert_eq!(comment_level.len(), 2);
    assert_eq!(comment_level[0].members, ["bob"]);
    assert_eq!(comment_level[1].members, ["carol", "dave"]);

    let lonely = Thread::new("alice", post("q", "alice", 1000, "rust"), vec![]);
    assert!(higher_order_interactions(&lonely, Level::Post).is_empty());
}
