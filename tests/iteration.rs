#[path = "common/mod.rs"]
mod common;

use common::*;
use scored_etl::{Corpus, DatasetAccessor, Error, Hit, InMemoryDataset, Scan, Thread, ThreadIter};

fn post_ids<D: DatasetAccessor>(scan: Scan<'_, D>) -> Vec<String> {
    scan.posts().unwrap().map(|r| r.unwrap().1.id().to_string()).collect()
}

fn comment_ids<D: DatasetAccessor>(scan: Scan<'_, D>) -> Vec<String> {
    scan.comments().unwrap().map(|r| r.unwrap().1.id().to_string()).collect()
}

fn thread_ids<D: DatasetAccessor>(scan: Scan<'_, D>) -> Vec<String> {
    scan.threads().unwrap().map(|r| r.unwrap().1.id().to_string()).collect()
}

/// Unfiltered iteration follows storage order in every mode.
#[test]
fn unfiltered_modes_follow_storage_order() {
    let corpus = Corpus::new(sample_dataset());
    assert_eq!(thread_ids(corpus.scan()), ["p1", "p2", "p3"]);
    assert_eq!(post_ids(corpus.scan()), ["p1", "p2", "p3"]);
    assert_eq!(comment_ids(corpus.scan()), ["c1", "c2", "c3", "c4", "c5", "c6"]);

    let owners: Vec<String> = corpus.scan().threads().unwrap().map(|r| r.unwrap().0).collect();
    assert_eq!(owners, ["alice", "bob", "carol"]);
}

/// Comments come with their author and the root post of their thread.
#[test]
fn comments_carry_author_and_root_post() {
    let corpus = Corpus::new(sample_dataset());
    let rows: Vec<(String, String, String)> = corpus
        .scan()
        .comments()
        .unwrap()
        .map(|r| {
            let (author, c, p) = r.unwrap();
            (author, c.id().to_string(), p.id().to_string())
        })
        .collect();
    assert_eq!(rows[1], ("carol".to_string(), "c2".to_string(), "p1".to_string()));
    assert_eq!(rows[5], ("dave".to_string(), "c6".to_string(), "p2".to_string()));
}

/// Two drains of the same scan see the same sequence.
#[test]
fn iteration_is_restartable() {
    let corpus = Corpus::new(sample_dataset());
    let scan = corpus.scan().time_range(1000, 2100);
    let first: Vec<_> = scan.comments().unwrap().map(|r| r.unwrap().1).collect();
    let second: Vec<_> = scan.comments().unwrap().map(|r| r.unwrap().1).collect();
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
}

/// Posts and comments are filtered by their own timestamp; threads qualify when any
/// item falls in the window and are then yielded whole.
#[test]
fn time_range_gates_items_and_threads() {
    let corpus = Corpus::new(sample_dataset());
    assert_eq!(post_ids(corpus.scan().time_range(1000, 1012)), ["p1"]);
    assert_eq!(comment_ids(corpus.scan().time_range(1000, 1012)), ["c1", "c2"]);

    assert!(thread_ids(corpus.scan().time_range(1013, 1019)).is_empty());
    let whole: Vec<_> = corpus.scan().time_range(1012, 1012).threads().unwrap().map(|r| r.unwrap().1).collect();
    assert_eq!(whole.len(), 1);
    assert_eq!(whole[0].comments().len(), 4);

    // Bounds are inclusive and repeated ranges intersect.
    assert_eq!(comment_ids(corpus.scan().time_range(1005, 3000).time_range(0, 1005)), ["c1"]);
}

/// `users` filters items on their author, threads on their owner.
#[test]
fn user_filters() {
    let corpus = Corpus::new(sample_dataset());
    assert_eq!(post_ids(corpus.scan().user("alice")), ["p1"]);
    assert_eq!(comment_ids(corpus.scan().user("alice")), ["c3", "c4", "c5"]);
    assert_eq!(thread_ids(corpus.scan().user("bob")), ["p2"]);
    assert_eq!(comment_ids(corpus.scan().users(["dave", "carol", "dave"])), ["c2", "c6"]);
}

#[test]
fn community_filter_is_case_insensitive() {
    let corpus = Corpus::new(sample_dataset());
    assert_eq!(thread_ids(corpus.scan().community("RUST")), ["p1", "p3"]);
    assert_eq!(comment_ids(corpus.scan().community("python")), ["c5", "c6"]);
    assert!(post_ids(corpus.scan().community("golang")).is_empty());

    let umlaut = Thread::new("uwe", post("u1", "uwe", 1000, "Ärzte"), vec![comment("uc1", "ida", 1001, None)]);
    let corpus = Corpus::new(InMemoryDataset::new().with_thread(umlaut));
    assert_eq!(post_ids(corpus.scan().community("Ärzte")), ["u1"]);
    assert_eq!(comment_ids(corpus.scan().community("ärzte")), ["uc1"]);
    assert_eq!(corpus.build_interaction_network(None, Some("ÄRZTE")).unwrap().edge_count(), 1);
}

#[test]
fn predicates_apply_to_posts_and_comments() {
    let corpus = Corpus::new(sample_dataset());
    assert_eq!(post_ids(corpus.scan().keywords_any(["TOKIO", "borrow"])), ["p1", "p3"]);
    assert_eq!(post_ids(corpus.scan().keywords_all(["gil", "python"])), ["p2"]);

    let hot = corpus.scan().condition("score__gte", 5).unwrap();
    assert_eq!(post_ids(hot), ["p1", "p2", "p3"]);
    let hot = corpus.scan().condition("score__gte", 5).unwrap();
    assert_eq!(comment_ids(hot), ["c6"]);

    let chained = corpus.scan().condition("score__gt", 0).unwrap().condition("flair", "question").unwrap();
    assert_eq!(post_ids(chained), ["p1"]);

    assert_eq!(comment_ids(corpus.scan().filter(|r| r.meta().is_deleted)), ["c2"]);
}

/// Unknown suffixes fail when the scan is configured, before any data is read.
#[test]
fn unknown_operator_fails_fast() {
    let corpus = Corpus::new(sample_dataset());
    match corpus.scan().condition("score__approx", 3) {
        Err(e) => assert!(matches!(e, Error::Configuration(_))),
        Ok(_) => panic!("expected a configuration error"),
    }
}

#[test]
fn search_text_matches_posts_and_comments() {
    let corpus = Corpus::new(sample_dataset());
    let scan = corpus.scan();

    let hits: Vec<(String, Hit)> = scan.search_text("TOKIO|current-thread", false).unwrap().map(Result::unwrap).collect();
    assert_eq!(hits.len(), 2);
    assert!(matches!(&hits[0].1, Hit::Post(p) if p.id() == "p1"));
    assert!(matches!(&hits[1].1, Hit::Comment(c) if c.id() == "c3"));
    assert_eq!(hits[1].0, "alice");

    assert_eq!(scan.search_text("TOKIO", true).unwrap().count(), 0);
    assert!(scan.search_text("(", false).err().unwrap().is_configuration());
}

#[test]
fn callback_terminals_visit_everything_in_scope() {
    let corpus = Corpus::new(sample_dataset());
    let mut seen = Vec::new();
    corpus.scan().community("rust").for_each_comment(|author, c, post| {
        seen.push(format!("{author}:{}:{}", c.id(), post.id()));
    }).unwrap();
    assert_eq!(seen, ["bob:c1:p1", "carol:c2:p1", "alice:c3:p1", "alice:c4:p1"]);

    let mut posts = 0;
    corpus.scan().for_each_post(|_, _| posts += 1).unwrap();
    assert_eq!(posts, 3);
}

/// An accessor whose second item fails.
struct Flaky(InMemoryDataset);

impl DatasetAccessor for Flaky {
    fn iterate(&self) -> scored_etl::Result<ThreadIter<'_>> {
        let mut items: Vec<_> = self.0.iterate()?.collect();
        items.insert(1, Err(Error::Validation("row 2: created must be an integer".into())));
        Ok(Box::new(items.into_iter()))
    }
}

/// Accessor errors surface to the consumer in place; iteration can carry on after them.
#[test]
fn accessor_errors_are_yielded() {
    let corpus = Corpus::new(Flaky(sample_dataset()));
    let items: Vec<_> = corpus.scan().posts().unwrap().collect();
    assert_eq!(items.len(), 4);
    assert!(items[1].as_ref().err().unwrap().is_validation());
    assert!(items[3].is_ok());

    assert!(corpus.get_all_user_stats().unwrap_err().is_validation());
}
