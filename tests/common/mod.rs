#![allow(dead_code)]

use scored_etl::{Comment, InMemoryDataset, Metadata, ParentRef, Post, Thread};
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn post(id: &str, author: &str, created: i64, community: &str) -> Post {
    Post::new(id, author, created).unwrap().with_meta(Metadata::new(0, false, community))
}

/// `parent == None` replies to the root post.
pub fn comment(id: &str, author: &str, created: i64, parent: Option<&str>) -> Comment {
    let parent = parent.map_or(ParentRef::Post, |p| ParentRef::Comment(p.to_string()));
    Comment::new(id, author, created, parent).unwrap()
}

/// Post `p` by alice at 1000, `c1` by bob at 1005 (to the post), `c2` by carol at
/// 1012 (to `c1`).
pub fn tree_thread() -> Thread {
    Thread::new(
        "alice",
        post("p", "alice", 1000, "rust"),
        vec![comment("c1", "bob", 1005, None), comment("c2", "carol", 1012, Some("c1"))],
    )
}

/// Three users, two communities:
/// - alice/rust `p1` @1000: bob→post @1005, carol→c1 @1012 (deleted, score -1),
///   alice→c2 @1020, alice→post @1030 (self reply).
/// - bob/Python `p2` @2000: alice→post @2100, dave→c5 @2200.
/// - carol/rust `p3` @3000, no comments.
pub fn sample_dataset() -> InMemoryDataset {
    let t1 = Thread::new(
        "alice",
        Post::new("p1", "alice", 1000)
            .unwrap()
            .with_title("Rust async")
            .with_body("Which tokio runtime flavour?")
            .with_meta(Metadata::new(10, false, "rust").with_field("flair", "question")),
        vec![
            comment("c1", "bob", 1005, None)
                .with_body("Multi-thread, always")
                .with_meta(Metadata::new(3, false, "rust")),
            comment("c2", "carol", 1012, Some("c1"))
                .with_body("[removed]")
                .with_meta(Metadata::new(-1, true, "rust")),
            comment("c3", "alice", 1020, Some("c2"))
                .with_body("Why the current-thread one?")
                .with_meta(Metadata::new(2, false, "rust")),
            comment("c4", "alice", 1030, None)
                .with_body("Edit: solved")
                .with_meta(Metadata::new(1, false, "rust")),
        ],
    );
    let t2 = Thread::new(
        "bob",
        Post::new("p2", "bob", 2000)
            .unwrap()
            .with_title("GIL removal")
            .with_body("Thoughts on free-threaded Python?")
            .with_meta(Metadata::new(25, false, "Python")),
        vec![
            comment("c5", "alice", 2100, None)
                .with_body("Finally")
                .with_meta(Metadata::new(4, false, "Python")),
            comment("c6", "dave", 2200, Some("c5"))
                .with_body("Extensions will break")
                .with_meta(Metadata::new(7, false, "Python")),
        ],
    );
    let t3 = Thread::new(
        "carol",
        Post::new("p3", "carol", 3000)
            .unwrap()
            .with_title("Borrow checker tips")
            .with_meta(Metadata::new(5, false, "rust")),
        vec![],
    );
    [t1, t2, t3].into_iter().collect()
}

/// A dump row in the on-disk layout. `created` values are whatever the caller passes.
pub fn row(post: Value, comments: Vec<Value>) -> Value {
    json!({ "posts": [post], "comments": comments })
}

pub fn post_json(id: &str, author: &str, created: i64, community: &str, title: &str) -> Value {
    json!({
        "id": id, "author": author, "created": created, "community": community,
        "title": title, "content": "", "score": 1, "is_deleted": false
    })
}

/// `parent` of 0 replies to the root post, like the dumps do.
pub fn comment_json(id: &str, author: &str, created: i64, parent: &str, community: &str) -> Value {
    json!({
        "id": id, "author": author, "created": created, "community": community,
        "content": format!("comment {id}"), "in_reply_to_id": parent, "score": 1, "is_deleted": false
    })
}

pub fn write_user_file(dir: &Path, user: &str, rows: &[Value]) -> PathBuf {
    let path = dir.join(format!("{user}.jsonl"));
    let mut f = File::create(&path).unwrap();
    for r in rows {
        writeln!(&mut f, "{}", r).unwrap();
    }
    path
}

/// Same as `write_user_file` but zstd-compressed (`<user>.jsonl.zst`).
pub fn write_user_file_zst(dir: &Path, user: &str, rows: &[Value]) -> PathBuf {
    let path = dir.join(format!("{user}.jsonl.zst"));
    let f = File::create(&path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for r in rows {
        writeln!(&mut enc, "{}", r).unwrap();
    }
    enc.finish().unwrap();
    path
}

/// Same as `write_user_file` but gzip-compressed (`<user>.jsonl.gz`).
pub fn write_user_file_gz(dir: &Path, user: &str, rows: &[Value]) -> PathBuf {
    let path = dir.join(format!("{user}.jsonl.gz"));
    let f = File::create(&path).unwrap();
    let mut enc = flate2::write::GzEncoder::new(f, flate2::Compression::default());
    for r in rows {
        writeln!(&mut enc, "{}", r).unwrap();
    }
    enc.finish().unwrap();
    path
}

/// On-disk version of a small two-user corpus with millisecond timestamps:
/// - alice.jsonl: `a1` in rust @1_000s with bob→post @1_005s and carol→bob @1_012s.
/// - bob.jsonl.zst: `b1` in golang @5_000s with alice→post @5_050s.
/// Plus a stray README that discovery must ignore.
pub fn make_dump_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_user_file(
        dir.path(),
        "alice",
        &[row(
            post_json("a1", "alice", 1_000_000, "rust", "Lifetimes"),
            vec![
                comment_json("ac1", "bob", 1_005_000, "0", "rust"),
                comment_json("ac2", "carol", 1_012_000, "ac1", "rust"),
            ],
        )],
    );
    write_user_file_zst(
        dir.path(),
        "bob",
        &[row(
            post_json("b1", "bob", 5_000_000, "golang", "Generics"),
            vec![comment_json("bc1", "alice", 5_050_000, "0", "golang")],
        )],
    );
    fs::write(dir.path().join("README.md"), "not a dump").unwrap();
    dir
}
