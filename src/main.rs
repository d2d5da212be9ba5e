use anyhow::{Context, Result};
use scored_etl::{Corpus, Level, MalformedPolicy, TimeRange, TimestampUnit};

const DATA_ROOT: &str = "./data";

fn main() -> Result<()> {
    let root = std::env::args().nth(1).unwrap_or_else(|| DATA_ROOT.to_string());

    let corpus = Corpus::builder()
        .root(&root)
        .timestamp_unit(TimestampUnit::Millis)
        .malformed_rows(MalformedPolicy::Skip)
        .dangling_parents(MalformedPolicy::Skip)
        .progress(true)
        .progress_label("Reading users")
        .open()
        .with_context(|| format!("opening dataset at {root}"))?;

    let users = corpus.get_all_user_stats_parallel()?;
    println!("Found {} users", users.len());

    let mut top: Vec<_> = users.values().collect();
    top.sort_by(|a, b| (b.total_posts + b.total_comments).cmp(&(a.total_posts + a.total_comments)));
    for s in top.iter().take(10) {
        println!("{:<24} posts={:<6} comments={:<6} sent={:<6} received={}",
            s.username, s.total_posts, s.total_comments, s.total_interactions_sent, s.total_interactions_received);
    }

    let communities = corpus.get_community_stats_parallel()?;
    for (name, c) in &communities {
        println!("{:<24} users={:<6} posts={:<6} comments={}", name, c.unique_users, c.total_posts, c.total_comments);
    }

    // 2021 only, as a slice of the full corpus.
    let range = TimeRange::from_rfc3339("2021-01-01T00:00:00Z", "2021-12-31T23:59:59Z")?;
    let year = corpus.get_time_slice(range.start, range.end);
    let net = year.build_interaction_network(None, None)?;
    println!("2021 interaction network: {} users, {} replies", net.node_count(), net.edge_count());

    let mut groups = 0usize;
    year.scan().for_each_thread(|_, thread| {
        groups += year.higher_order_interactions(thread, Level::Comment).len();
    })?;
    println!("2021 comment-level co-participation groups: {groups}");

    let out = serde_json::to_string_pretty(&net.weighted(3))?;
    println!("{out}");
    Ok(())
}
