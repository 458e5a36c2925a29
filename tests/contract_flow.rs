//! Read-only contract client against an in-memory node.

mod common;

use common::*;
use tipjar::contract::TipJarContract;
use tipjar::TipJarError;

fn contract(node: MockNode) -> TipJarContract<MockNode> {
    TipJarContract::new(node, CONTRACT.parse().unwrap())
}

#[tokio::test]
async fn stats_decode_count_and_total() {
    let c = contract(MockNode::with_tips(3));
    let stats = c.get_stats().await.unwrap();
    assert_eq!(stats.total_tips, 3);
    assert_eq!(stats.total_amount, 6_000_000);
    assert_eq!(c.get_owner().await.unwrap(), OWNER);
}

#[tokio::test]
async fn stats_are_all_or_nothing() {
    let mut node = MockNode::with_tips(3);
    node.down.insert("get-total-tips");
    let c = contract(node);
    assert!(matches!(c.get_stats().await, Err(TipJarError::Network(_))));
    // The count on its own still works.
    assert_eq!(c.get_tip_count().await.unwrap(), 3);
}

#[tokio::test]
async fn recent_tips_are_the_newest_five_newest_first() {
    let c = contract(MockNode::with_tips(7));
    let tips = c.recent_tips(7).await;

    let blocks: Vec<u64> = tips.iter().map(|t| t.block).collect();
    assert_eq!(blocks, vec![106, 105, 104, 103, 102]);
    assert_eq!(tips[0].amount, 7_000_000);
    assert_eq!(tips[0].tipper, ALICE);
    assert_eq!(tips[0].message, "gm");

    // Fetched one at a time, oldest first.
    assert_eq!(
        c.node().calls(),
        vec!["get-tip(2)", "get-tip(3)", "get-tip(4)", "get-tip(5)", "get-tip(6)"]
    );
}

#[tokio::test]
async fn short_jar_fetches_everything() {
    let c = contract(MockNode::with_tips(2));
    let tips = c.recent_tips(2).await;
    assert_eq!(tips.len(), 2);
    assert_eq!(tips[0].block, 101);
    assert!(c.recent_tips(0).await.is_empty());
}

#[tokio::test]
async fn out_of_range_index_is_absent() {
    let c = contract(MockNode::with_tips(2));
    assert_eq!(c.get_tip(2).await.unwrap(), None);
    assert_eq!(c.get_tip(1_000).await.unwrap(), None);
    assert!(c.get_tip(1).await.unwrap().is_some());
}

#[tokio::test]
async fn failed_index_is_skipped() {
    let mut node = MockNode::with_tips(4);
    node.broken.insert(2);
    let c = contract(node);
    let blocks: Vec<u64> = c.recent_tips(4).await.iter().map(|t| t.block).collect();
    assert_eq!(blocks, vec![103, 101, 100]);
}

#[tokio::test]
async fn count_ahead_of_tips_skips_missing_entries() {
    // The count moved on but the newest entries are not readable yet.
    let c = contract(MockNode::with_tips(3));
    let blocks: Vec<u64> = c.recent_tips(5).await.iter().map(|t| t.block).collect();
    assert_eq!(blocks, vec![102, 101, 100]);
}

#[tokio::test]
async fn ok_wrapped_results_still_decode() {
    let mut node = MockNode::with_tips(1);
    node.wrap_ok = true;
    let c = contract(node);
    assert_eq!(c.get_tip_count().await.unwrap(), 1);
    assert_eq!(c.get_owner().await.unwrap(), OWNER);
    assert_eq!(c.get_tip(0).await.unwrap().map(|t| t.amount), Some(1_000_000));
    assert_eq!(c.get_tip(1).await.unwrap(), None);
}
