//! Integration tests for the canonical store against a real Postgres.
//!
//! Verifies that:
//! - post identity is unique and updates preserve id + created_at
//! - reaction snapshots accumulate and surface as latest metrics
//! - on-date stat upserts collapse same-day writes
//! - an exclusion purge nulls the mapping's local side instead of deleting it
//!
//! Requirements: Docker (for Postgres via testcontainers)
//!
//! Run with: cargo test -p syndicate-store --features test-utils --test store_test

#![cfg(feature = "test-utils")]

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use syndicate_common::{EntityKind, ProfileStats, SyncState};
use syndicate_store::testutil::postgres_container;

#[tokio::test]
async fn post_upsert_preserves_identity_across_sightings() {
    let (_pg, store) = postgres_container().await;
    let owner = Uuid::new_v4();
    let source = store.create_source(owner, "bluesky", "ferret.example").await.unwrap();

    let created_at = Utc::now() - Duration::days(3);
    let first = store
        .insert_post(
            source.id,
            "bluesky",
            "at://post/1",
            created_at,
            "ferret",
            "post",
            Some("v1"),
            &[],
        )
        .await
        .unwrap();

    store
        .update_post(first, "ferret", "post", Some("v2"), &[])
        .await
        .unwrap();

    let post = store
        .post_by_identity("bluesky", "at://post/1")
        .await
        .unwrap()
        .expect("post exists");
    assert_eq!(post.id, first);
    assert_eq!(post.content.as_deref(), Some("v2"));
    assert_eq!(
        post.created_at.timestamp(),
        created_at.timestamp(),
        "creation time survives updates"
    );
    assert!(post.last_synced_at > post.created_at);

    // The natural identity is unique at the SQL layer too.
    let dup = store
        .insert_post(source.id, "bluesky", "at://post/1", created_at, "x", "post", None, &[])
        .await;
    assert!(dup.is_err());
}

#[tokio::test]
async fn latest_reaction_snapshot_wins_in_metrics() {
    let (_pg, store) = postgres_container().await;
    let owner = Uuid::new_v4();
    let source = store.create_source(owner, "bluesky", "ferret.example").await.unwrap();
    let post_id = store
        .insert_post(source.id, "bluesky", "p1", Utc::now(), "ferret", "post", None, &[])
        .await
        .unwrap();

    store.add_reaction(post_id, Some(1), None, Some(10)).await.unwrap();
    store.add_reaction(post_id, Some(5), None, Some(60)).await.unwrap();

    let rows = store.posts_with_metrics_for_owner(owner).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].likes, Some(5));
    assert_eq!(rows[0].views, Some(60));

    let totals = store.source_totals(source.id).await.unwrap();
    assert_eq!(totals.total_posts, 1);
    assert_eq!(totals.total_likes, 5);
}

#[tokio::test]
async fn same_day_stat_writes_collapse_to_one_row() {
    let (_pg, store) = postgres_container().await;
    let owner = Uuid::new_v4();
    let source = store.create_source(owner, "plausible", "ferret.example").await.unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();

    store
        .upsert_source_stat(source.id, day, &ProfileStats { followers: Some(10), ..Default::default() })
        .await
        .unwrap();
    store
        .upsert_source_stat(source.id, day, &ProfileStats { followers: Some(12), ..Default::default() })
        .await
        .unwrap();
    let stats = store.source_stats_for_source(source.id).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].followers, Some(12));

    store.upsert_page_stat(source.id, day, "/a", 3).await.unwrap();
    store.upsert_page_stat(source.id, day, "/a", 7).await.unwrap();
    store.upsert_page_stat(source.id, day, "/b", 1).await.unwrap();
    let pages = store.page_stats_for_source(source.id).await.unwrap();
    assert_eq!(pages.len(), 2, "path is part of the upsert key");
    assert_eq!(
        pages.iter().find(|p| p.path == "/a").unwrap().views,
        7
    );
}

#[tokio::test]
async fn exclusion_purge_leaves_a_null_mapping_for_remote_cleanup() {
    let (_pg, store) = postgres_container().await;
    let owner = Uuid::new_v4();
    let source = store.create_source(owner, "bluesky", "ferret.example").await.unwrap();
    let target = store
        .create_target(owner, syndicate_common::TargetKind::NocoDb, None, None)
        .await
        .unwrap();

    let post_id = store
        .insert_post(source.id, "bluesky", "spam", Utc::now(), "ferret", "post", None, &[])
        .await
        .unwrap();
    store
        .add_mapping(EntityKind::Post, target.id, post_id, "41")
        .await
        .unwrap();

    store.add_exclusion(source.id, "spam").await.unwrap();
    let purged = store.delete_post_by_identity(source.id, "spam").await.unwrap();
    assert_eq!(purged, 1);

    let mappings = store.mappings_for(EntityKind::Post, target.id).await.unwrap();
    assert_eq!(mappings.len(), 1, "mapping survives for the remote delete");
    assert_eq!(mappings[0].local_id, None);
    assert_eq!(mappings[0].target_record_id, "41");
}

#[tokio::test]
async fn status_machine_touches_last_synced_at_only_on_terminal_states() {
    let (_pg, store) = postgres_container().await;
    let owner = Uuid::new_v4();
    let source = store.create_source(owner, "bluesky", "ferret.example").await.unwrap();
    assert_eq!(source.sync_state, SyncState::Initialized);

    store
        .set_source_state(source.id, SyncState::Syncing, None)
        .await
        .unwrap();
    let status = store.source_status(source.id).await.unwrap();
    assert_eq!(status.state, SyncState::Syncing);
    assert!(status.last_synced_at.is_none());

    store
        .set_source_state(source.id, SyncState::Failed, Some("adapter outage"))
        .await
        .unwrap();
    let status = store.source_status(source.id).await.unwrap();
    assert_eq!(status.state, SyncState::Failed);
    assert_eq!(status.reason.as_deref(), Some("adapter outage"));
    assert!(status.last_synced_at.is_some());
}

#[tokio::test]
async fn archive_sweep_only_touches_stale_posts() {
    let (_pg, store) = postgres_container().await;
    let owner = Uuid::new_v4();
    let source = store.create_source(owner, "bluesky", "ferret.example").await.unwrap();

    store
        .insert_post(source.id, "bluesky", "fresh", Utc::now(), "ferret", "post", None, &[])
        .await
        .unwrap();

    // A cutoff before the insert archives nothing; one after archives it.
    let archived = store
        .archive_unseen(source.id, Utc::now() - Duration::hours(36))
        .await
        .unwrap();
    assert_eq!(archived, 0);

    let archived = store
        .archive_unseen(source.id, Utc::now() + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(archived, 1);
}
