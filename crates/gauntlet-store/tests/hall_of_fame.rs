//! Integration tests for the hall-of-fame store against in-memory `SQLite`.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

use gauntlet_store::{HallOfFameStore, NewHallOfFameEntry, StoreConfig, StorePool};
use gauntlet_types::{EpisodeId, HallOfFameMember};
use rust_decimal_macros::dec;

async fn setup() -> StorePool {
    // One connection: every in-memory connection is its own database.
    let config = StoreConfig::new("sqlite::memory:").with_max_connections(1);
    let pool = StorePool::connect(&config)
        .await
        .expect("in-memory SQLite should open");
    pool.run_migrations().await.expect("migrations should apply");
    pool
}

fn member(species: &str, moves: &[&str], item: Option<&str>) -> HallOfFameMember {
    HallOfFameMember {
        species: species.to_owned(),
        moves: moves.iter().map(|m| (*m).to_owned()).collect(),
        item: item.map(str::to_owned),
    }
}

fn entry(gauntlet: &str, seed: u64) -> NewHallOfFameEntry {
    NewHallOfFameEntry {
        episode_id: EpisodeId::new(),
        gauntlet_id: gauntlet.to_owned(),
        seed,
        party: vec![
            member("Venusaur", &["vine whip", "razor leaf"], Some("Miracle Seed")),
            member("Pidgeot", &["wing attack"], None),
        ],
        total_reward: dec!(14.375),
    }
}

#[tokio::test]
async fn recorded_entry_reads_back_intact() {
    let pool = setup().await;
    let store = HallOfFameStore::new(pool.pool());

    let new = entry("pewter-run", 42);
    let recorded = store.record(&new).await.unwrap();

    let listed = store.list_by_gauntlet("pewter-run", 10).await.unwrap();
    assert_eq!(listed.len(), 1);
    let read = &listed[0];
    assert_eq!(read.id, recorded.id);
    assert_eq!(read.episode_id, new.episode_id);
    assert_eq!(read.seed, 42);
    assert_eq!(read.party, new.party);
    assert_eq!(read.total_reward, dec!(14.375));
}

#[tokio::test]
async fn seeds_above_i64_max_read_back_unchanged() {
    let pool = setup().await;
    let store = HallOfFameStore::new(pool.pool());

    for seed in [u64::MAX - 3, u64::MAX, 1 << 63] {
        store.record(&entry("indigo-run", seed)).await.unwrap();
    }

    let mut seeds: Vec<_> = store
        .list_by_gauntlet("indigo-run", 10)
        .await
        .unwrap()
        .iter()
        .map(|e| e.seed)
        .collect();
    seeds.sort_unstable();
    assert_eq!(seeds, vec![1 << 63, u64::MAX - 3, u64::MAX]);
}

#[tokio::test]
async fn listing_is_per_gauntlet_and_newest_first() {
    let pool = setup().await;
    let store = HallOfFameStore::new(pool.pool());

    let first = store.record(&entry("pewter-run", 1)).await.unwrap();
    store.record(&entry("cerulean-run", 2)).await.unwrap();
    let third = store.record(&entry("pewter-run", 3)).await.unwrap();

    let pewter = store.list_by_gauntlet("pewter-run", 10).await.unwrap();
    let ids: Vec<_> = pewter.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![third.id, first.id]);

    assert_eq!(store.count_by_gauntlet("pewter-run").await.unwrap(), 2);
    assert_eq!(store.count_by_gauntlet("cerulean-run").await.unwrap(), 1);
    assert_eq!(store.count_by_gauntlet("vermilion-run").await.unwrap(), 0);

    let limited = store.list_by_gauntlet("pewter-run", 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, third.id);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let pool = setup().await;
    pool.run_migrations().await.unwrap();
    let store = HallOfFameStore::new(pool.pool());
    assert_eq!(store.count_by_gauntlet("pewter-run").await.unwrap(), 0);
}
