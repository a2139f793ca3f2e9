//! End-to-end checks against a live PostgreSQL server.
//!
//! Skipped unless `EVENTQ_TEST_DATABASE_URL` is set. Each test works in its
//! own schema, dropped on the way out.

use domain::event::{Event, Tag};
use domain::filter::Filter;
use domain::limits::BackendLimits;
use edge::db::PgEventStore;
use futures::StreamExt;
use serve::{Error as ServeError, EventBackend};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const TEST_TIMEOUT: Duration = Duration::from_secs(30);
const URL_VAR: &str = "EVENTQ_TEST_DATABASE_URL";

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

struct Scratch {
    admin: PgPool,
    schema: String,
    pool: PgPool,
}

impl Scratch {
    async fn open(name: &str) -> Option<Self> {
        let url = std::env::var(URL_VAR).ok()?;
        let schema = format!("eventq_test_{}_{}", name, std::process::id());

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        sqlx::query(&format!("DROP SCHEMA IF EXISTS \"{schema}\" CASCADE"))
            .execute(&admin)
            .await
            .unwrap();
        sqlx::query(&format!("CREATE SCHEMA \"{schema}\""))
            .execute(&admin)
            .await
            .unwrap();

        let opts = PgConnectOptions::from_str(&url)
            .unwrap()
            .options([("search_path", schema.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .unwrap();

        Some(Self { admin, schema, pool })
    }

    async fn create_table(&self) {
        sqlx::query(
            "CREATE TABLE event (
                id text NOT NULL,
                pubkey text NOT NULL,
                created_at integer NOT NULL,
                kind integer NOT NULL,
                tags jsonb NOT NULL,
                content text NOT NULL,
                sig text NOT NULL,
                tagvalues text[]
            )",
        )
        .execute(&self.pool)
        .await
        .unwrap();
    }

    async fn insert(&self, e: &Event) {
        self.insert_raw(e, e.kind as i32).await;
    }

    async fn insert_raw(&self, e: &Event, kind: i32) {
        let tagvalues: Vec<String> = e.tag_values().map(str::to_owned).collect();
        sqlx::query(
            "INSERT INTO event (id, pubkey, created_at, kind, tags, content, sig, tagvalues)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&e.id)
        .bind(&e.pubkey)
        .bind(e.created_at as i32)
        .bind(kind)
        .bind(Json(&e.tags))
        .bind(&e.content)
        .bind(&e.sig)
        .bind(tagvalues)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    fn backend(&self, limits: BackendLimits) -> EventBackend<PgEventStore> {
        EventBackend::new(PgEventStore::from_pool(self.pool.clone()), limits)
    }

    async fn close(self) {
        self.pool.close().await;
        sqlx::query(&format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", self.schema))
            .execute(&self.admin)
            .await
            .unwrap();
    }
}

fn event(n: u64, author: u64, created_at: i64, kind: u32, tags: &[&[&str]]) -> Event {
    Event {
        id: format!("{n:064x}"),
        pubkey: format!("{author:064x}"),
        created_at,
        kind,
        tags: tags
            .iter()
            .map(|t| Tag(t.iter().map(|s| s.to_string()).collect()))
            .collect(),
        content: format!("event {n}"),
        sig: "0".repeat(128),
    }
}

async fn collect(backend: &EventBackend<PgEventStore>, filter: &Filter) -> Vec<Result<Event, ServeError>> {
    let stream = backend
        .query_events(Some(filter), CancellationToken::new())
        .await
        .unwrap();
    stream.collect().await
}

async fn ids(backend: &EventBackend<PgEventStore>, filter: &Filter) -> Vec<String> {
    collect(backend, filter)
        .await
        .into_iter()
        .map(|r| r.unwrap().id)
        .collect()
}

/// Seed: five kind-1 notes at t=100..=500 from author 1, one kind-7 reaction.
async fn seeded(name: &str) -> Option<Scratch> {
    let db = Scratch::open(name).await?;
    db.create_table().await;
    for n in 1..=5u64 {
        let tags: &[&[&str]] = if n % 2 == 0 { &[&["t", "even"]] } else { &[&["t", "odd"]] };
        db.insert(&event(n, 1, n as i64 * 100, 1, tags)).await;
    }
    db.insert(&event(0xab, 2, 600, 7, &[&["e", "target"], &["p", "someone"]]))
        .await;
    Some(db)
}

// ─────────────────────────────────────────────────────────────────────────────
// 1) Rows shape
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn kinds_and_time_range_newest_first() {
    let Some(db) = seeded("range").await else { return };
    let backend = db.backend(BackendLimits::default());

    let filter = Filter {
        kinds: Some(vec![1]),
        since: Some(200),
        until: Some(400),
        ..Filter::default()
    };
    let got = timeout(TEST_TIMEOUT, ids(&backend, &filter)).await.unwrap();
    assert_eq!(got, vec![format!("{:064x}", 4), format!("{:064x}", 3), format!("{:064x}", 2)]);

    db.close().await;
}

#[tokio::test]
async fn decoded_event_matches_stored_event() {
    let Some(db) = seeded("decode").await else { return };
    let backend = db.backend(BackendLimits::default());

    let filter = Filter {
        kinds: Some(vec![7]),
        ..Filter::default()
    };
    let got = timeout(TEST_TIMEOUT, collect(&backend, &filter)).await.unwrap();
    assert_eq!(got.len(), 1);
    let e = got.into_iter().next().unwrap().unwrap();
    assert_eq!(e, event(0xab, 2, 600, 7, &[&["e", "target"], &["p", "someone"]]));

    db.close().await;
}

#[tokio::test]
async fn tag_values_overlap_ignores_tag_name() {
    let Some(db) = seeded("tags").await else { return };
    let backend = db.backend(BackendLimits::default());

    let mut filter = Filter::default();
    filter.tags.insert("x".into(), vec!["even".into(), "target".into()]);
    let got = timeout(TEST_TIMEOUT, ids(&backend, &filter)).await.unwrap();
    assert_eq!(
        got,
        vec![format!("{:064x}", 0xab), format!("{:064x}", 4), format!("{:064x}", 2)]
    );

    db.close().await;
}

#[tokio::test]
async fn id_and_author_prefixes_match() {
    let Some(db) = seeded("prefix").await else { return };
    let backend = db.backend(BackendLimits::default());

    let filter = Filter {
        ids: Some(vec![format!("{:064x}", 3), format!("{:064x}", 5)]),
        authors: Some(vec![format!("{:064x}", 1)]),
        ..Filter::default()
    };
    let got = timeout(TEST_TIMEOUT, ids(&backend, &filter)).await.unwrap();
    assert_eq!(got, vec![format!("{:064x}", 5), format!("{:064x}", 3)]);

    db.close().await;
}

#[tokio::test]
async fn limit_caps_rows() {
    let Some(db) = seeded("limit").await else { return };
    let backend = db.backend(BackendLimits::default());

    let filter = Filter {
        limit: Some(2),
        ..Filter::default()
    };
    let got = timeout(TEST_TIMEOUT, ids(&backend, &filter)).await.unwrap();
    assert_eq!(got, vec![format!("{:064x}", 0xab), format!("{:064x}", 5)]);

    db.close().await;
}

#[tokio::test]
async fn undecodable_row_ends_stream_with_error() {
    let Some(db) = seeded("baddecode").await else { return };
    db.insert_raw(&event(0xee, 3, 900, 0, &[]), -1).await;
    let backend = db.backend(BackendLimits::default());

    let got = timeout(TEST_TIMEOUT, collect(&backend, &Filter::default()))
        .await
        .unwrap();
    // Newest row is the bad one; nothing follows the terminal error.
    assert_eq!(got.len(), 1);
    assert!(matches!(got[0], Err(ServeError::RowDecode(_))));

    db.close().await;
}

#[tokio::test]
async fn missing_table_fails_before_any_event() {
    let Some(db) = Scratch::open("notable").await else { return };
    let backend = db.backend(BackendLimits::default());

    let res = timeout(
        TEST_TIMEOUT,
        backend.query_events(Some(&Filter::default()), CancellationToken::new()),
    )
    .await
    .unwrap();
    match res {
        Err(ServeError::Storage { query, .. }) => assert!(query.contains("FROM \"event\"")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a storage error"),
    }

    db.close().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// 2) Count shape
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn count_agrees_with_rows_and_respects_limit() {
    let Some(db) = seeded("count").await else { return };
    let backend = db.backend(BackendLimits::default());

    let notes = Filter {
        kinds: Some(vec![1]),
        ..Filter::default()
    };
    let n = timeout(TEST_TIMEOUT, backend.count_events(Some(&notes), CancellationToken::new()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 5);
    assert_eq!(n as usize, ids(&backend, &notes).await.len());

    let capped = Filter {
        limit: Some(3),
        ..Filter::default()
    };
    let n = backend.count_events(Some(&capped), CancellationToken::new()).await.unwrap();
    assert_eq!(n, 3);

    let none = Filter {
        kinds: Some(vec![30023]),
        ..Filter::default()
    };
    assert_eq!(backend.count_events(Some(&none), CancellationToken::new()).await.unwrap(), 0);

    db.close().await;
}

#[tokio::test]
async fn cancelled_count_returns_cancelled() {
    let Some(db) = seeded("cancel").await else { return };
    let backend = db.backend(BackendLimits::default());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let res = backend.count_events(Some(&Filter::default()), cancel).await;
    assert!(matches!(res, Err(ServeError::Cancelled)));

    db.close().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// 3) Empty-result filters never reach storage
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_filters_succeed_without_a_table() {
    let Some(db) = Scratch::open("empty").await else { return };
    let backend = db.backend(BackendLimits::default());

    let empty_ids = Filter {
        ids: Some(vec![]),
        ..Filter::default()
    };
    let no_kinds = Filter {
        kinds: Some(vec![]),
        ..Filter::default()
    };
    let mut empty_tag = Filter::default();
    empty_tag.tags.insert("e".into(), vec![]);

    for f in [&empty_ids, &no_kinds, &empty_tag] {
        assert!(collect(&backend, f).await.is_empty());
        assert_eq!(
            backend.count_events(Some(f), CancellationToken::new()).await.unwrap(),
            0
        );
    }

    db.close().await;
}
