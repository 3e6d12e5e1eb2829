//! Day rotation, append-only semantics and ingestion into the store

mod common;

use chrono::NaiveDate;
use common::{counter, header, lines, RecordingEmitter};
use pcount_replay::emitter::{ChannelEmitter, Emitter, JsonlEmitter};
use pcount_replay::ingest::{ingest_channel, ingest_jsonl};
use pcount_replay::replay::{PacingEngine, PacingSettings};
use pcount_replay::store::{expand_message, DateSource, RotatingLogStore};
use std::sync::{Arc, Mutex};
use tokio::io::BufReader;

/// Wall clock that tests can move forward
#[derive(Clone)]
struct ManualDate(Arc<Mutex<NaiveDate>>);

impl ManualDate {
    fn new(y: i32, m: u32, d: u32) -> Self {
        Self(Arc::new(Mutex::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())))
    }

    fn set(&self, y: i32, m: u32, d: u32) {
        *self.0.lock().unwrap() = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    }
}

impl DateSource for ManualDate {
    fn today(&self) -> NaiveDate {
        *self.0.lock().unwrap()
    }
}

fn read(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_rotation_across_date_change() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualDate::new(2021, 1, 1);
    let store = RotatingLogStore::with_clock(dir.path(), clock.clone());

    store.store("row-1");
    store.store("row-2");
    clock.set(2021, 1, 2);
    store.store("row-3");

    assert_eq!(read(&dir.path().join("2021-01-01.csv")), vec!["row-1", "row-2"]);
    assert_eq!(read(&dir.path().join("2021-01-02.csv")), vec!["row-3"]);
}

#[test]
fn test_day_key_ignores_event_time() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualDate::new(2024, 6, 30);
    let store = RotatingLogStore::with_clock(dir.path(), clock);

    // event lines dated 2021 still land in the wall-clock day file
    store.store("2021-01-01T09:00:01Z,dev1,1,counter,zoneA,IN,170");
    assert!(dir.path().join("2024-06-30.csv").exists());
    assert!(!dir.path().join("2021-01-01.csv").exists());
}

#[test]
fn test_reopen_appends_instead_of_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualDate::new(2021, 1, 1);

    RotatingLogStore::with_clock(dir.path(), clock.clone()).store("first");
    RotatingLogStore::with_clock(dir.path(), clock).store("second");

    assert_eq!(read(&dir.path().join("2021-01-01.csv")), vec!["first", "second"]);
}

#[test]
fn test_concurrent_callers_do_not_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RotatingLogStore::with_clock(
        dir.path(),
        ManualDate::new(2021, 1, 1),
    ));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    store.store(&format!("worker-{}-row-{:03}", worker, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let rows = read(&dir.path().join("2021-01-01.csv"));
    assert_eq!(rows.len(), 800);
    assert!(rows.iter().all(|r| r.starts_with("worker-") && r.len() == "worker-0-row-000".len()));
}

#[tokio::test]
async fn test_replaying_twice_appends_all_rows_twice() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RotatingLogStore::with_clock(
        dir.path(),
        ManualDate::new(2021, 1, 1),
    ));
    let input = lines(&[
        header(0, "a"),
        counter(1, 1),
        counter(2, 2),
        header(3, "b"),
        counter(4, 3),
        header(5, "c"),
    ]);

    for _ in 0..2 {
        let (emitter, rx) = ChannelEmitter::channel(16);
        let ingest = tokio::spawn(ingest_channel(rx, store.clone()));
        {
            let emitter: Arc<dyn Emitter> = Arc::new(emitter);
            let settings = PacingSettings {
                speed: 0.0,
                ..Default::default()
            };
            PacingEngine::new(emitter, &settings)
                .run(input.as_bytes())
                .await
                .unwrap();
        }
        let summary = ingest.await.unwrap();
        assert_eq!(summary.snapshots, 2);
        assert_eq!(summary.events, 3);
    }

    let rows = read(&dir.path().join("2021-01-01.csv"));
    // (header + 2 events) + (header + 1 event), twice
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[..5], rows[5..]);
    assert!(rows[0].contains(",a,"));
    assert!(rows[1].ends_with(",1,counter,zoneA,IN,170"));
    assert!(rows[3].contains(",b,"));
}

#[tokio::test]
async fn test_ingest_jsonl_skips_undecodable_lines() {
    let dir = tempfile::tempdir().unwrap();
    let feed = dir.path().join("feed.jsonl");

    // publish two frames through the JSONL emitter, then corrupt the feed
    let recorder = Arc::new(RecordingEmitter::new());
    {
        let jsonl: Arc<dyn Emitter> = Arc::new(JsonlEmitter::open(&feed).unwrap());
        let input = lines(&[header(0, "a"), counter(1, 1), header(2, "b"), counter(3, 2)]);
        let settings = PacingSettings {
            speed: 0.0,
            ..Default::default()
        };
        PacingEngine::new(jsonl, &settings).run(input.as_bytes()).await.unwrap();
        PacingEngine::new(recorder.clone(), &settings)
            .run(input.as_bytes())
            .await
            .unwrap();
    }
    let mut content = std::fs::read_to_string(&feed).unwrap();
    content.push_str("{not json}\n");
    std::fs::write(&feed, content).unwrap();

    let store_dir = dir.path().join("store");
    let store = Arc::new(RotatingLogStore::with_clock(
        &store_dir,
        ManualDate::new(2021, 1, 1),
    ));
    let file = tokio::fs::File::open(&feed).await.unwrap();
    let summary = ingest_jsonl(BufReader::new(file), store).await.unwrap();

    assert_eq!(summary.messages, 2);
    assert_eq!(summary.decode_failures, 1);

    let expected: Vec<String> = recorder.messages().iter().flat_map(expand_message).collect();
    assert_eq!(read(&store_dir.join("2021-01-01.csv")), expected);
}
