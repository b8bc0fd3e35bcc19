use std::sync::Arc;
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use equipment_pulse::config::Config;
use equipment_pulse::{AppState, IngestError, SummaryId};
use tempfile::TempDir;

const PLANT: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                     Pump-1,Pump,100,5,300\n\
                     Valve-1,Valve,120,5.5,310\n";

fn file_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.history.path = dir.path().join("history.json");
    config.analytics.seed = Some(5);
    config
}

#[test]
fn test_history_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    {
        let state = AppState::open(&config).unwrap();
        for i in 0..7 {
            state
                .ingest_at(&format!("batch-{i}.csv"), PLANT.as_bytes(), start + Duration::minutes(i))
                .unwrap();
        }
    }

    let state = AppState::open(&config).unwrap();
    let history = state.history(10);
    assert_eq!(history.len(), 5);
    let ids: Vec<SummaryId> = history.iter().map(|s| s.id()).collect();
    assert_eq!(
        ids,
        vec![SummaryId(7), SummaryId(6), SummaryId(5), SummaryId(4), SummaryId(3)]
    );

    let next = state
        .ingest_at("batch-7.csv", PLANT.as_bytes(), start + Duration::minutes(7))
        .unwrap();
    assert_eq!(next.summary.id(), SummaryId(8));
    assert_eq!(next.evicted.map(|s| s.id()), Some(SummaryId(3)));
}

#[test]
fn test_ids_are_not_reused_after_backdated_upload_and_restart() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    {
        let state = AppState::open(&config).unwrap();
        for i in 0..5 {
            state
                .ingest_at(&format!("late-{i}.csv"), PLANT.as_bytes(), start + Duration::minutes(10 + i))
                .unwrap();
        }
        let backdated = state
            .ingest_at("backdated.csv", PLANT.as_bytes(), start)
            .unwrap();
        assert_eq!(backdated.summary.id(), SummaryId(6));
        assert_eq!(backdated.evicted.map(|s| s.id()), Some(SummaryId(6)));
    }

    let state = AppState::open(&config).unwrap();
    let next = state
        .ingest_at("after-restart.csv", PLANT.as_bytes(), start + Duration::minutes(30))
        .unwrap();
    assert_eq!(next.summary.id(), SummaryId(7));
}

#[test]
fn test_huge_values_survive_persistence() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);
    {
        let state = AppState::open(&config).unwrap();
        let summary = state
            .ingest("huge.csv", b"Flowrate\n1e308\n1e308\n")
            .unwrap()
            .summary;
        assert_eq!(summary.avg_flowrate(), Some(1e308));
    }

    let state = AppState::open(&config).unwrap();
    let reloaded = state.latest().unwrap().avg_flowrate();
    assert!(reloaded.is_some_and(|v| (v / 1e308 - 1.0).abs() < 1e-12));
}

#[test]
fn test_rejected_upload_is_not_persisted() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);
    let state = AppState::open(&config).unwrap();

    let err = state.ingest("broken.csv", b"Flowrate,Pressure\nx,y\n").unwrap_err();
    assert!(matches!(err, IngestError::EmptyColumn { .. }));
    assert!(!config.history.path.exists());
    assert!(state.history(5).is_empty());
}

#[test]
fn test_analytics_for_retained_dataset() {
    let dir = TempDir::new().unwrap();
    let state = AppState::open(&file_config(&dir)).unwrap();
    let summary = state.ingest("plant.csv", PLANT.as_bytes()).unwrap().summary;

    let report = state.analyze(&summary);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["summary_id"], serde_json::json!(summary.id().0));
    assert_eq!(json["correlation"]["values"][0][0], serde_json::json!(1.0));
    assert_eq!(json["trend"].as_array().map(Vec::len), Some(12));
}

#[test]
fn test_parallel_uploads_share_one_state() {
    let state = Arc::new(AppState::in_memory(&Config::default()).unwrap());
    let handles: Vec<_> = (0..6)
        .map(|t| {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for i in 0..10 {
                    state
                        .ingest(&format!("t{t}-{i}.csv"), PLANT.as_bytes())
                        .unwrap();
                    assert!(state.history(100).len() <= 5);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let history = state.history(100);
    assert_eq!(history.len(), 5);
    let mut ids: Vec<u64> = history.iter().map(|s| s.id().0).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}
