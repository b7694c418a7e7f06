//! End-to-end coordination tests: full sessions with scripted data sources

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wordglance::api::testing::ScriptedSource;
use wordglance::api::DataSource;
use wordglance::{
    Action, ActionHandler, ApiResponse, Config, DashboardSession, DataRow, DependencyEdge, Effects,
    FetchError, Projection, QueryOverride, SubqueryExtract, SubqueryPayload, SubqueryValue,
    TileConfig, TilePhase, TileQuery,
};

/// Bus observer recording every action the session dispatches
struct Tap(Arc<Mutex<Vec<Action>>>);

impl ActionHandler for Tap {
    fn handle(&mut self, action: &Action, _effects: &mut Effects) {
        self.0.lock().unwrap().push(action.clone());
    }
}

fn tile(id: &str, subquery: Option<SubqueryExtract>) -> TileConfig {
    TileConfig {
        id: id.to_string(),
        endpoint: format!("https://corpora.example.org/{id}"),
        subquery,
        query: TileQuery {
            corpus_name: "syn2020".to_string(),
            conc_id: "abc123".to_string(),
            criterion: vec!["word 0".to_string()],
            ..TileQuery::default()
        },
    }
}

fn rows(entries: &[(&str, u64)]) -> Vec<DataRow> {
    entries
        .iter()
        .map(|(value, count)| DataRow {
            value: value.to_string(),
            count: *count,
        })
        .collect()
}

fn ok(entries: &[(&str, u64)]) -> Result<ApiResponse, FetchError> {
    Ok(ApiResponse {
        conc_persistence_id: None,
        rows: rows(entries),
    })
}

fn request(tile: &str) -> Action {
    Action::TileRequestData {
        tile_id: tile.to_string(),
        overrides: None,
    }
}

#[tokio::test]
async fn test_producer_result_parameterizes_consumer_query() {
    // freqDist produces its max count; syntacticColls queries with it as limit
    let config = Config {
        tiles: vec![
            tile("freqDist", Some(SubqueryExtract::MaxCount)),
            tile("syntacticColls", None),
        ],
        edges: vec![DependencyEdge {
            producer: "freqDist".to_string(),
            consumer: "syntacticColls".to_string(),
            projection: Projection::CountAsLimit,
        }],
        ..Config::default()
    };

    let colls_source = Arc::new(ScriptedSource::immediate([ok(&[("sit", 40)])]));
    let sources: HashMap<String, Arc<dyn DataSource>> = HashMap::from([
        (
            "freqDist".to_string(),
            Arc::new(ScriptedSource::immediate([ok(&[("dog", 120)])])) as Arc<dyn DataSource>,
        ),
        (
            "syntacticColls".to_string(),
            Arc::clone(&colls_source) as Arc<dyn DataSource>,
        ),
    ]);

    let observed = Arc::new(Mutex::new(Vec::new()));
    let (mut session, handle) = DashboardSession::build(&config, sources).unwrap();
    session.observe(Box::new(Tap(Arc::clone(&observed))));
    let task = tokio::spawn(session.run());

    handle.dispatch(request("freqDist")).await.unwrap();
    handle.settled().await.unwrap();

    // The full bus traffic, in order, and nothing else
    let actions = observed.lock().unwrap().clone();
    let names: Vec<(&str, Option<String>)> = actions
        .iter()
        .map(|a| (a.name(), a.tile_id().map(str::to_string)))
        .collect();
    assert_eq!(
        names,
        vec![
            ("TileRequestData", Some("freqDist".to_string())),
            ("TileResponse", Some("freqDist".to_string())),
            ("TileDataLoaded", Some("freqDist".to_string())),
            ("TileRequestData", Some("syntacticColls".to_string())),
            ("TileResponse", Some("syntacticColls".to_string())),
            ("TileDataLoaded", Some("syntacticColls".to_string())),
        ]
    );

    // The producer's loaded action carries the derived value
    assert_eq!(
        actions[2],
        Action::TileDataLoaded {
            tile_id: "freqDist".to_string(),
            is_empty: false,
            subquery: Some(SubqueryPayload {
                tile_id: "freqDist".to_string(),
                value: SubqueryValue::MaxCount(120),
            }),
        }
    );

    // The propagator-synthesized request injects the limit override
    assert_eq!(
        actions[3],
        Action::TileRequestData {
            tile_id: "syntacticColls".to_string(),
            overrides: Some(QueryOverride {
                limit: Some(120),
                ..QueryOverride::default()
            }),
        }
    );

    // And the consumer's wire call went out with limit "120"
    let calls = colls_source.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].limit, "120");
    assert_eq!(calls[0].q, "~abc123");

    let snap = handle.tile("syntacticColls").unwrap();
    assert_eq!(snap.phase, TilePhase::Loaded);
    assert_eq!(snap.data.as_deref(), Some(&rows(&[("sit", 40)])[..]));

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_two_producer_consumer_fires_once_regardless_of_order() {
    // Run the same graph with both completion orders; the consumer must be
    // triggered exactly once each time.
    for (delay_a, delay_b) in [(10u64, 30u64), (30, 10)] {
        let config = Config {
            tiles: vec![
                tile("freqDist", Some(SubqueryExtract::MaxCount)),
                tile("concordance", Some(SubqueryExtract::ConcId)),
                tile("collocations", None),
            ],
            edges: vec![
                DependencyEdge {
                    producer: "freqDist".to_string(),
                    consumer: "collocations".to_string(),
                    projection: Projection::CountAsLimit,
                },
                DependencyEdge {
                    producer: "concordance".to_string(),
                    consumer: "collocations".to_string(),
                    projection: Projection::ConcIdAsQuery,
                },
            ],
            ..Config::default()
        };

        let sources: HashMap<String, Arc<dyn DataSource>> = HashMap::from([
            (
                "freqDist".to_string(),
                Arc::new(ScriptedSource::new([(
                    Duration::from_millis(delay_a),
                    ok(&[("dog", 120)]),
                )])) as Arc<dyn DataSource>,
            ),
            (
                "concordance".to_string(),
                Arc::new(ScriptedSource::new([(
                    Duration::from_millis(delay_b),
                    Ok(ApiResponse {
                        conc_persistence_id: Some("xyz789".to_string()),
                        rows: rows(&[("dog", 120)]),
                    }),
                )])) as Arc<dyn DataSource>,
            ),
            (
                "collocations".to_string(),
                Arc::new(ScriptedSource::immediate([ok(&[("bark", 12)])]))
                    as Arc<dyn DataSource>,
            ),
        ]);

        let observed = Arc::new(Mutex::new(Vec::new()));
        let (mut session, handle) = DashboardSession::build(&config, sources).unwrap();
        session.observe(Box::new(Tap(Arc::clone(&observed))));
        let task = tokio::spawn(session.run());

        handle.submit_query("dog").await.unwrap();
        handle.settled().await.unwrap();

        let actions = observed.lock().unwrap().clone();
        let consumer_triggers: Vec<&Action> = actions
            .iter()
            .filter(|a| a.name() == "TileRequestData" && a.tile_id() == Some("collocations"))
            .collect();
        assert_eq!(
            consumer_triggers.len(),
            1,
            "consumer must fire once for delays ({delay_a}, {delay_b})"
        );
        match consumer_triggers[0] {
            Action::TileRequestData {
                overrides: Some(overrides),
                ..
            } => {
                assert_eq!(overrides.limit, Some(120));
                assert_eq!(overrides.conc_id.as_deref(), Some("xyz789"));
            }
            _ => panic!("consumer trigger without overrides"),
        }

        let snap = handle.tile("collocations").unwrap();
        assert_eq!(snap.phase, TilePhase::Loaded);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_stale_response_never_overwrites_newer_data() {
    let config = Config {
        tiles: vec![tile("freqDist", None)],
        ..Config::default()
    };
    // R1 answers slowly, R2 quickly: R2's rows must win even though R1's
    // response arrives last.
    let sources: HashMap<String, Arc<dyn DataSource>> = HashMap::from([(
        "freqDist".to_string(),
        Arc::new(ScriptedSource::new([
            (Duration::from_millis(50), ok(&[("old", 1)])),
            (Duration::from_millis(10), ok(&[("new", 2)])),
        ])) as Arc<dyn DataSource>,
    )]);

    let (session, handle) = DashboardSession::build(&config, sources).unwrap();
    let task = tokio::spawn(session.run());

    handle.dispatch(request("freqDist")).await.unwrap();
    handle.dispatch(request("freqDist")).await.unwrap();
    handle.settled().await.unwrap();

    let snap = handle.tile("freqDist").unwrap();
    assert_eq!(snap.phase, TilePhase::Loaded);
    assert_eq!(snap.data.as_deref(), Some(&rows(&[("new", 2)])[..]));

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_producer_failure_does_not_cascade() {
    let config = Config {
        tiles: vec![
            tile("freqDist", Some(SubqueryExtract::MaxCount)),
            tile("syntacticColls", None),
        ],
        edges: vec![DependencyEdge {
            producer: "freqDist".to_string(),
            consumer: "syntacticColls".to_string(),
            projection: Projection::CountAsLimit,
        }],
        ..Config::default()
    };

    let sources: HashMap<String, Arc<dyn DataSource>> = HashMap::from([
        (
            "freqDist".to_string(),
            Arc::new(ScriptedSource::immediate([Err(FetchError::InternalError(
                "upstream offline".to_string(),
            ))])) as Arc<dyn DataSource>,
        ),
        (
            "syntacticColls".to_string(),
            Arc::new(ScriptedSource::immediate([ok(&[("sit", 40)])])) as Arc<dyn DataSource>,
        ),
    ]);

    let observed = Arc::new(Mutex::new(Vec::new()));
    let (mut session, handle) = DashboardSession::build(&config, sources).unwrap();
    session.observe(Box::new(Tap(Arc::clone(&observed))));
    let task = tokio::spawn(session.run());

    handle.submit_query("dog").await.unwrap();
    handle.settled().await.unwrap();

    // The producer failed in isolation...
    let producer = handle.tile("freqDist").unwrap();
    assert_eq!(producer.phase, TilePhase::Failed);
    assert_eq!(
        producer.error.as_deref(),
        Some("Internal error: upstream offline")
    );
    assert!(producer.data.is_none());

    // ...and the consumer was never even asked to load
    let consumer = handle.tile("syntacticColls").unwrap();
    assert_eq!(consumer.phase, TilePhase::Idle);
    let actions = observed.lock().unwrap().clone();
    assert!(
        !actions
            .iter()
            .any(|a| a.tile_id() == Some("syntacticColls")),
        "no action may reach the consumer tile"
    );
    assert!(actions
        .iter()
        .any(|a| a.name() == "TileDataFailed" && a.tile_id() == Some("freqDist")));

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_action_log_records_the_whole_round() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        action_log_dir: Some(dir.path().to_path_buf()),
        tiles: vec![tile("freqDist", None)],
        ..Config::default()
    };
    let sources: HashMap<String, Arc<dyn DataSource>> = HashMap::from([(
        "freqDist".to_string(),
        Arc::new(ScriptedSource::immediate([ok(&[("dog", 120)])])) as Arc<dyn DataSource>,
    )]);

    let (session, handle) = DashboardSession::build(&config, sources).unwrap();
    let task = tokio::spawn(session.run());

    handle.submit_query("dog").await.unwrap();
    handle.settled().await.unwrap();
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    let log_file = std::fs::read_dir(dir.path())
        .unwrap()
        .next()
        .expect("one log file")
        .unwrap()
        .path();
    let entries = wordglance::read_action_log(&log_file).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.action.name()).collect();
    assert_eq!(
        names,
        vec![
            "QuerySubmitted",
            "TileRequestData",
            "TileResponse",
            "TileDataLoaded",
        ]
    );
}
