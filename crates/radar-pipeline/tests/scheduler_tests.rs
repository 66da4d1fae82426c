//! Scheduler tests against scripted product sources.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use radar_common::{LayerId, ProductCode, SiteCatalog};
use radar_pipeline::{
    FetchError, FrameStore, PipelineConfig, PipelineError, PipelineEvent, ProductFetcher,
    PublishOutcome, SlotState, UpdateScheduler,
};
use test_utils::level3::Level3Builder;
use test_utils::{eventually, times, within};
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

type Step = (Duration, Result<Bytes, FetchError>);

/// Serves queued responses per site, each after an optional delay.
#[derive(Default)]
struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
}

impl ScriptedFetcher {
    fn push(&self, site: &str, delay: Duration, response: Result<Bytes, FetchError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(site.to_string())
            .or_default()
            .push_back((delay, response));
    }

    fn push_product(&self, site: &str, bytes: Vec<u8>) {
        self.push(site, Duration::ZERO, Ok(Bytes::from(bytes)));
    }
}

#[async_trait]
impl ProductFetcher for ScriptedFetcher {
    async fn fetch_latest(&self, site: &str, product: ProductCode) -> Result<Bytes, FetchError> {
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(site)
            .and_then(VecDeque::pop_front);
        match step {
            Some((delay, response)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                response
            }
            None => Err(FetchError::NotFound {
                site: site.to_string(),
                product,
            }),
        }
    }
}

fn ktlx() -> LayerId {
    LayerId::new("KTLX", 94)
}

fn product_at(time: (u16, u32)) -> Vec<u8> {
    Level3Builder::new_digital()
        .with_volume_time(time)
        .with_uniform_levels(&[100; 40])
        .build()
}

fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, hour, minute, 0).unwrap()
}

fn scheduler(
    layers: Vec<LayerId>,
) -> (UpdateScheduler, Arc<ScriptedFetcher>, Arc<FrameStore>) {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = Arc::new(FrameStore::new(layers));
    let config = PipelineConfig {
        worker_pool_size: 2,
        ..Default::default()
    };
    let scheduler = UpdateScheduler::new(
        &config,
        fetcher.clone(),
        Arc::new(SiteCatalog::embedded().unwrap()),
        store.clone(),
    )
    .unwrap();
    (scheduler, fetcher, store)
}

#[tokio::test]
async fn test_update_publishes_frame() {
    let (scheduler, fetcher, store) = scheduler(vec![ktlx()]);
    let mut events = scheduler.subscribe_events();
    fetcher.push_product("KTLX", product_at(times::T1));

    let outcome = assert_ok!(scheduler.update(&ktlx()).await);
    assert_eq!(outcome, PublishOutcome::Published { superseded: None });

    let frame = store.current_frame(&ktlx()).unwrap();
    assert_eq!(frame.valid_time, at(22, 1));
    assert_eq!(frame.header.site_id, "TLX");
    assert_eq!(*store.subscribe(&ktlx()).unwrap().borrow(), 1);

    let status = store.status(&ktlx()).unwrap();
    assert_eq!(status.state, SlotState::Published);
    assert_eq!(status.current_frame, Some(frame.id));
    assert_eq!(status.in_flight, 0);

    match events.recv().await.unwrap() {
        PipelineEvent::Published {
            layer,
            frame: id,
            superseded,
            ..
        } => {
            assert_eq!(layer, ktlx());
            assert_eq!(id, frame.id);
            assert_eq!(superseded, None);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_refetching_same_product_keeps_frame() {
    let (scheduler, fetcher, store) = scheduler(vec![ktlx()]);
    fetcher.push_product("KTLX", product_at(times::T1));
    fetcher.push_product("KTLX", product_at(times::T1));

    assert_ok!(scheduler.update(&ktlx()).await);
    let first = store.current_frame(&ktlx()).unwrap();

    let err = assert_err!(scheduler.update(&ktlx()).await);
    assert!(matches!(err, PipelineError::Stale { .. }));

    let current = store.current_frame(&ktlx()).unwrap();
    assert!(Arc::ptr_eq(&first, &current));
    assert_eq!(*store.subscribe(&ktlx()).unwrap().borrow(), 1);
    let status = store.status(&ktlx()).unwrap();
    assert_eq!(status.state, SlotState::Published);
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn test_unchanged_scan_is_not_rebuilt() {
    let (scheduler, fetcher, store) = scheduler(vec![ktlx()]);
    let mut events = scheduler.subscribe_events();
    fetcher.push_product("KTLX", product_at(times::T1));
    // Same scan time, but a packet the frame builder cannot render.
    fetcher.push_product(
        "KTLX",
        Level3Builder::new_digital().with_packet_code(28).build(),
    );

    assert_ok!(scheduler.update(&ktlx()).await);
    let err = assert_err!(scheduler.update(&ktlx()).await);
    assert!(matches!(err, PipelineError::Stale { .. }), "{:?}", err);

    let status = store.status(&ktlx()).unwrap();
    assert_eq!(status.state, SlotState::Published);
    assert_eq!(status.in_flight, 0);
    assert!(status.last_error.is_none());

    events.recv().await.unwrap();
    assert!(matches!(
        events.recv().await.unwrap(),
        PipelineEvent::Stale { .. }
    ));
}

#[tokio::test]
async fn test_out_of_order_products_end_on_newest() {
    let (scheduler, fetcher, store) = scheduler(vec![ktlx()]);
    let mut events = scheduler.subscribe_events();
    fetcher.push_product("KTLX", product_at(times::T2));
    fetcher.push_product("KTLX", product_at(times::T1));

    assert_ok!(scheduler.update(&ktlx()).await);
    assert_err!(scheduler.update(&ktlx()).await);

    assert_eq!(store.current_frame(&ktlx()).unwrap().valid_time, at(22, 6));
    assert!(matches!(
        events.recv().await.unwrap(),
        PipelineEvent::Published { .. }
    ));
    match events.recv().await.unwrap() {
        PipelineEvent::Stale {
            candidate, current, ..
        } => {
            assert_eq!(candidate, at(22, 1));
            assert_eq!(current, at(22, 6));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_late_older_build_does_not_replace_newer() {
    let (scheduler, fetcher, store) = scheduler(vec![ktlx()]);
    fetcher.push(
        "KTLX",
        Duration::from_millis(200),
        Ok(Bytes::from(product_at(times::T1))),
    );
    fetcher.push_product("KTLX", product_at(times::T2));

    let layer = ktlx();
    let (late, early) = tokio::join!(scheduler.update(&layer), scheduler.update(&layer));

    assert!(matches!(late, Err(PipelineError::Stale { .. })));
    assert_eq!(early.unwrap(), PublishOutcome::Published { superseded: None });

    let current = store.current_frame(&layer).unwrap();
    assert_eq!(current.valid_time, at(22, 6));
    let status = store.status(&layer).unwrap();
    assert_eq!(status.in_flight, 0);
    assert_eq!(status.published_count, 1);
}

#[tokio::test]
async fn test_failed_update_keeps_prior_frame() {
    let (scheduler, fetcher, store) = scheduler(vec![ktlx()]);
    let mut events = scheduler.subscribe_events();
    fetcher.push_product("KTLX", product_at(times::T1));
    fetcher.push_product("KTLX", b"SDUS54 KOUN 062206\r\r\nN0QTLX\r\r\n\x00\x5e".to_vec());

    assert_ok!(scheduler.update(&ktlx()).await);
    let published = store.current_frame(&ktlx()).unwrap();

    let err = assert_err!(scheduler.update(&ktlx()).await);
    assert!(matches!(err, PipelineError::Decode(_)));

    assert_eq!(store.current_frame(&ktlx()).unwrap().id, published.id);
    let status = store.status(&ktlx()).unwrap();
    assert_eq!(status.state, SlotState::Published);
    assert!(status.last_error.is_some());

    // Published, then the failure
    events.recv().await.unwrap();
    match events.recv().await.unwrap() {
        PipelineEvent::UpdateFailed { layer, kind, .. } => {
            assert_eq!(layer, ktlx());
            assert_eq!(kind, err.kind());
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_failure_before_first_frame() {
    let (scheduler, _fetcher, store) = scheduler(vec![ktlx()]);

    let err = assert_err!(scheduler.update(&ktlx()).await);
    assert!(matches!(err, PipelineError::Fetch(FetchError::NotFound { .. })));
    assert_eq!(err.kind(), "fetch");

    assert!(store.current_frame(&ktlx()).is_none());
    let status = store.status(&ktlx()).unwrap();
    assert_eq!(status.state, SlotState::Empty);
    assert!(status.last_error.unwrap().contains("KTLX"));
}

#[tokio::test]
async fn test_subscriber_wakes_on_publish() {
    let (scheduler, fetcher, store) = scheduler(vec![ktlx()]);
    let mut generation = store.subscribe(&ktlx()).unwrap();
    fetcher.push_product("KTLX", product_at(times::T1));
    fetcher.push_product("KTLX", product_at(times::T3));

    let waiter = tokio::spawn(async move {
        generation.changed().await.unwrap();
        *generation.borrow_and_update()
    });

    assert_ok!(scheduler.update(&ktlx()).await);
    let seen = within(Duration::from_secs(5), waiter).await.unwrap();
    assert!(seen >= 1);

    assert_ok!(scheduler.update(&ktlx()).await);
    assert_eq!(*store.subscribe(&ktlx()).unwrap().borrow(), 2);
    assert_eq!(store.current_frame(&ktlx()).unwrap().valid_time, at(22, 11));
}

#[tokio::test]
async fn test_update_all_layers() {
    let kamx = LayerId::new("KAMX", 94);
    let (scheduler, fetcher, store) = scheduler(vec![ktlx(), kamx.clone()]);
    fetcher.push_product("KTLX", product_at(times::T1));
    fetcher.push_product(
        "KAMX",
        Level3Builder::new_digital()
            .with_wmo("SDUS52 KMFL 062201", "N0QAMX")
            .with_site_position(25.611, -80.413)
            .with_uniform_levels(&[100; 40])
            .build(),
    );

    let results = scheduler.update_all(&store.layers()).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, r)| r.is_ok()));

    let miami = store.current_frame(&kamx).unwrap();
    assert_eq!(miami.header.site_id, "AMX");
    let (lon, lat) = miami.bbox().center();
    assert!((lat - 25.61).abs() < 0.1);
    assert!((lon + 80.41).abs() < 0.1);
}

#[tokio::test]
async fn test_run_forever_stops_on_shutdown() {
    let (scheduler, fetcher, store) = scheduler(vec![ktlx()]);
    fetcher.push_product("KTLX", product_at(times::T1));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let stopper = async {
        let published = eventually(Duration::from_secs(5), || {
            store.current_frame(&ktlx()).is_some()
        })
        .await;
        shutdown_tx.send(()).unwrap();
        published
    };
    let ((), published) = within(
        Duration::from_secs(10),
        futures::future::join(scheduler.run_forever(shutdown_rx), stopper),
    )
    .await;

    assert!(published);
    assert_eq!(store.status(&ktlx()).unwrap().published_count, 1);
}

#[tokio::test]
async fn test_unknown_layer_rejected() {
    let (scheduler, _fetcher, store) = scheduler(vec![ktlx()]);
    let other = LayerId::new("KAMX", 94);

    let err = assert_err!(scheduler.update(&other).await);
    assert!(matches!(err, PipelineError::UnknownLayer(_)));
    assert!(store.status(&other).is_none());
}

#[test]
fn test_invalid_config_rejected() {
    let config = PipelineConfig {
        worker_pool_size: 0,
        ..Default::default()
    };
    let result = UpdateScheduler::new(
        &config,
        Arc::new(ScriptedFetcher::default()),
        Arc::new(SiteCatalog::default()),
        Arc::new(FrameStore::new([ktlx()])),
    );
    assert!(matches!(result, Err(PipelineError::Config(_))));
}
