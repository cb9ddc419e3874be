// End-to-end fetch cycles against an in-memory source
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use telemetry_core::{
    parse_batch, CanonicalField, CycleOutcome, Poller, PollerConfig, Publication, RawRow,
    RenderTarget, Result, RowSource,
};

/// Returns whatever body is currently loaded
#[derive(Clone, Default)]
struct SwappableSource {
    body: Arc<Mutex<String>>,
}

impl SwappableSource {
    fn serve(&self, body: &str) {
        *self.body.lock() = body.to_string();
    }
}

#[async_trait]
impl RowSource for SwappableSource {
    async fn fetch_rows(&self, _url: &str) -> Result<Vec<RawRow>> {
        let body = self.body.lock().clone();
        parse_batch(&body)
    }
}

/// Keeps every publication it receives
#[derive(Clone, Default)]
struct RecordingTarget {
    seen: Arc<Mutex<Vec<Publication>>>,
}

impl RenderTarget for RecordingTarget {
    fn name(&self) -> &str {
        "recording"
    }

    fn update(&mut self, publication: &Publication) -> Result<()> {
        self.seen.lock().push(publication.clone());
        Ok(())
    }
}

const URL: &str = "http://sensors.local/rows";

fn setup() -> (Poller<SwappableSource>, SwappableSource, RecordingTarget) {
    let _ = env_logger::builder().is_test(true).try_init();

    let source = SwappableSource::default();
    let target = RecordingTarget::default();
    let poller = Poller::new(source.clone(), PollerConfig::new());
    poller.add_render_target(Box::new(target.clone()));
    (poller, source, target)
}

#[tokio::test]
async fn test_header_aliases_scenario() {
    let (poller, source, target) = setup();
    source.serve(
        r#"[{"PH":"7.1","Sal":"35","TS":"10:00:00"},{"PH":"7.3","Sal":"36","TS":"10:05:00"}]"#,
    );

    let outcome = poller.fetch_once(URL).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Published { records: 2 });

    let mapping = poller.mapping();
    assert_eq!(mapping.header(CanonicalField::Ph), Some("PH"));
    assert_eq!(mapping.header(CanonicalField::Salinity), Some("Sal"));
    assert_eq!(mapping.header(CanonicalField::Timestamp), Some("TS"));
    assert_eq!(mapping.len(), 3);

    let history = poller.history();
    let records = history.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ph, Some(7.1));
    assert_eq!(records[0].salinity, Some(35.0));
    assert_eq!(records[0].timestamp, "10:00:00");
    assert_eq!(records[1].ph, Some(7.3));
    assert_eq!(records[1].salinity, Some(36.0));
    assert_eq!(records[1].timestamp, "10:05:00");
    assert_eq!(records[1].speed, None);
    assert!(!records[1].leak);
    assert_eq!(poller.latest().as_ref(), records.last());

    let seen = target.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].latest.as_ref(), records.last());
}

#[tokio::test]
async fn test_empty_payload_keeps_history() {
    let (poller, source, target) = setup();
    source.serve(r#"[{"ph":"7.0"}]"#);
    poller.fetch_once(URL).await.unwrap();

    source.serve("[]");
    assert_eq!(poller.fetch_once(URL).await.unwrap(), CycleOutcome::Empty);
    source.serve("null");
    assert_eq!(poller.fetch_once(URL).await.unwrap(), CycleOutcome::Empty);

    assert_eq!(poller.history().len(), 1);
    assert_eq!(poller.latest().unwrap().ph, Some(7.0));
    // Only the first cycle published
    assert_eq!(target.seen.lock().len(), 1);
}

#[tokio::test]
async fn test_empty_payload_on_fresh_session() {
    let (poller, source, target) = setup();
    source.serve("[]");

    assert_eq!(poller.fetch_once(URL).await.unwrap(), CycleOutcome::Empty);
    assert!(poller.history().is_empty());
    assert!(poller.latest().is_none());
    assert!(target.seen.lock().is_empty());
}

#[tokio::test]
async fn test_leak_detected() {
    let (poller, source, _) = setup();
    source.serve(r#"[{"leak":"no"},{"Leak":"Detected"}]"#);

    poller.fetch_once(URL).await.unwrap();
    let history = poller.history();
    // Headers come from the first row, so "Leak" in row two is not mapped
    assert!(!history.records()[1].leak);

    source.serve(r#"[{"Leak":"no"},{"Leak":"Detected"}]"#);
    poller.fetch_once(URL).await.unwrap();
    let history = poller.history();
    assert!(!history.records()[0].leak);
    assert!(history.records()[1].leak);
}

#[tokio::test]
async fn test_history_matches_source_order() {
    let (poller, source, _) = setup();
    let rows: Vec<String> = (0..25)
        .map(|i| format!(r#"{{"speed":"{}","ts":"t{}"}}"#, i, i))
        .collect();
    source.serve(&format!("[{}]", rows.join(",")));

    poller.fetch_once(URL).await.unwrap();
    let history = poller.history();

    assert_eq!(history.len(), 25);
    for (i, record) in history.records().iter().enumerate() {
        assert_eq!(record.speed, Some(i as f64));
        assert_eq!(record.timestamp, format!("t{}", i));
    }
    assert_eq!(history.latest().unwrap().timestamp, "t24");
}

#[tokio::test]
async fn test_repeated_fetch_is_idempotent() {
    let (poller, source, _) = setup();
    source.serve(r#"[{"ph":"7.1","ts":"a"},{"ph":"0","ts":"b","pressure":"12"}]"#);

    poller.fetch_once(URL).await.unwrap();
    let first = poller.history();
    poller.fetch_once(URL).await.unwrap();
    let second = poller.history();

    assert_eq!(first, second);
    assert_eq!(second.records()[1].ph, Some(0.0));
}

#[tokio::test]
async fn test_history_is_replaced_not_merged() {
    let (poller, source, _) = setup();
    source.serve(r#"[{"ph":"1"},{"ph":"2"},{"ph":"3"}]"#);
    poller.fetch_once(URL).await.unwrap();

    // Headers drift between fetches
    source.serve(r#"[{"pH ":"9"}]"#);
    poller.fetch_once(URL).await.unwrap();

    let history = poller.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history.latest().unwrap().ph, Some(9.0));
    assert_eq!(poller.mapping().header(CanonicalField::Ph), Some("pH "));
}

#[tokio::test]
async fn test_published_windows() {
    let (poller, source, target) = setup();
    let rows: Vec<String> = (0..75)
        .map(|i| format!(r#"{{"turb":{},"ts":"t{}"}}"#, i, i))
        .collect();
    source.serve(&format!("[{}]", rows.join(",")));

    poller.fetch_once(URL).await.unwrap();

    let seen = target.seen.lock();
    let publication = &seen[0];
    assert_eq!(publication.row_count(), 75);
    assert_eq!(publication.trend_window.len(), 50);
    assert_eq!(publication.trend_window.first().unwrap().timestamp, "t25");
    assert_eq!(publication.display_window.len(), 10);
    assert_eq!(publication.display_window[0].timestamp, "t74");
    assert_eq!(publication.display_window[9].timestamp, "t65");

    let series = publication.trend_series(CanonicalField::Turbidity);
    assert_eq!(series.values.len(), 50);
    assert_eq!(series.last_value(), Some(74.0));

    // The on-demand view agrees with what was pushed
    assert_eq!(poller.publication().display_window, publication.display_window);
}

#[tokio::test]
async fn test_replaced_render_targets() {
    let (poller, source, first) = setup();
    source.serve(r#"[{"ph":"7"}]"#);
    poller.fetch_once(URL).await.unwrap();

    let second = RecordingTarget::default();
    poller.set_render_targets(vec![Box::new(second.clone())]);
    poller.fetch_once(URL).await.unwrap();

    assert_eq!(first.seen.lock().len(), 1);
    assert_eq!(second.seen.lock().len(), 1);
}
