//! Progress reporting and cancellation through the public surface.

use std::sync::{Arc, Mutex};

use secondsight::{
    CancellationToken, Dispatcher, PipelineEvent, PipelineOptions, ProgressCallback,
    ProgressInfo, Stage,
};

mod common;

use common::{StubClient, fake_encoded};

#[derive(Default)]
struct Recorder {
    snapshots: Mutex<Vec<(Stage, u64, Option<u64>, Option<f32>)>>,
    events: Mutex<Vec<String>>,
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.snapshots
            .lock()
            .unwrap()
            .push((info.stage, info.current, info.total, info.percentage));
    }

    fn on_event(&self, event: &PipelineEvent) {
        let label = match event {
            PipelineEvent::FrameAnalyzed { second, success, .. } => {
                format!("frame:{second}:{success}")
            }
            PipelineEvent::AnalysisFinished { successful, failed } => {
                format!("done:{successful}:{failed}")
            }
            _ => "other".to_string(),
        };
        self.events.lock().unwrap().push(label);
    }
}

#[test]
fn token_is_shared_between_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
    assert!(!CancellationToken::default().is_cancelled());
}

#[tokio::test]
async fn analysis_reports_every_frame() {
    let recorder = Arc::new(Recorder::default());
    let options = PipelineOptions::new()
        .without_persistence()
        .with_progress(recorder.clone());
    let dispatcher = Dispatcher::new(Arc::new(StubClient::always_ok()), options).unwrap();

    dispatcher.dispatch(fake_encoded(4), "prompt").await;

    let snapshots = recorder.snapshots.lock().unwrap();
    assert!(snapshots.iter().all(|(stage, ..)| *stage == Stage::Analysis));
    let last = snapshots.last().expect("final snapshot");
    assert_eq!(last.1, 4);
    assert_eq!(last.2, Some(4));
    assert_eq!(last.3, Some(100.0));

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.iter().filter(|e| e.starts_with("frame:")).count(), 4);
    assert_eq!(events.last().map(String::as_str), Some("done:4:0"));
}

#[tokio::test]
async fn batch_size_throttles_snapshots() {
    let recorder = Arc::new(Recorder::default());
    let options = PipelineOptions::new()
        .without_persistence()
        .with_batch_size(3)
        .with_progress(recorder.clone());
    let dispatcher = Dispatcher::new(Arc::new(StubClient::always_ok()), options).unwrap();

    dispatcher.dispatch(fake_encoded(7), "prompt").await;

    // Two throttled snapshots (after 3 and 6) plus the final one.
    let snapshots = recorder.snapshots.lock().unwrap();
    let counts: Vec<u64> = snapshots.iter().map(|snapshot| snapshot.1).collect();
    assert_eq!(counts, vec![3, 6, 7]);
}
