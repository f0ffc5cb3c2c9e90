//! CompletionLogger delivery semantics against in-memory and HTTP sinks.

use std::sync::Arc;
use std::time::Duration;

use mastery_core::fakes::MemoryCompletionSink;
use mastery_core::{
    AttemptId, CompletionLogger, FinalScores, HttpCompletionSink, Outcome, ScoreSheet,
    TaskCompletion, TaskDescriptor, UnitConfig, UnitKey, METRICS,
};

fn unit_key() -> UnitKey {
    UnitKey::new("phase2", "step1", "B1").unwrap()
}

fn final_scores() -> FinalScores {
    let unit = UnitConfig {
        phase: "phase2".to_string(),
        step: "step1".to_string(),
        level: "B1".to_string(),
        title: None,
        tasks: vec![TaskDescriptor::new("taskA", 0, 5)],
        pass_threshold: None,
        pass_percent: None,
        advance_route: "/phase2/step2/B1".to_string(),
    }
    .build()
    .unwrap();
    let outcome = Outcome::settle(&unit, AttemptId::new(), &ScoreSheet::default());
    FinalScores::from(&outcome)
}

#[tokio::test]
async fn task_record_reaches_sink() {
    let sink = Arc::new(MemoryCompletionSink::new());
    let logger = CompletionLogger::new(sink.clone());
    let task = TaskDescriptor::new("taskA", 0, 5);

    let delivered = logger
        .log_task(TaskCompletion::new(&unit_key(), &task, 4))
        .delivered()
        .await;

    assert!(delivered);
    let records = sink.tasks();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].task, "taskA");
    assert_eq!(records[0].score, 4);
    assert_eq!(records[0].max_score, 5);
    assert!(records[0].completed);
}

#[tokio::test]
async fn failed_delivery_is_swallowed_and_counted() {
    let sink = Arc::new(MemoryCompletionSink::new());
    sink.fail_sessions(true);
    let logger = CompletionLogger::new(sink.clone());
    let before = METRICS.deliveries_failed();

    let delivered = logger.log_session(final_scores()).delivered().await;

    assert!(!delivered);
    assert!(sink.sessions().is_empty());
    assert!(METRICS.deliveries_failed() > before);
}

#[tokio::test]
async fn failure_is_not_retried() {
    let sink = Arc::new(MemoryCompletionSink::new());
    sink.fail_tasks(true);
    let logger = CompletionLogger::new(sink.clone());
    let task = TaskDescriptor::new("taskA", 0, 5);

    assert!(!logger
        .log_task(TaskCompletion::new(&unit_key(), &task, 1))
        .delivered()
        .await);

    // Recovering the backend does not resurrect the lost record.
    sink.fail_tasks(false);
    tokio::task::yield_now().await;
    assert!(sink.tasks().is_empty());
}

#[tokio::test]
async fn unreachable_backend_does_not_error() {
    let sink = HttpCompletionSink::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let logger = CompletionLogger::new(Arc::new(sink));

    assert!(!logger.log_session(final_scores()).delivered().await);
}

#[tokio::test]
async fn final_scores_carry_zero_for_missing_tasks() {
    let scores = final_scores();
    assert_eq!(scores.scores.get("taskA"), Some(&0));
    assert_eq!(scores.total, 0);
    assert!(!scores.passed);
}
