// tests/merge_tests.rs
mod common;
use common::*;
use serial_test::serial;
use strata::PhaseRelation;

fn names(pipeline: &TestPipeline) -> Vec<String> {
  pipeline.phases().iter().map(|p| p.name().to_string()).collect()
}

#[tokio::test]
#[serial]
async fn test_merge_appends_missing_phases_and_interceptors() {
  setup_tracing();
  let mut target = TestPipeline::new(&[PHASE_A, PHASE_B, PHASE_C]);
  target.intercept_with(&PHASE_A, recorder("p_a")).unwrap();
  target.intercept_with(&PHASE_C, recorder("p_c")).unwrap();

  let mut source = TestPipeline::new(&[PHASE_A, PHASE_D]);
  source.intercept_with(&PHASE_A, recorder("q_a")).unwrap();
  source.intercept_with(&PHASE_D, recorder("q_d")).unwrap();

  target.merge(&source);

  assert_eq!(names(&target), vec!["A", "B", "C", "D"]);
  assert_eq!(target.interceptors_of(&PHASE_A).len(), 2);
  assert_eq!(target.interceptor_count(), 4);

  let log = EventLog::new();
  target.execute(log.clone(), "m".to_string()).await.unwrap();
  assert_eq!(
    log.events()[..4],
    ["p_a m", "q_a m", "p_c m", "q_d m"],
    "target interceptors precede merged ones within a phase"
  );

  // The source is left untouched.
  assert_eq!(names(&source), vec!["A", "D"]);
  assert_eq!(source.interceptor_count(), 2);
}

#[tokio::test]
#[serial]
async fn test_merge_keeps_after_relation() {
  setup_tracing();
  let mut target = abc_pipeline();

  let mut source = TestPipeline::new(&[PHASE_A]);
  source.insert_phase_after(&PHASE_A, PHASE_X).unwrap();
  source.intercept_with(&PHASE_X, recorder("x")).unwrap();

  target.merge(&source);

  assert_eq!(names(&target), vec!["A", "X", "B", "C"]);
  assert_eq!(target.phase_relation(&PHASE_X), Some(&PhaseRelation::After(PHASE_A)));
}

#[tokio::test]
#[serial]
async fn test_merge_keeps_before_relation() {
  setup_tracing();
  let mut target = abc_pipeline();

  let mut source = TestPipeline::new(&[PHASE_C]);
  source.insert_phase_before(&PHASE_C, PHASE_X).unwrap();

  target.merge(&source);

  assert_eq!(names(&target), vec!["A", "B", "X", "C"]);
}

#[tokio::test]
#[serial]
async fn test_merge_with_missing_reference_keeps_source_order() {
  setup_tracing();
  let mut target = TestPipeline::new(&[PHASE_A, PHASE_B]);

  let mut source = TestPipeline::new(&[PHASE_D]);
  source.insert_phase_before(&PHASE_D, PHASE_X).unwrap();

  target.merge(&source);

  assert_eq!(names(&target), vec!["A", "B", "X", "D"]);
}

#[tokio::test]
#[serial]
async fn test_merged_leaves_inputs_unchanged() {
  setup_tracing();
  let mut left = TestPipeline::new(&[PHASE_A]);
  left.intercept_with(&PHASE_A, recorder("left")).unwrap();
  let mut right = TestPipeline::new(&[PHASE_B]);
  right.intercept_with(&PHASE_B, recorder("right")).unwrap();

  let combined = left.merged(&right);

  assert_eq!(names(&combined), vec!["A", "B"]);
  assert_eq!(names(&left), vec!["A"]);
  assert_eq!(left.interceptor_count(), 1);
  assert_eq!(right.interceptor_count(), 1);

  let log = EventLog::new();
  combined.execute(log.clone(), "c".to_string()).await.unwrap();
  assert_eq!(log.events(), vec!["left c", "right c", "right done", "left done"]);

  let log = EventLog::new();
  left.execute(log.clone(), "l".to_string()).await.unwrap();
  assert_eq!(log.events(), vec!["left l", "left done"]);
}

#[tokio::test]
#[serial]
async fn test_merge_into_empty_pipeline_copies_source() {
  setup_tracing();
  let mut source = abc_pipeline();
  source.intercept_with(&PHASE_B, recorder("b")).unwrap();

  let mut target = TestPipeline::default();
  target.merge(&source);

  assert_eq!(names(&target), names(&source));
  assert_eq!(target.interceptors_of(&PHASE_B).len(), 1);
}

#[tokio::test]
#[serial]
async fn test_merge_invalidates_cached_sequence() {
  setup_tracing();
  let mut target = TestPipeline::new(&[PHASE_A]);
  target.intercept_with(&PHASE_A, recorder("a")).unwrap();
  target.execute(EventLog::new(), "warmup".to_string()).await.unwrap();
  assert!(target.is_flattened());

  let mut source = TestPipeline::new(&[PHASE_A, PHASE_B]);
  source.intercept_with(&PHASE_B, recorder("b")).unwrap();
  target.merge(&source);
  assert!(!target.is_flattened());

  let log = EventLog::new();
  target.execute(log.clone(), "s".to_string()).await.unwrap();
  assert_eq!(log.events(), vec!["a s", "b s", "b done", "a done"]);
}

#[tokio::test]
#[serial]
async fn test_merge_keeps_order_of_phases_after_same_reference() {
  setup_tracing();
  let mut source = TestPipeline::new(&[PHASE_A]);
  source.insert_phase_after(&PHASE_A, PHASE_B).unwrap();
  source.insert_phase_after(&PHASE_A, PHASE_C).unwrap();
  assert_eq!(names(&source), vec!["A", "C", "B"]);
  source.intercept_with(&PHASE_B, recorder("b")).unwrap();
  source.intercept_with(&PHASE_C, recorder("c")).unwrap();

  let mut target = TestPipeline::new(&[PHASE_A, PHASE_D]);
  target.intercept_with(&PHASE_D, recorder("d")).unwrap();
  target.merge(&source);

  assert_eq!(names(&target), vec!["A", "C", "B", "D"]);
  assert_eq!(target.phase_relation(&PHASE_B), Some(&PhaseRelation::After(PHASE_A)));
  assert_eq!(target.phase_relation(&PHASE_C), Some(&PhaseRelation::After(PHASE_A)));

  let log = EventLog::new();
  target.execute(log.clone(), "m".to_string()).await.unwrap();
  assert_eq!(log.events()[..3], ["c m", "b m", "d m"]);
}

#[tokio::test]
#[serial]
async fn test_merge_keeps_order_of_phases_before_same_reference() {
  setup_tracing();
  let mut source = TestPipeline::new(&[PHASE_C]);
  source.insert_phase_before(&PHASE_C, PHASE_X).unwrap();
  source.insert_phase_before(&PHASE_C, PHASE_D).unwrap();
  assert_eq!(names(&source), vec!["X", "D", "C"]);

  let mut target = TestPipeline::new(&[PHASE_A, PHASE_C]);
  target.merge(&source);

  assert_eq!(names(&target), vec!["A", "X", "D", "C"]);
}
