// tests/phase_registry_tests.rs
mod common;
use common::*;
use serial_test::serial;
use strata::{PhaseRegistry, PhaseRelation, PipelinePhase, Placement, StrataError};

fn names(pipeline: &TestPipeline) -> Vec<String> {
  pipeline.phases().iter().map(|p| p.name().to_string()).collect()
}

#[test]
#[serial]
fn test_new_registers_phases_in_order_once() {
  setup_tracing();
  let pipeline = TestPipeline::new(&[PHASE_A, PHASE_B, PHASE_A, PHASE_C]);
  assert_eq!(names(&pipeline), vec!["A", "B", "C"]);
  assert!(pipeline.has_phase(&PHASE_B));
  assert!(!pipeline.has_phase(&PHASE_X));
}

#[test]
#[serial]
fn test_add_phase_is_idempotent() {
  setup_tracing();
  let mut pipeline = TestPipeline::new(&[PHASE_A]);
  pipeline.add_phase(PHASE_B);
  pipeline.add_phase(PHASE_A);
  pipeline.add_phase(PHASE_B);
  assert_eq!(names(&pipeline), vec!["A", "B"]);
}

#[test]
#[serial]
fn test_phase_identity_is_by_name() {
  setup_tracing();
  let runtime_named = PipelinePhase::named(String::from("A"));
  assert_eq!(runtime_named, PHASE_A);
  assert_eq!(runtime_named.to_string(), "A");

  let mut pipeline = TestPipeline::new(&[PHASE_A]);
  pipeline.add_phase(runtime_named);
  assert_eq!(pipeline.phases().len(), 1);
}

#[test]
#[serial]
fn test_insert_after_and_before() {
  setup_tracing();
  let mut pipeline = TestPipeline::new(&[PHASE_A, PHASE_C]);
  pipeline.insert_phase_after(&PHASE_A, PHASE_B).unwrap();
  pipeline.insert_phase_before(&PHASE_A, PHASE_X).unwrap();
  assert_eq!(names(&pipeline), vec!["X", "A", "B", "C"]);

  // A second "after A" lands immediately after A, ahead of B.
  pipeline.insert_phase_after(&PHASE_A, PHASE_D).unwrap();
  assert_eq!(names(&pipeline), vec!["X", "A", "D", "B", "C"]);
}

#[test]
#[serial]
fn test_insert_relative_to_last_appends() {
  setup_tracing();
  let mut pipeline = TestPipeline::new(&[PHASE_A, PHASE_B]);
  // The reference is ignored for `Last`, even when it is not registered.
  pipeline.insert_phase_relative_to(&PHASE_X, PHASE_C, Placement::Last).unwrap();
  assert_eq!(names(&pipeline), vec!["A", "B", "C"]);
  assert_eq!(pipeline.phase_relation(&PHASE_C), Some(&PhaseRelation::Last));
}

#[test]
#[serial]
fn test_insert_relative_to_missing_reference_fails() {
  setup_tracing();
  let mut pipeline = TestPipeline::new(&[PHASE_A]);

  let err = pipeline.insert_phase_after(&PHASE_X, PHASE_B).unwrap_err();
  match &err {
    StrataError::PhaseNotFound { phase } => assert_eq!(phase, "X"),
    other => panic!("Expected PhaseNotFound, got {:?}", other),
  }
  assert!(err.is_configuration());

  let err = pipeline.insert_phase_before(&PHASE_X, PHASE_B).unwrap_err();
  assert!(matches!(err, StrataError::PhaseNotFound { .. }));
  assert_eq!(names(&pipeline), vec!["A"]);
}

#[test]
#[serial]
fn test_inserting_registered_phase_fails() {
  setup_tracing();
  let mut pipeline = TestPipeline::new(&[PHASE_A, PHASE_B]);

  for placement in [Placement::Before, Placement::After, Placement::Last] {
    let err = pipeline.insert_phase_relative_to(&PHASE_A, PHASE_B, placement).unwrap_err();
    match err {
      StrataError::DuplicatePhase { phase } => assert_eq!(phase, "B"),
      other => panic!("Expected DuplicatePhase for {:?}, got {:?}", placement, other),
    }
  }
  assert_eq!(names(&pipeline), vec!["A", "B"]);
}

#[test]
#[serial]
fn test_intercept_into_unregistered_phase_fails() {
  setup_tracing();
  let mut pipeline = abc_pipeline();
  let err = pipeline.intercept_with(&PHASE_X, recorder("lost")).unwrap_err();
  assert!(matches!(&err, StrataError::PhaseNotFound { phase } if phase == "X"));
  assert_eq!(err.to_string(), "Phase not found: X");
  assert_eq!(pipeline.interceptor_count(), 0);
}

#[test]
#[serial]
fn test_relations_are_recorded() {
  setup_tracing();
  let mut pipeline = TestPipeline::new(&[PHASE_B]);
  pipeline.insert_phase_before(&PHASE_B, PHASE_A).unwrap();
  pipeline.insert_phase_after(&PHASE_B, PHASE_C).unwrap();

  assert_eq!(pipeline.phase_relation(&PHASE_B), Some(&PhaseRelation::Last));
  assert_eq!(pipeline.phase_relation(&PHASE_A), Some(&PhaseRelation::Before(PHASE_B)));
  assert_eq!(pipeline.phase_relation(&PHASE_C), Some(&PhaseRelation::After(PHASE_B)));
  assert_eq!(pipeline.phase_relation(&PHASE_X), None);
}

#[test]
#[serial]
fn test_interceptors_are_bucketed_per_phase() {
  setup_tracing();
  let mut pipeline = abc_pipeline();
  pipeline.intercept_with(&PHASE_A, recorder("a1")).unwrap();
  pipeline.intercept_with(&PHASE_C, recorder("c1")).unwrap();
  pipeline.intercept_with(&PHASE_A, recorder("a2")).unwrap();

  assert_eq!(pipeline.interceptors_of(&PHASE_A).len(), 2);
  assert_eq!(pipeline.interceptors_of(&PHASE_B).len(), 0);
  assert_eq!(pipeline.interceptors_of(&PHASE_C).len(), 1);
  assert_eq!(pipeline.interceptors_of(&PHASE_X).len(), 0);
  assert_eq!(pipeline.interceptor_count(), 3);
  assert!(!pipeline.is_empty());
}

#[test]
#[serial]
fn test_phase_registry_standalone() {
  setup_tracing();
  let mut registry = PhaseRegistry::new();
  assert!(registry.is_empty());
  assert!(registry.add(PHASE_A));
  assert!(!registry.add(PHASE_A));
  registry.insert_after(&PHASE_A, PHASE_C).unwrap();
  registry.insert_before(&PHASE_C, PHASE_B).unwrap();

  let order: Vec<&str> = registry.iter().map(PipelinePhase::name).collect();
  assert_eq!(order, vec!["A", "B", "C"]);
  assert_eq!(registry.position(&PHASE_C), Some(2));
  assert_eq!(registry.len(), 3);
}
