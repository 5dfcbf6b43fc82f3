//! Run state machine tests

use autodeploy::deploy::fsm::{RunEvent, RunFsm, RunState};

#[test]
fn test_fsm_initial_state() {
    let fsm = RunFsm::new();
    assert_eq!(fsm.state(), &RunState::Started);
    assert!(fsm.error().is_none());
    assert!(!fsm.is_terminal());
}

#[test]
fn test_fsm_success_flow() {
    let mut fsm = RunFsm::new();

    // Started -> RepositoryAnalysis
    fsm.process(RunEvent::BeginAnalysis).unwrap();
    assert_eq!(fsm.state(), &RunState::RepositoryAnalysis);

    // RepositoryAnalysis -> FilesGeneration
    fsm.process(RunEvent::BeginGeneration).unwrap();
    assert_eq!(fsm.state(), &RunState::FilesGeneration);

    // FilesGeneration -> BranchCreation
    fsm.process(RunEvent::BeginPublication).unwrap();
    assert_eq!(fsm.state(), &RunState::BranchCreation);

    // BranchCreation -> Completed
    fsm.process(RunEvent::Finish).unwrap();
    assert_eq!(fsm.state(), &RunState::Completed);
    assert!(fsm.is_terminal());
}

#[test]
fn test_fsm_failure_from_each_live_state() {
    let steps = [
        vec![],
        vec![RunEvent::BeginAnalysis],
        vec![RunEvent::BeginAnalysis, RunEvent::BeginGeneration],
        vec![
            RunEvent::BeginAnalysis,
            RunEvent::BeginGeneration,
            RunEvent::BeginPublication,
        ],
    ];

    for prefix in steps {
        let mut fsm = RunFsm::new();
        for event in prefix {
            fsm.process(event).unwrap();
        }
        fsm.process(RunEvent::Fail("boom".to_string())).unwrap();
        assert_eq!(fsm.state(), &RunState::Failed);
        assert_eq!(fsm.error(), Some("boom"));
    }
}

#[test]
fn test_fsm_skipping_steps_is_rejected() {
    let mut fsm = RunFsm::new();
    assert!(fsm.process(RunEvent::BeginPublication).is_err());
    assert!(fsm.process(RunEvent::Finish).is_err());
    assert_eq!(fsm.state(), &RunState::Started);
}

#[test]
fn test_fsm_terminal_states_reject_events() {
    let mut fsm = RunFsm::new();
    fsm.process(RunEvent::BeginAnalysis).unwrap();
    fsm.process(RunEvent::BeginGeneration).unwrap();
    fsm.process(RunEvent::BeginPublication).unwrap();
    fsm.process(RunEvent::Finish).unwrap();

    assert!(fsm.process(RunEvent::Fail("late".to_string())).is_err());
    assert!(fsm.process(RunEvent::BeginAnalysis).is_err());
    assert_eq!(fsm.state(), &RunState::Completed);
    assert!(fsm.error().is_none());
}
