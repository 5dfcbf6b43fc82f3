//! Deployment pipeline: artifact synthesis, branch publication and run orchestration

pub mod fsm;
pub mod orchestrator;
pub mod publisher;
pub mod synth;
