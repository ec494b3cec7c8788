//! Intent-routed conversation workflow.
//!
//! classifier → context extractor → router → handler, orchestrated per turn
//! by `engine::WorkflowEngine` with per-thread checkpoints in `store`.

pub mod classifier;
pub mod context;
pub mod engine;
pub mod handlers;
pub mod locks;
pub mod prompts;
pub mod retention;
pub mod router;
pub mod state;
pub mod store;
