//! Build pipeline: fetch, merge and render one documentation version
//!
//! | Stage  | Output                 | Gate        |
//! |--------|------------------------|-------------|
//! | fetch  | `<work>/<id>/`         | `FetchGate` |
//! | merge  | `<work>/<id>.md`       | `StageGate` |
//! | render | `<work>/<id>.pdf`      | `StageGate` |

pub mod fetch;
pub mod gate;
pub mod merge;
pub mod orchestrator;
pub mod render;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{DocumentFetcher, GitSparseFetcher};
pub use gate::{FetchDecision, FetchGate, GateDecision, OverwritePolicy, Prompter, StageGate};
pub use merge::merge_documents;
pub use orchestrator::{
    Collaborators, PipelineOrchestrator, PipelineReport, PipelineSettings, StageOutcome,
};
pub use render::{PandocRenderer, Renderer};
