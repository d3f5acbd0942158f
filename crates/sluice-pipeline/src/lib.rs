//! Transform, archive, report, and orchestration stages of the sluice
//! pipeline.

pub mod archive;
pub mod orchestrator;
pub mod report;
pub mod transform;

pub use archive::{ArchiveArea, ArchiveError, FileArchive};
pub use orchestrator::{
    recent_runs, store_batch, Pipeline, PipelineError, PipelineOutcome,
};
pub use report::{ReportError, ReportFile, ReportFormat, ReportRenderer};
pub use transform::{transform_snapshot, CleanBatch, TransformError};
