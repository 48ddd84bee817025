// ============================================================================
// Ingestion
// ============================================================================
//
// pipeline: one message through decode -> validate -> persist, ending either
//           ACCEPTED or DEAD_LETTERED
// runner:   the background task that feeds the pipeline from the stream
//
// ============================================================================

mod errors;
mod pipeline;
mod runner;

pub use errors::{IngestError, Stage};
pub use pipeline::IngestionPipeline;
pub use runner::IngestionHandle;
