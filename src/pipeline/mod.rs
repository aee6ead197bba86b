pub mod entry;
pub mod runner;
pub mod sink;

pub use entry::{Entry, Metadata};
pub use runner::{run_pipeline, PipelineError};
pub use sink::{EntrySink, ForwardError};
