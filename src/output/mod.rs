pub mod path;
pub mod record;
pub mod writer;

pub use path::{participant_file_id, previous_outputs, FixedDir, OutputDir, OutputName, ProjectDataDir};
pub use record::OutputRecord;
pub use writer::{TabularWriter, WriterState};
