pub mod cursor;
pub mod index;

pub use cursor::TrialCursor;
pub use index::{TrialIndex, TrialKey};
