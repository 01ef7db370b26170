//! Effects - side effects declared by the reducer

use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Read a recorded battle log from disk
    LoadLogFile { path: PathBuf },
    /// `POST /dungeons/complete/{run_id}`
    CompleteDungeon { run_id: String },
}
