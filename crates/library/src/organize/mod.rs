//! Library organization.
//!
//! Moves every owned title's files to where the organize templates say they
//! belong, then optionally deletes superseded update files.
//!
//! The work is split in three: a [`Planner`] validates both templates up
//! front and resolves each title into a [`TitleMove`]; a [`FileMover`]
//! carries out one title's moves; a [`FileRemover`] deletes stale updates.
//! [`organize`] drives all three and accumulates per-title and per-file
//! failures into an [`OrganizeReport`] rather than stopping at the first one.

mod plan;
mod ports;
mod run;

pub use self::plan::{PlannedMove, Planner, TitleMove};
pub use self::ports::{FileMover, FileRemover};
pub use self::run::{MoveFailure, OrganizeReport, organize};
