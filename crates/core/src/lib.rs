//! Host-agnostic core for slide deck cleanup: canvas geometry, host
//! collaborator traits, the three cleanup procedures, and the command
//! table that surfaces them.

pub mod cleanup;
pub mod command;
pub mod error;
pub mod geometry;
pub mod host;

pub use cleanup::{
    clear_speaker_notes, purge_comments, remove_off_canvas_elements, DEFAULT_COMMENT_PAGE_SIZE,
};
pub use command::{resolve_command, run_command, Command, HostSession, Summary};
pub use error::{Error, Result};
pub use geometry::{Bounds, PageSize};
pub use host::{CommentPage, CommentService, Document, DocumentSource, Slide};
