//! Command table: the menu of cleanup operations.
//!
//! The hosting surface (CLI, menu bar, whatever) resolves a command
//! identifier to a [`Command`] and hands us a [`HostSession`]; we run the
//! procedure and hand back a [`Summary`] ready to display.

use serde::Serialize;

use crate::cleanup::{
    clear_speaker_notes, purge_comments, remove_off_canvas_elements, DEFAULT_COMMENT_PAGE_SIZE,
};
use crate::error::{Error, Result};
use crate::host::{CommentService, DocumentSource};

/// The cleanup operations, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    /// Delete every review comment on the document.
    PurgeComments,
    /// Clear every non-empty speaker note.
    ClearSpeakerNotes,
    /// Remove every element entirely outside the canvas.
    RemoveOffCanvasElements,
}

impl Command {
    /// All commands, in the order they appear in the menu.
    pub const ALL: [Command; 3] = [
        Command::PurgeComments,
        Command::ClearSpeakerNotes,
        Command::RemoveOffCanvasElements,
    ];

    /// Stable identifier used for dispatch.
    pub fn id(self) -> &'static str {
        match self {
            Command::PurgeComments => "purge-comments",
            Command::ClearSpeakerNotes => "clear-notes",
            Command::RemoveOffCanvasElements => "remove-offcanvas",
        }
    }

    /// Resolve an identifier back to a command.
    pub fn from_id(id: &str) -> Option<Command> {
        Command::ALL.into_iter().find(|command| command.id() == id)
    }

    /// Human-readable menu label.
    pub fn menu_label(self) -> &'static str {
        match self {
            Command::PurgeComments => "Delete all comments",
            Command::ClearSpeakerNotes => "Clear speaker notes",
            Command::RemoveOffCanvasElements => "Remove off-canvas elements",
        }
    }
}

/// Result of one command run: which command, and how many items it
/// affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub command: Command,
    pub count: usize,
}

impl Summary {
    /// The message the surface shows the user: the count, or a "nothing
    /// found" fallback when the count is zero.
    pub fn message(&self) -> String {
        match (self.command, self.count) {
            (Command::PurgeComments, 0) => "No comments found.".to_string(),
            (Command::PurgeComments, n) => format!("Deleted {n} comments."),
            (Command::ClearSpeakerNotes, 0) => "No speaker notes found.".to_string(),
            (Command::ClearSpeakerNotes, n) => format!("Cleared speaker notes on {n} slides."),
            (Command::RemoveOffCanvasElements, 0) => "No off-canvas elements found.".to_string(),
            (Command::RemoveOffCanvasElements, n) => {
                format!("Removed {n} off-canvas elements.")
            }
        }
    }
}

/// The two host collaborators a command needs.
///
/// The document source and the comment service are independent endpoints
/// on the host side, so they arrive as separate borrows.
pub struct HostSession<'a> {
    pub documents: &'a mut dyn DocumentSource,
    pub comments: &'a mut dyn CommentService,
}

/// Run one command against the host's active document.
pub fn run_command(command: Command, session: &mut HostSession<'_>) -> Result<Summary> {
    log::debug!("running {}", command.id());

    let count = match command {
        Command::PurgeComments => {
            let document_id = session.documents.active_document()?.id().to_string();
            purge_comments(session.comments, &document_id, DEFAULT_COMMENT_PAGE_SIZE)?
        }
        Command::ClearSpeakerNotes => clear_speaker_notes(session.documents.active_document()?)?,
        Command::RemoveOffCanvasElements => {
            remove_off_canvas_elements(session.documents.active_document()?)?
        }
    };

    Ok(Summary { command, count })
}

/// Resolve an identifier or fail with [`Error::UnknownCommand`].
pub fn resolve_command(id: &str) -> Result<Command> {
    Command::from_id(id).ok_or_else(|| Error::UnknownCommand(id.to_string()))
}
