//! Append-only conversation thread owned by a single pipeline run

use crate::error::PipelineError;
use crate::models::Message;

/// Ordered, append-only message log
///
/// Messages are never removed or reordered. Once the transcript has been
/// rendered the thread is sealed and any further append is a contract
/// violation between stages.
#[derive(Debug, Default)]
pub struct ConversationThread {
    messages: Vec<Message>,
    sealed: bool,
}

impl ConversationThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the thread
    pub fn append(&mut self, message: Message) -> Result<(), PipelineError> {
        if self.sealed {
            return Err(PipelineError::InternalFault(format!(
                "append to sealed thread ({} messages)",
                self.messages.len()
            )));
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// First message whose content contains `marker` (case-sensitive)
    pub fn find(&self, marker: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.content.contains(marker))
    }

    /// Render every message as `"{role}: {content}"` in thread order
    pub fn transcript(&self) -> Vec<String> {
        self.messages.iter().map(Message::render).collect()
    }

    /// Mark the thread as complete; later appends fail
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}
