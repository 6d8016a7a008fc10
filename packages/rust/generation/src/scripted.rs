//! In-memory [`TextGenerator`] that replays scripted answers.
//!
//! Used by tests across the workspace to drive the assembler without a
//! network. Replies are queued per [`Purpose`]; an empty queue falls back to
//! a canned answer that produces a valid article.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use seopress_shared::{Result, SeoPressError};

use crate::client::{Completion, CompletionRequest, Purpose, TextGenerator};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Status(u16),
}

#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<HashMap<Purpose, VecDeque<Reply>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer for the next call with `purpose`.
    pub fn with_reply(self, purpose: Purpose, text: impl Into<String>) -> Self {
        self.push(purpose, Reply::Text(text.into()));
        self
    }

    /// Queue an HTTP failure for the next call with `purpose`.
    pub fn with_failure(self, purpose: Purpose, status: u16) -> Self {
        self.push(purpose, Reply::Status(status));
        self
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self, purpose: Purpose) -> usize {
        self.calls().iter().filter(|c| c.purpose == purpose).count()
    }

    fn push(&self, purpose: Purpose, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(purpose)
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, purpose: Purpose) -> Reply {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&purpose)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::Text(canned(purpose).to_string()))
    }
}

fn canned(purpose: Purpose) -> &'static str {
    match purpose {
        Purpose::Title => "A Practical Guide to Better Workspaces",
        Purpose::Outline => "## Getting Started\n## Planning the Layout\n## Choosing Materials\n## Final Checks",
        Purpose::Section => {
            "A good workspace balances light, acoustics, and movement. Begin with how people \
             actually spend their day, then shape zones around those habits rather than around \
             furniture catalogues. Revisit the plan after a few weeks of real use."
        }
        Purpose::Meta => "Plan a workspace people enjoy using, with practical layout and material advice.",
        Purpose::Tags => "workspace, office design, productivity, interiors",
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let purpose = request.purpose;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        match self.next_reply(purpose) {
            Reply::Text(text) => Ok(Completion::new(text)),
            Reply::Status(status) => Err(SeoPressError::Generation {
                status,
                message: format!("scripted {} failure", purpose.as_str()),
            }),
        }
    }
}
