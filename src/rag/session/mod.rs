
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One answered question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// In-memory history of a chat session, oldest turn first. Lost on exit.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    turns: Vec<ConversationTurn>,
}

impl Default for ConversationSession {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    #[inline]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Append a completed turn
    #[inline]
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) -> &ConversationTurn {
        self.turns.push(ConversationTurn {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        });
        &self.turns[self.turns.len() - 1]
    }

    #[inline]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    #[inline]
    pub fn latest(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Turns in display order
    #[inline]
    pub fn newest_first(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().rev()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
