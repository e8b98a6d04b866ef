
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::llm::AnswerGenerator;
use crate::rag::prompt::PromptTemplate;
use crate::rag::retriever::ChunkRetriever;
use crate::rag::session::{ConversationSession, ConversationTurn};
use crate::{RagError, Result};

/// Where a turn currently is. `Idle` between turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    AwaitingSubmission,
    Retrieving,
    Generating,
    Displaying,
    ErrorDisplay,
}

impl InteractionState {
    /// Whether `self -> next` is an edge of the turn state machine
    #[inline]
    pub fn can_transition_to(self, next: Self) -> bool {
        use InteractionState as S;
        matches!(
            (self, next),
            (S::Idle, S::AwaitingSubmission)
                | (S::AwaitingSubmission, S::Idle | S::Retrieving)
                | (S::Retrieving, S::Generating | S::ErrorDisplay)
                | (S::Generating, S::Displaying | S::ErrorDisplay)
                | (S::Displaying | S::ErrorDisplay, S::Idle)
        )
    }
}

/// Result of one submission
#[derive(Debug)]
pub enum TurnOutcome {
    /// Blank input; nothing was sent anywhere
    Ignored,
    /// The turn was answered and appended to the session
    Answered(ConversationTurn),
    /// The turn failed; the session is unchanged and accepts new questions
    Failed(RagError),
}

/// Drives one question at a time through retrieval and generation
pub struct InteractionLoop {
    retriever: Arc<dyn ChunkRetriever>,
    generator: Arc<dyn AnswerGenerator>,
    template: PromptTemplate,
    k: usize,
    state: InteractionState,
}

impl InteractionLoop {
    #[inline]
    pub fn new(
        retriever: Arc<dyn ChunkRetriever>,
        generator: Arc<dyn AnswerGenerator>,
        template: PromptTemplate,
        k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            template,
            k,
            state: InteractionState::Idle,
        }
    }

    #[inline]
    pub fn state(&self) -> InteractionState {
        self.state
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Answer `question` and record the turn in `session`.
    ///
    /// Blank questions are ignored. Every failure is returned as
    /// [`TurnOutcome::Failed`] and leaves `session` untouched; the loop is
    /// back in [`InteractionState::Idle`] when this returns.
    #[inline]
    pub async fn submit(&mut self, session: &mut ConversationSession, question: &str) -> TurnOutcome {
        self.transition(InteractionState::AwaitingSubmission);

        if question.trim().is_empty() {
            debug!("Ignoring blank submission");
            self.transition(InteractionState::Idle);
            return TurnOutcome::Ignored;
        }

        match self.answer(question).await {
            Ok(answer) => {
                let turn = session.record(question, answer).clone();
                info!(
                    "Session {}: answered turn {} ({} chars)",
                    session.id(),
                    session.len(),
                    turn.answer.len()
                );
                self.transition(InteractionState::Idle);
                TurnOutcome::Answered(turn)
            }
            Err(err) => {
                self.transition(InteractionState::ErrorDisplay);
                if err.is_turn_recoverable() {
                    warn!("Turn failed: {err}");
                } else {
                    error!("Turn failed: {err}");
                }
                self.transition(InteractionState::Idle);
                TurnOutcome::Failed(err)
            }
        }
    }

    async fn answer(&mut self, question: &str) -> Result<String> {
        self.transition(InteractionState::Retrieving);
        let chunks = self.retriever.retrieve(question, self.k).await?;
        debug!("Retrieved {} chunks", chunks.len());

        self.transition(InteractionState::Generating);
        let prompt = self.template.render(&chunks, question);
        let generator = Arc::clone(&self.generator);
        let answer = tokio::task::spawn_blocking(move || generator.generate(&prompt))
            .await
            .map_err(|e| RagError::Upstream(format!("Generation task failed: {e}")))??;

        self.transition(InteractionState::Displaying);
        Ok(answer)
    }

    fn transition(&mut self, next: InteractionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Interaction state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
