// Retrieval-augmented answering
// Retrieve chunks for a question, assemble the prompt, ask the model, keep the conversation

pub mod interaction;
pub mod prompt;
pub mod retriever;
pub mod session;

pub use interaction::{InteractionLoop, InteractionState, TurnOutcome};
pub use prompt::{PromptTemplate, dedupe_chunks};
pub use retriever::{ChunkRetriever, Retriever};
pub use session::{ConversationSession, ConversationTurn};
