// Chat front-end
// Terminal REPL around the interaction loop


use console::{Term, style};
use dialoguer::Input;
use std::fmt::Write as _;
use tracing::{debug, info};

use crate::RagError;
use crate::config::ChatConfig;
use crate::rag::{ConversationSession, InteractionLoop, TurnOutcome};

/// Conversation history for display, newest turn first.
///
/// Turns alternate between two colours so that neighbouring exchanges are
/// easy to tell apart.
#[inline]
pub fn render_history(session: &ConversationSession) -> String {
    let mut out = String::new();
    for (index, turn) in session.newest_first().enumerate() {
        let question = format!("You: {}", turn.question);
        let answer = format!("Assistant: {}", turn.answer);
        if index % 2 == 0 {
            let _ = writeln!(out, "{}", style(question).cyan().bold());
            let _ = writeln!(out, "{}", style(answer).cyan());
        } else {
            let _ = writeln!(out, "{}", style(question).magenta().bold());
            let _ = writeln!(out, "{}", style(answer).magenta());
        }
        out.push('\n');
    }
    out
}

/// Greeting printed when a session starts: about text, disclaimer, usage
#[inline]
pub fn render_banner(chat: &ChatConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style("🍼 Nursing Mothers Chatbot").bold().cyan());
    if !chat.about.trim().is_empty() {
        let _ = writeln!(out, "{}", chat.about.trim());
    }
    if !chat.disclaimer.trim().is_empty() {
        let _ = writeln!(
            out,
            "{} {}",
            style("Disclaimer:").bold().yellow(),
            style(chat.disclaimer.trim()).yellow()
        );
    }
    let _ = writeln!(
        out,
        "{}",
        style("Ask a breastfeeding question. Press Ctrl+D to quit.").dim()
    );
    out
}

/// User-facing message for a failed turn
#[inline]
pub fn describe_failure(error: &RagError) -> String {
    match error {
        RagError::Authentication(_) => {
            format!("The language model rejected the request: {error}. Check your API key.")
        }
        RagError::Upstream(_) => {
            format!("The language model could not answer right now: {error}. Please try again.")
        }
        RagError::Embedding(_) => {
            format!("Could not embed your question: {error}. Is Ollama running?")
        }
        RagError::Storage(_) => format!("Could not search the index: {error}"),
        _ => format!("Something went wrong: {error}"),
    }
}

/// Read questions from the terminal until the input stream closes.
///
/// Failed turns are reported and the session carries on.
#[inline]
pub async fn run_repl(
    interaction: &mut InteractionLoop,
    session: &mut ConversationSession,
    chat: &ChatConfig,
) -> crate::Result<()> {
    let term = Term::stderr();
    eprintln!("{}", render_banner(chat));

    loop {
        let question: String = match Input::new()
            .with_prompt("Question")
            .allow_empty(true)
            .interact_text()
        {
            Ok(question) => question,
            Err(e) => {
                debug!("Input closed: {e}");
                break;
            }
        };

        let pending = style("Thinking...").dim().to_string();
        let _ = term.write_line(&pending);

        let outcome = interaction.submit(session, &question).await;
        let _ = term.clear_last_lines(1);

        match outcome {
            TurnOutcome::Ignored => {}
            TurnOutcome::Answered(_) => {
                let _ = term.clear_screen();
                eprint!("{}", render_history(session));
            }
            TurnOutcome::Failed(error) => {
                eprintln!("{}", style(describe_failure(&error)).red());
                eprintln!();
            }
        }
    }

    info!("Chat session {} ended after {} turns", session.id(), session.len());
    Ok(())
}
