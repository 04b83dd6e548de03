use inmobot_core::domain::message::{Direction, Message};

use crate::llm::{ContentBlock, Role, Turn};

/// Rebuilds a model transcript from stored messages plus the message that
/// triggered this run.
///
/// The wire protocol demands turns that start with the user and strictly
/// alternate roles. Stored history gives no such guarantee (fallback replies,
/// dropped deliveries, redeliveries), so this repairs rather than rejects:
/// consecutive same-role messages fold into one turn, leading assistant turns
/// are dropped, and the incoming text either merges into a trailing user turn
/// or is appended as a new one. The result is never empty; with no usable
/// history it is the single incoming user turn.
pub fn build_history(stored: &[Message], incoming_text: &str, limit: usize) -> Vec<Turn> {
    let window = if stored.len() > limit { &stored[stored.len() - limit..] } else { stored };

    let mut turns: Vec<Turn> = Vec::with_capacity(window.len() + 1);
    for message in window {
        let role = match message.direction {
            Direction::Inbound => Role::User,
            Direction::Outbound => Role::Assistant,
        };
        push_folded(&mut turns, role, &message.body);
    }

    while turns.first().is_some_and(|turn| turn.role == Role::Assistant) {
        turns.remove(0);
    }

    push_folded(&mut turns, Role::User, incoming_text);

    turns
}

fn push_folded(turns: &mut Vec<Turn>, role: Role, text: &str) {
    if let Some(last) = turns.last_mut() {
        if last.role == role {
            if let Some(ContentBlock::Text { text: existing }) = last.content.last_mut() {
                existing.push('\n');
                existing.push_str(text);
                return;
            }
        }
    }
    let turn = match role {
        Role::User => Turn::user_text(text),
        Role::Assistant => Turn::assistant_text(text),
    };
    turns.push(turn);
}
