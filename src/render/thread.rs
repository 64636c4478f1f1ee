//! Message thread projection.

use crate::chat::types::{Conversation, Message, Role};

use super::tree::{Element, Node};

/// Anchor id of the newest entry; every page load scrolls to it.
pub const LATEST_ANCHOR: &str = "latest";

/// Render the messages of `conversation` in order.
#[must_use]
pub fn render_thread(conversation: &Conversation) -> Node {
    let last = conversation.messages.len().checked_sub(1);
    Element::new("ol")
        .class("messages")
        .attr("id", "messages")
        .attr("aria-live", "polite")
        .children(
            conversation
                .messages
                .iter()
                .enumerate()
                .map(|(idx, message)| render_entry(message, Some(idx) == last)),
        )
        .into()
}

fn render_entry(message: &Message, is_latest: bool) -> Element {
    let mut class = format!("msg {}", message.role().as_str());
    if matches!(message, Message::Pending { .. }) {
        class.push_str(" pending");
    }

    let bubble = Element::new("div").class("bubble").text(message.content());
    let entry = Element::new("li")
        .class(class)
        .attr_if(is_latest, "id", LATEST_ANCHOR);

    match message.role() {
        Role::Ai => entry
            .child(
                Element::new("span")
                    .class("msg-icon")
                    .attr("aria-hidden", "true")
                    .text("◆"),
            )
            .child(bubble),
        Role::User => entry.child(bubble),
    }
}
