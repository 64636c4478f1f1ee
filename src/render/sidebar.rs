//! Conversation list projection.

use chrono::{TimeZone, Utc};

use crate::chat::store::ConversationStore;
use crate::chat::types::Conversation;

use super::tree::{Element, Node};

/// Render the conversation list, one row per conversation in list order.
#[must_use]
pub fn render_sidebar(store: &ConversationStore) -> Node {
    let current = store.current_id();
    Element::new("ul")
        .class("conv-list")
        .children(
            store
                .conversations()
                .iter()
                .map(|conv| render_row(conv, conv.id == current)),
        )
        .into()
}

fn render_row(conv: &Conversation, is_current: bool) -> Element {
    let item = if conv.editing {
        edit_item(conv)
    } else {
        display_item(conv)
    };

    let created = created_label(conv);
    Element::new("li").class("conv-row").child(
        item.attr_if(is_current, "aria-current", "true")
            .attr_if(!created.is_empty(), "title", created),
    )
}

fn display_item(conv: &Conversation) -> Element {
    let base = format!("/conversations/{}", conv.id);

    Element::new("div")
        .class("conv-item")
        .child(icon("conv-icon", "💬"))
        .child(
            post_form(&format!("{base}/select"), "conv-select").child(
                Element::new("button")
                    .class("conv-title")
                    .attr("type", "submit")
                    .text(&conv.title),
            ),
        )
        .child(
            post_form(&format!("{base}/edit"), "conv-action").child(
                Element::new("button")
                    .class("action-icon")
                    .attr("type", "submit")
                    .attr("aria-label", "Rename")
                    .text("✎"),
            ),
        )
        .child(
            post_form(&format!("{base}/delete"), "conv-action").child(
                Element::new("button")
                    .class("action-icon")
                    .attr("type", "submit")
                    .attr("aria-label", "Delete")
                    .text("🗑"),
            ),
        )
}

fn edit_item(conv: &Conversation) -> Element {
    let base = format!("/conversations/{}", conv.id);

    // Enter submits the rename form; app.js posts Escape to the key route.
    Element::new("div")
        .class("conv-item editing")
        .child(icon("conv-icon", "💬"))
        .child(
            post_form(&format!("{base}/rename"), "edit-form")
                .child(
                    Element::new("input")
                        .class("edit-input")
                        .attr("type", "text")
                        .attr("name", "title")
                        .attr("value", &conv.title)
                        .attr("autofocus", "autofocus")
                        .attr("data-key-action", format!("{base}/edit/key")),
                )
                .child(
                    Element::new("button")
                        .class("confirm-btn")
                        .attr("type", "submit")
                        .attr("aria-label", "Done")
                        .text("✓"),
                ),
        )
        .child(
            post_form(&format!("{base}/edit/cancel"), "cancel-form").child(
                Element::new("button")
                    .class("cancel-btn")
                    .attr("type", "submit")
                    .attr("aria-label", "Cancel")
                    .text("✕"),
            ),
        )
}

/// A form posting to `action`.
pub(crate) fn post_form(action: &str, class: &str) -> Element {
    Element::new("form")
        .class(class)
        .attr("method", "post")
        .attr("action", action)
}

fn icon(class: &str, glyph: &str) -> Element {
    Element::new("span")
        .class(class)
        .attr("aria-hidden", "true")
        .text(glyph)
}

fn created_label(conv: &Conversation) -> String {
    if conv.created_at <= 0 {
        return String::new();
    }
    Utc.timestamp_millis_opt(conv.created_at)
        .single()
        .map(|at| format!("Created {}", at.format("%Y-%m-%d %H:%M UTC")))
        .unwrap_or_default()
}
