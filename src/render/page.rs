//! Full page: sidebar, thread, composer and dialogs.

use crate::chat::session::Session;

use super::sidebar::{post_form, render_sidebar};
use super::thread::{LATEST_ANCHOR, render_thread};
use super::tree::{Element, Node};

/// Seconds between reloads while a reply is awaited.
const PENDING_REFRESH_SECS: u32 = 1;

/// Render the whole page as a tree.
#[must_use]
pub fn render_page(session: &Session) -> Node {
    let store = session.store();
    let view = session.view();
    let current = store.current();
    let awaiting = current.is_awaiting_reply();
    // Reloading would discard text typed into an open title editor.
    let editing = store.conversations().iter().any(|c| c.editing);

    let mut head = Element::new("head")
        .child(Element::new("meta").attr("charset", "utf-8"))
        .child(
            Element::new("meta")
                .attr("name", "viewport")
                .attr("content", "width=device-width, initial-scale=1"),
        )
        .child(Element::new("title").text(format!("{} · Parley", current.title)))
        .child(
            Element::new("link")
                .attr("rel", "stylesheet")
                .attr("href", "/static/app.css"),
        )
        .child(
            Element::new("script")
                .attr("src", "/static/app.js")
                .attr("defer", "defer"),
        );
    if awaiting && !editing {
        head = head.child(
            Element::new("meta")
                .attr("http-equiv", "refresh")
                .attr("content", format!("{PENDING_REFRESH_SECS};url=/#{LATEST_ANCHOR}")),
        );
    }

    let mut app_class = String::from("app");
    if view.sidebar_collapsed {
        app_class.push_str(" collapsed");
    }

    let sidebar = Element::new("aside")
        .class("sidebar")
        .child(
            Element::new("header")
                .class("sidebar-header")
                .child(toggle_button("collapse-btn-open", "Collapse sidebar"))
                .child(
                    post_form("/conversations", "new-chat-form").child(
                        Element::new("button")
                            .class("new-chat")
                            .attr("type", "submit")
                            .text("＋ New chat"),
                    ),
                ),
        )
        .child(Element::new("nav").child(render_sidebar(store)));

    let mut main = Element::new("main")
        .class("chat")
        .child(toggle_button("collapse-btn-closed", "Open sidebar"));
    if let Some(notice) = &view.notice {
        main = main.child(
            Element::new("div")
                .class("notice")
                .attr("role", "status")
                .text(notice),
        );
    }
    main = main
        .child(render_thread(current))
        .child(render_composer(session));

    let mut app = Element::new("div")
        .class(app_class)
        .attr(
            "data-viewport-measured",
            if view.viewport_measured { "true" } else { "false" },
        )
        .child(sidebar)
        .child(main);
    if let Some(dialog) = render_delete_dialog(session) {
        app = app.child(dialog);
    }

    Element::new("html")
        .attr("lang", "en")
        .child(head)
        .child(Element::new("body").child(app))
        .into()
}

/// Render the page as an HTML document.
#[must_use]
pub fn render_document(session: &Session) -> String {
    format!("<!DOCTYPE html>{}", render_page(session).to_html())
}

fn toggle_button(class: &str, label: &str) -> Element {
    post_form("/sidebar/toggle", "toggle-form").child(
        Element::new("button")
            .class(class)
            .attr("type", "submit")
            .attr("aria-label", label)
            .text("☰"),
    )
}

fn render_composer(session: &Session) -> Element {
    let current = session.store().current();
    let awaiting = current.is_awaiting_reply();

    let mut prompt = Element::new("input")
        .attr("id", "prompt")
        .attr("name", "prompt")
        .attr("type", "text")
        .attr("autocomplete", "off")
        .attr("placeholder", "Type your message…");
    let mut send = Element::new("button")
        .class("send-btn")
        .attr("type", "submit")
        .text("Send");
    if awaiting {
        prompt = prompt.attr("disabled", "disabled");
        send = send.attr("disabled", "disabled");
    } else {
        prompt = prompt.attr("autofocus", "autofocus");
    }

    let form = post_form("/messages", "composer")
        .attr("id", "composer")
        .child(prompt)
        .child(send);

    let mut wrapper = Element::new("div").class("composer-bar").child(form);
    if awaiting {
        wrapper = wrapper.child(
            post_form(&format!("/conversations/{}/stop", current.id), "stop-form").child(
                Element::new("button")
                    .class("stop-btn")
                    .attr("type", "submit")
                    .text("Stop"),
            ),
        );
    }
    wrapper
}

fn render_delete_dialog(session: &Session) -> Option<Element> {
    let id = session.view().pending_delete?;
    let title = session.store().get(id)?.title.clone();

    Some(
        Element::new("div")
            .class("confirm-dialog")
            .attr("role", "alertdialog")
            .attr("aria-modal", "true")
            .child(Element::new("p").text("Delete this conversation?"))
            .child(Element::new("p").class("confirm-title").text(title))
            .child(
                post_form(&format!("/conversations/{id}/delete/confirm"), "confirm-form").child(
                    Element::new("button")
                        .class("danger")
                        .attr("type", "submit")
                        .text("Delete"),
                ),
            )
            .child(
                post_form("/delete/dismiss", "dismiss-form").child(
                    Element::new("button")
                        .attr("type", "submit")
                        .text("Cancel"),
                ),
            ),
    )
}
