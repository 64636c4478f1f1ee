//! Pure projections of session state into a render tree.
//!
//! Renderers never mutate state: the same session always yields the same tree.

pub mod page;
pub mod sidebar;
pub mod thread;
pub mod tree;

pub use page::{render_document, render_page};
pub use sidebar::render_sidebar;
pub use thread::{LATEST_ANCHOR, render_thread};
pub use tree::{Element, Node};
