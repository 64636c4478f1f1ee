//! Parley: a local single-user chat assistant served over HTTP.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![warn(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(non_camel_case_types)]
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(nonstandard_style)] // Empêche tout style de code non standard
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy pour stricte discipline
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::cognitive_complexity)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used))]

/// Conversations, session state machine and reply orchestration.
pub mod chat;
/// Slot storage for the conversation list.
pub mod persistence;
/// Remote inference client.
pub mod remote;
/// HTML projection of the session.
pub mod render;
/// HTTP server and routes.
#[allow(clippy::missing_errors_doc, clippy::unused_async)]
pub mod server;
/// Entry point helpers.
pub mod start_parley;
