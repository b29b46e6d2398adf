//! EVE Chat Translator library
//!
//! Follows the game's Fleet and Local chat logs, filters noise, rewrites
//! fleet shorthand through a glossary and machine-translates the rest.
//! Exposed as a library for the binaries and tests.

pub mod core;
pub mod detect;
pub mod filter;
pub mod glossary;
pub mod pipeline;
pub mod session;
pub mod tailer;
pub mod translate;
