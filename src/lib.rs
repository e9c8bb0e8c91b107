//! Keyboard skip and undo for video players embedded in web pages.
//!
//! A [`session::Session`] owns one page model, the group store and the
//! engine state. Key presses resolve the active group's duration, locate the
//! page's video (retrying on a timer) and seek it.

pub mod config;
pub mod dispatcher;
pub mod dom;
pub mod engine;
pub mod error;
pub mod groups;
pub mod host;
pub mod locator;
pub mod replay;
pub mod session;

pub use error::{Result, SkipperError};
