//! Timed exam attempts against the exam portal, from the terminal.
//!
//! The attempt lifecycle lives in [`session`], driven by [`timer`],
//! [`answers`], [`autosave`] and [`navigator`]. [`tui`] and [`ui`] render it.

pub mod answers;
pub mod autosave;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod navigator;
pub mod results;
pub mod service;
pub mod session;
pub mod state;
pub mod timer;
pub mod tui;
pub mod ui;
