//! A small instrumented target for greypuffin.
//!
//! The [`session::SessionTarget`] interprets its input as a sequence of session commands. It only
//! crashes for one particular ordering of commands, which makes it a good showcase for n-gram
//! coverage: every single command is exercised by the seed, only their order is new.

pub mod session;
