//! Conversational avatar pipeline.
//!
//! User text is routed to one of several AI backends ([`provider`]), the
//! reply is turned into speech ([`tts`]) and the avatar's mouth follows the
//! speech in real time ([`avatar`]).  [`pipeline`] ties the three together
//! one turn at a time.

pub mod app;
pub mod audio;
pub mod avatar;
pub mod config;
pub mod pipeline;
pub mod provider;
pub mod tts;
