#![deny(clippy::all)]

//! versedeck: audio to synchronized transcript to slide deck.
//!
//! The heavy lifting (transcription, translation, speech synthesis, slide
//! art) is delegated to a hosted generative-AI service behind the trait
//! seams in [`ai`]. What this crate actually implements is the playback
//! synchronization engine ([`timeline`], [`highlight`]), the slide chunker
//! ([`slides`]), the deck export pipeline ([`deck`]) and the session
//! lifecycle around them ([`session`]).

pub mod ai;
pub mod config;
pub mod deck;
pub mod error;
pub mod highlight;
pub mod session;
pub mod slides;
pub mod storage;
pub mod timeline;
pub mod transcript;
pub mod wav;

pub use error::AppError;
