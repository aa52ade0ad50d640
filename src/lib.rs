//! Subgen - Subtitle Generation Pipeline
//!
//! Turns a video file into an SRT subtitle file by extracting its audio with
//! ffmpeg, transcribing it with whisper.cpp and repairing the raw transcript
//! into a strictly numbered subtitle track.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod media;
pub mod process;
pub mod retry;
pub mod subtitle;
pub mod transcribe;
pub mod workflow;
