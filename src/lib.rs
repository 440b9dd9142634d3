#![forbid(unsafe_code)]

//! Orchestration library for the `tubegrab` CLI: channel enumeration,
//! Shorts classification, and batched yt-dlp downloads with single-line
//! progress aggregation. All of the heavy lifting (extraction, transport,
//! transcoding) is delegated to the external `yt-dlp` and `ffmpeg` binaries.

pub mod classify;
pub mod download;
pub mod enumerate;
pub mod ffmpeg;
pub mod progress;
pub mod spinner;
pub mod ytdlp;
