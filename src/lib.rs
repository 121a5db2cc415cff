//! Foreground/background segmentation of produce-on-a-scale videos.
//!
//! Frames come in through a [`capture::FrameSource`], are segmented by a
//! [`segmentation::Segmenter`] and leave through an [`output::FrameSink`].

pub mod capture;
pub mod config;
pub mod output;
pub mod segmentation;
