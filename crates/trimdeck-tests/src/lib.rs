//! Integration test crate for Trimdeck.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the real editor against WAV files written to temp dirs, so
//! none of the tests need FFmpeg or an audio device.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod audio;

#[cfg(test)]
mod export;
