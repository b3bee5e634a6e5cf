// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for reading, editing and rewriting the metadata
//! blocks of FLAC files.
//!
//! A FLAC file is a `fLaC` tag, followed by one or more
//! metadata blocks, followed by the compressed audio frames.
//! This crate parses the metadata blocks into structured values,
//! permits editing them, and writes them back out while copying
//! the audio frames verbatim.
//!
//! ```text
//! ┌──────────┬────────┬┄┄┄┄┄┄┄┄┬┄┄┄┬────────┬┄┄┄┄┄┄┄┄┬┄┄┄╮
//! │ FLAC Tag │ Block₀ │ Block₁ ┆ … ┆ Frame₀ │ Frame₁ ┆ … ┆
//! └──────────┴────────┴┄┄┄┄┄┄┄┄┴┄┄┄┴────────┴┄┄┄┄┄┄┄┄┴┄┄┄╯
//! ```
//!
//! The audio frames themselves are never decoded.

#![warn(missing_docs)]

pub mod bits;
pub mod file;
pub mod metadata;

pub use file::FlacFile;

/// A unified error for all FLAC metadata operations
#[derive(Debug)]
pub enum Error {
    /// An I/O error from the underlying stream
    Io(std::io::Error),
    /// A UTF-8 string was invalid
    Utf8(std::string::FromUtf8Error),
    /// The container or one of its blocks is malformed
    InvalidFormat(InvalidFormat),
    /// No STREAMINFO block was found in the file
    MissingStreaminfo,
    /// A bounded collection is already full
    Capacity {
        /// Which collection is full
        kind: Capacity,
        /// The collection's maximum number of items
        max: usize,
    },
    /// A padding size which is not a whole number of bytes
    InvalidPaddingBitCount(u32),
    /// A STREAMINFO field is out of range for its bit width
    InvalidStreaminfo,
    /// The file was not opened from a path, or has been closed
    SaveNotSupported,
    /// A bit read outside of the supported domain
    InvalidBitRange {
        /// Starting bit within the first byte
        bit_offset: u32,
        /// Number of bits requested
        bit_count: u32,
    },
    /// A block's contents are too large for its 24-bit size field
    ExcessiveBlockSize,
    /// A string is too long for its length field
    ExcessiveStringLength,
}

impl Error {
    /// Whether the error indicates a malformed FLAC container
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::InvalidFormat(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Self::Utf8(error)
    }
}

impl From<InvalidFormat> for Error {
    fn from(error: InvalidFormat) -> Self {
        Self::InvalidFormat(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Utf8(e) => Some(e),
            Self::InvalidFormat(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::Utf8(e) => e.fmt(f),
            Self::InvalidFormat(e) => write!(f, "invalid FLAC format : {e}"),
            Self::MissingStreaminfo => "STREAMINFO block missing from file".fmt(f),
            Self::Capacity { kind, max } => write!(f, "a {kind} can have no more than {max}"),
            Self::InvalidPaddingBitCount(bits) => {
                write!(f, "padding of {bits} bits is not a multiple of 8")
            }
            Self::InvalidStreaminfo => "STREAMINFO field out of range".fmt(f),
            Self::SaveNotSupported => "saving requires a file opened from a path".fmt(f),
            Self::InvalidBitRange {
                bit_offset,
                bit_count,
            } => write!(
                f,
                "unable to read {bit_count} bits at bit offset {bit_offset}"
            ),
            Self::ExcessiveBlockSize => "block size too large for metadata block".fmt(f),
            Self::ExcessiveStringLength => "string too long for its field".fmt(f),
        }
    }
}

/// The ways in which a FLAC container may be malformed
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum InvalidFormat {
    /// The stream does not begin with `fLaC`
    MissingFlacTag,
    /// CUESHEET block with more tracks than permitted
    ExcessiveTracks(u8),
    /// CUESHEET track with more index points than permitted
    ExcessiveIndexPoints {
        /// The track's number
        track: u8,
        /// The declared index point count
        count: u8,
    },
    /// CUESHEET block with no tracks at all
    NoTracks,
    /// CUESHEET block whose final track is not the lead-out
    MissingLeadOut(u8),
    /// A block's declared size differs from its encoded size
    BlockSizeMismatch {
        /// The block's type tag
        block_type: u8,
        /// Size declared in the block header
        declared: u32,
        /// Size actually written
        written: usize,
    },
    /// Undefined PICTURE type
    PictureType(u32),
    /// VORBIS_COMMENT entry without a `=` separator
    VorbisCommentEntry,
    /// APPLICATION block too small to hold its ID
    InsufficientApplicationBlock,
}

impl std::error::Error for InvalidFormat {}

impl std::fmt::Display for InvalidFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::MissingFlacTag => "missing FLAC tag".fmt(f),
            Self::ExcessiveTracks(count) => {
                write!(f, "CUESHEET has {count} tracks, cannot be more than 100")
            }
            Self::ExcessiveIndexPoints { track, count } => write!(
                f,
                "CUESHEET track {track} has {count} index points, cannot be more than 100"
            ),
            Self::NoTracks => "CUESHEET has no tracks, not even a lead-out".fmt(f),
            Self::MissingLeadOut(track) => {
                write!(f, "CUESHEET final track {track} is not the lead-out track")
            }
            Self::BlockSizeMismatch {
                block_type,
                declared,
                written,
            } => write!(
                f,
                "block of type {block_type} declares {declared} bytes but wrote {written}"
            ),
            Self::PictureType(t) => write!(f, "undefined PICTURE type {t}"),
            Self::VorbisCommentEntry => "VORBIS_COMMENT entry missing '='".fmt(f),
            Self::InsufficientApplicationBlock => "APPLICATION block too small for ID".fmt(f),
        }
    }
}

/// A bounded collection within a CUESHEET block
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Capacity {
    /// The cuesheet's tracks
    Tracks,
    /// A track's index points
    IndexPoints,
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Tracks => "cuesheet track list".fmt(f),
            Self::IndexPoints => "cuesheet track's index point list".fmt(f),
        }
    }
}

/// A reader which counts the bytes passing through it
#[derive(Debug)]
pub(crate) struct Counter<S> {
    pub stream: S,
    pub count: u64,
}

impl<S> Counter<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, count: 0 }
    }
}

impl<R: std::io::Read> std::io::Read for Counter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf).inspect(|amt_read| {
            self.count += *amt_read as u64;
        })
    }
}
