// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::metadata::BlockSize;
use crate::{Capacity, Error, InvalidFormat, bits};
use bitstream_io::{BitRead, BitWrite, FromBitStream, ToBitStream};

/// A CUESHEET metadata block
///
/// A cue sheet stores a disc's original layout
/// with all its tracks, index points, and disc-specific metadata.
///
/// | Bits  | Field | Meaning |
/// |------:|------:|---------|
/// | 128×8 | `media_catalog` | media catalog number, in ASCII
/// | 64    | `lead_in_samples` | number of lead-in samples
/// | 1     | `is_cd` | whether cuesheet corresponds to CD-DA
/// | 7+258×8 | padding | all 0 bits
/// | 8     | track count | number of cuesheet tracks
/// | | `tracks` | cuesheet track₀, cuesheet track₁, …
///
/// The final track must be the lead-out track,
/// numbered 170 for CD-DA and 255 otherwise.
/// This is only checked when the block is written,
/// so tracks may be assembled in any order beforehand.
///
/// # Example
///
/// ```
/// use flac_meta::metadata::{Cuesheet, CuesheetTrack, CuesheetTrackIndex};
///
/// let mut cuesheet = Cuesheet::new(true);
/// cuesheet.media_catalog = "1234567890123".to_owned();
///
/// let mut track = CuesheetTrack::new(0, 1);
/// track.index_points.push(CuesheetTrackIndex::new(0, 1)).unwrap();
/// cuesheet.tracks.push(track).unwrap();
/// cuesheet.tracks.push(CuesheetTrack::new(88200, Cuesheet::LEAD_OUT_CDDA)).unwrap();
///
/// assert_eq!(cuesheet.lead_out(), 170);
/// assert!(cuesheet.tracks.last().unwrap().is_lead_out());
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Cuesheet {
    /// Media catalog number, up to 128 ASCII characters
    pub media_catalog: String,
    /// Number of lead-in samples
    pub lead_in_samples: u64,
    /// Whether the cuesheet corresponds to a Compact Disc
    pub is_cd: bool,
    /// The cuesheet's tracks, including its lead-out
    pub tracks: Tracks,
}

impl Cuesheet {
    /// Maximum number of tracks, including the lead-out
    pub const MAX_TRACKS: usize = 100;

    /// Lead-out track number for CD-DA cuesheets
    pub const LEAD_OUT_CDDA: u8 = 170;

    /// Lead-out track number for other cuesheets
    pub const LEAD_OUT_NON_CDDA: u8 = 255;

    /// Length of media catalog field, in bytes
    pub const CATALOG_LEN: usize = 128;

    // fixed bytes ahead of the first track
    const HEADER_LEN: usize = 128 + 8 + 259 + 1;

    /// Builds empty cuesheet
    pub fn new(is_cd: bool) -> Self {
        Self {
            media_catalog: String::new(),
            lead_in_samples: 0,
            is_cd,
            tracks: Tracks::default(),
        }
    }

    /// The lead-out track number for this kind of disc
    pub fn lead_out(&self) -> u8 {
        match self.is_cd {
            true => Self::LEAD_OUT_CDDA,
            false => Self::LEAD_OUT_NON_CDDA,
        }
    }

    pub(crate) fn bytes(&self) -> Result<BlockSize, Error> {
        self.tracks
            .iter()
            .map(|track| CuesheetTrack::HEADER_LEN + 12 * track.index_points.len())
            .try_fold(Self::HEADER_LEN, |total, len| total.checked_add(len))
            .ok_or(Error::ExcessiveBlockSize)
            .and_then(BlockSize::try_from)
    }
}

impl FromBitStream for Cuesheet {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        let media_catalog: [u8; Self::CATALOG_LEN] = r.read_to()?;
        let lead_in_samples = r.read_to()?;
        let flags: [u8; 1] = r.read_to()?;
        r.skip(258 * 8)?;

        let track_count = r.read_to::<u8>()?;
        if usize::from(track_count) > Self::MAX_TRACKS {
            return Err(InvalidFormat::ExcessiveTracks(track_count).into());
        }

        let mut tracks = Tracks::default();
        for _ in 0..track_count {
            tracks.push(r.parse()?)?;
        }

        Ok(Self {
            media_catalog: ascii_field(&media_catalog),
            lead_in_samples,
            is_cd: bits::read_bool(&flags, 0, 0)?,
            tracks,
        })
    }
}

impl ToBitStream for Cuesheet {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        match self.tracks.last() {
            None => return Err(InvalidFormat::NoTracks.into()),
            Some(track) if track.number != self.lead_out() => {
                return Err(InvalidFormat::MissingLeadOut(track.number).into());
            }
            Some(_) => {}
        }

        write_padded(w, self.media_catalog.as_bytes(), Self::CATALOG_LEN)?;
        w.write_from(self.lead_in_samples)?;
        w.write_bit(self.is_cd)?;
        w.pad(7 + 258 * 8)?;
        w.write_from::<u8>(
            self.tracks
                .len()
                .try_into()
                .map_err(|_| Error::Capacity {
                    kind: Capacity::Tracks,
                    max: Self::MAX_TRACKS,
                })?,
        )?;
        self.tracks.iter().try_for_each(|track| w.build(track))
    }
}

/// An individual CUESHEET track
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 64   | `offset` | offset of first index point, in samples
/// | 8    | `number` | track number
/// | 12×8 | `isrc` | track ISRC, in ASCII
/// | 1    | `is_audio` | whether track is non-audio (inverted)
/// | 1    | `is_pre_emphasis` | whether track has pre-emphasis
/// | 6+13×8 | padding | all 0 bits
/// | 8    | point count | number of index points
/// | | `index_points` | index point₀, index point₁, …
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CuesheetTrack {
    /// Offset of first index point
    ///
    /// In samples, relative to the beginning of the FLAC audio stream.
    pub offset: u64,
    /// Track number
    pub number: u8,
    /// Track's ISRC, up to 12 ASCII characters
    pub isrc: String,
    /// Whether the track contains audio
    pub is_audio: bool,
    /// Whether the track has pre-emphasis
    pub is_pre_emphasis: bool,
    /// The track's index points
    pub index_points: IndexPoints,
}

impl CuesheetTrack {
    /// Maximum number of index points per track
    pub const MAX_INDEX_POINTS: usize = 100;

    /// Length of ISRC field, in bytes
    pub const ISRC_LEN: usize = 12;

    const HEADER_LEN: usize = 8 + 1 + 12 + 1 + 13 + 1;

    /// Builds new audio track with no index points
    pub fn new(offset: u64, number: u8) -> Self {
        Self {
            offset,
            number,
            isrc: String::new(),
            is_audio: true,
            is_pre_emphasis: false,
            index_points: IndexPoints::default(),
        }
    }

    /// Whether this is a lead-out track, of either kind
    pub fn is_lead_out(&self) -> bool {
        matches!(
            self.number,
            Cuesheet::LEAD_OUT_CDDA | Cuesheet::LEAD_OUT_NON_CDDA
        )
    }
}

impl FromBitStream for CuesheetTrack {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        let offset = r.read_to()?;
        let number = r.read_to()?;
        let isrc: [u8; Self::ISRC_LEN] = r.read_to()?;
        let flags: [u8; 1] = r.read_to()?;
        r.skip(13 * 8)?;

        let point_count = r.read_to::<u8>()?;
        if usize::from(point_count) > Self::MAX_INDEX_POINTS {
            return Err(InvalidFormat::ExcessiveIndexPoints {
                track: number,
                count: point_count,
            }
            .into());
        }

        let mut index_points = IndexPoints::default();
        for _ in 0..point_count {
            index_points.push(r.parse()?)?;
        }

        Ok(Self {
            offset,
            number,
            isrc: ascii_field(&isrc),
            is_audio: !bits::read_bool(&flags, 0, 0)?,
            is_pre_emphasis: bits::read_bool(&flags, 0, 1)?,
            index_points,
        })
    }
}

impl ToBitStream for CuesheetTrack {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_from(self.offset)?;
        w.write_from(self.number)?;
        write_padded(w, self.isrc.as_bytes(), Self::ISRC_LEN)?;
        w.write_bit(!self.is_audio)?;
        w.write_bit(self.is_pre_emphasis)?;
        w.pad(6 + 13 * 8)?;
        w.write_from::<u8>(self.index_points.len().try_into().map_err(|_| {
            Error::Capacity {
                kind: Capacity::IndexPoints,
                max: Self::MAX_INDEX_POINTS,
            }
        })?)?;
        self.index_points
            .iter()
            .try_for_each(|point| w.build(point).map_err(Error::Io))
    }
}

/// An individual CUESHEET track index point
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 64   | `offset` | offset from track's offset, in samples
/// | 8    | `number` | index point number
/// | 3×8  | padding | all 0 bits
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CuesheetTrackIndex {
    /// Offset in samples, relative to the track's offset
    pub offset: u64,
    /// Index point number
    pub number: u8,
}

impl CuesheetTrackIndex {
    /// Builds new index point
    pub fn new(offset: u64, number: u8) -> Self {
        Self { offset, number }
    }
}

impl FromBitStream for CuesheetTrackIndex {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        let index = Self {
            offset: r.read_to()?,
            number: r.read_to()?,
        };
        r.skip(3 * 8)?;
        Ok(index)
    }
}

impl ToBitStream for CuesheetTrackIndex {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_from(self.offset)?;
        w.write_from(self.number)?;
        w.pad(3 * 8)
    }
}

macro_rules! bounded {
    ($(#[$doc:meta])* $name:ident, $item:ty, $max:expr, $kind:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, Eq, PartialEq)]
        pub struct $name(Vec<$item>);

        impl $name {
            fn full(&self) -> Result<(), Error> {
                match self.0.len() < $max {
                    true => Ok(()),
                    false => Err(Error::Capacity {
                        kind: $kind,
                        max: $max,
                    }),
                }
            }

            /// Appends item to the end of the list
            ///
            /// # Errors
            ///
            /// Returns [`Error::Capacity`] if the list is full,
            /// leaving the list unchanged.
            pub fn push(&mut self, item: $item) -> Result<(), Error> {
                self.full()?;
                self.0.push(item);
                Ok(())
            }

            /// Inserts item at the given position
            ///
            /// # Errors
            ///
            /// Returns [`Error::Capacity`] if the list is full,
            /// leaving the list unchanged.
            ///
            /// # Panics
            ///
            /// Panics if `index` is greater than the list's length.
            pub fn insert(&mut self, index: usize, item: $item) -> Result<(), Error> {
                self.full()?;
                self.0.insert(index, item);
                Ok(())
            }

            /// Removes and returns item at the given position
            ///
            /// # Panics
            ///
            /// Panics if `index` is out of bounds.
            pub fn remove(&mut self, index: usize) -> $item {
                self.0.remove(index)
            }

            /// Removes and returns the final item, if any
            pub fn pop(&mut self) -> Option<$item> {
                self.0.pop()
            }

            /// Removes all items
            pub fn clear(&mut self) {
                self.0.clear()
            }
        }

        impl std::ops::Deref for $name {
            type Target = [$item];

            fn deref(&self) -> &[$item] {
                self.0.as_slice()
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut [$item] {
                self.0.as_mut_slice()
            }
        }

        impl TryFrom<Vec<$item>> for $name {
            type Error = Error;

            fn try_from(items: Vec<$item>) -> Result<Self, Error> {
                match items.len() <= $max {
                    true => Ok(Self(items)),
                    false => Err(Error::Capacity {
                        kind: $kind,
                        max: $max,
                    }),
                }
            }
        }

        impl<'i> IntoIterator for &'i $name {
            type Item = &'i $item;
            type IntoIter = std::slice::Iter<'i, $item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }
    };
}

bounded!(
    /// A CUESHEET's tracks, up to 100 of them
    Tracks,
    CuesheetTrack,
    Cuesheet::MAX_TRACKS,
    Capacity::Tracks
);

bounded!(
    /// A CUESHEET track's index points, up to 100 of them
    IndexPoints,
    CuesheetTrackIndex,
    CuesheetTrack::MAX_INDEX_POINTS,
    Capacity::IndexPoints
);

// writes bytes followed by enough nulls to fill the field
fn write_padded<W: BitWrite + ?Sized>(w: &mut W, bytes: &[u8], len: usize) -> Result<(), Error> {
    let padding = len
        .checked_sub(bytes.len())
        .ok_or(Error::ExcessiveStringLength)?;
    w.write_bytes(bytes)?;
    w.pad(u32::try_from(padding * 8).map_err(|_| Error::ExcessiveStringLength)?)?;
    Ok(())
}

// null-padded ASCII, with non-ASCII bytes read as '?'
fn ascii_field(mut s: &[u8]) -> String {
    while let [0, rest @ ..] | [rest @ .., 0] = s {
        s = rest;
    }
    s.iter()
        .map(|b| match b.is_ascii() {
            true => char::from(*b),
            false => '?',
        })
        .collect()
}
