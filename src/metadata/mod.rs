// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling a FLAC file's metadata blocks
//!
//! Many items are capitalized simply because they were capitalized
//! in the original FLAC format documentation.
//!
//! # Metadata Blocks
//!
//! FLAC supports seven different metadata block types
//!
//! | Block Type | Purpose |
//! |-----------:|---------|
//! | [STREAMINFO](`Streaminfo`) | stream information such as sample rate, channel count, etc. |
//! | [PADDING](`Padding`) | empty data which can easily be resized as needed |
//! | [APPLICATION](`Application`) | application-specific data such as foreign RIFF WAVE chunks |
//! | [SEEKTABLE](`SeekTable`) | to allow for more efficient seeking within a FLAC file |
//! | [VORBIS_COMMENT](`VorbisComment`) | textual metadata such as track title, artist name, album name, etc. |
//! | [CUESHEET](`Cuesheet`) | the original disc's layout, for CD images |
//! | [PICTURE](`Picture`) | embedded image files such as cover art |
//!
//! Any other block type is carried as an [`Unknown`] block,
//! which can be read past but not written back out.

use crate::{Error, InvalidFormat, bits};
use bitstream_io::{
    BigEndian, BitRead, BitReader, BitWrite, BitWriter, FromBitStream, FromBitStreamUsing,
    FromBitStreamWith, ToBitStream, ToBitStreamUsing,
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Types related to the CUESHEET metadata block
pub mod cuesheet;

pub use cuesheet::{Cuesheet, CuesheetTrack, CuesheetTrackIndex};

pub(crate) const FLAC_TAG: &[u8; 4] = b"fLaC";

/// A FLAC metadata block header
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 1    | `last` | final metadata block in file |
/// | 7    | `block_type` | type of block |
/// | 24   | `size` | block size, in bytes, not including header |
///
/// # Example
/// ```
/// use bitstream_io::{BitReader, BitRead, BigEndian};
/// use flac_meta::metadata::{BlockHeader, BlockType};
///
/// let data: &[u8] = &[0b1_0000100, 0x00, 0x01, 0x02];
/// let mut r = BitReader::endian(data, BigEndian);
/// assert_eq!(
///     r.parse::<BlockHeader>().unwrap(),
///     BlockHeader {
///         last: true,                            // 0b1
///         block_type: BlockType::VorbisComment,  // 0b0000100
///         size: 0x00_01_02u16.into(),            // 0x00, 0x01, 0x02
///     },
/// );
/// ```
///
/// STREAMINFO headers always report a size of 34 bytes,
/// whatever their size field says.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockHeader {
    /// Whether we are the final block
    pub last: bool,
    /// Our block type
    pub block_type: BlockType,
    /// Our block size, in bytes
    pub size: BlockSize,
}

impl BlockHeader {
    /// Size of the header itself, in bytes
    pub const SIZE: BlockSize = BlockSize(4);
}

impl FromBitStream for BlockHeader {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        let raw: [u8; 4] = r.read_to()?;
        let block_type = BlockType::from(bits::read_bits(&raw, 0, 7, 1)? as u8);

        Ok(Self {
            last: bits::read_bool(&raw, 0, 0)?,
            block_type,
            size: match block_type {
                BlockType::Streaminfo => Streaminfo::SIZE,
                _ => BlockSize(bits::read_bits_at(&raw, 1, 24)? as u32),
            },
        })
    }
}

impl ToBitStream for BlockHeader {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        let raw = (u64::from(self.last) << 31)
            | (u64::from(u8::from(self.block_type) & 0x7f) << 24)
            | u64::from(self.size.get());
        w.write_bytes(&bits::pack(raw, 4)?)?;
        Ok(())
    }
}

/// A FLAC metadata block type
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum BlockType {
    /// The STREAMINFO block
    Streaminfo,
    /// The PADDING block
    Padding,
    /// The APPLICATION block
    Application,
    /// The SEEKTABLE block
    SeekTable,
    /// The VORBIS_COMMENT block
    VorbisComment,
    /// The CUESHEET block
    Cuesheet,
    /// The PICTURE block
    Picture,
    /// A reserved block type, from 7 to 126
    Reserved(u8),
    /// The invalid block type, 127
    Invalid,
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Streaminfo => "STREAMINFO".fmt(f),
            Self::Padding => "PADDING".fmt(f),
            Self::Application => "APPLICATION".fmt(f),
            Self::SeekTable => "SEEKTABLE".fmt(f),
            Self::VorbisComment => "VORBIS_COMMENT".fmt(f),
            Self::Cuesheet => "CUESHEET".fmt(f),
            Self::Picture => "PICTURE".fmt(f),
            Self::Reserved(t) => write!(f, "RESERVED({t})"),
            Self::Invalid => "INVALID".fmt(f),
        }
    }
}

impl From<u8> for BlockType {
    fn from(t: u8) -> Self {
        match t & 0x7f {
            0 => Self::Streaminfo,
            1 => Self::Padding,
            2 => Self::Application,
            3 => Self::SeekTable,
            4 => Self::VorbisComment,
            5 => Self::Cuesheet,
            6 => Self::Picture,
            127 => Self::Invalid,
            t => Self::Reserved(t),
        }
    }
}

impl From<BlockType> for u8 {
    fn from(t: BlockType) -> u8 {
        match t {
            BlockType::Streaminfo => 0,
            BlockType::Padding => 1,
            BlockType::Application => 2,
            BlockType::SeekTable => 3,
            BlockType::VorbisComment => 4,
            BlockType::Cuesheet => 5,
            BlockType::Picture => 6,
            BlockType::Reserved(t) => t,
            BlockType::Invalid => 127,
        }
    }
}

/// A 24-bit block size value, with safeguards against overflow
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct BlockSize(u32);

impl BlockSize {
    /// A value of 0
    pub const ZERO: BlockSize = BlockSize(0);

    /// The largest possible block size (2²⁴ - 1)
    pub const MAX: u32 = (1 << 24) - 1;

    /// Our current value as a u32
    #[inline]
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Conditionally add `BlockSize` to ourself
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0
            .checked_add(rhs.0)
            .filter(|s| *s <= Self::MAX)
            .map(Self)
    }
}

impl std::fmt::Display for BlockSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u8> for BlockSize {
    fn from(u: u8) -> Self {
        Self(u.into())
    }
}

impl From<u16> for BlockSize {
    fn from(u: u16) -> Self {
        Self(u.into())
    }
}

impl TryFrom<u32> for BlockSize {
    type Error = Error;

    fn try_from(u: u32) -> Result<Self, Self::Error> {
        (u <= Self::MAX)
            .then_some(Self(u))
            .ok_or(Error::ExcessiveBlockSize)
    }
}

impl TryFrom<usize> for BlockSize {
    type Error = Error;

    fn try_from(u: usize) -> Result<Self, Self::Error> {
        u32::try_from(u)
            .map_err(|_| Error::ExcessiveBlockSize)
            .and_then(Self::try_from)
    }
}

impl From<BlockSize> for u32 {
    #[inline]
    fn from(size: BlockSize) -> u32 {
        size.0
    }
}

/// A type of FLAC metadata block which can be written
pub trait MetadataBlock: ToBitStream<Error: Into<Error>> + Into<Block> + TryFrom<Block> {
    /// The metadata block's type
    const TYPE: BlockType;

    /// Size of the block's encoded payload, in bytes,
    /// not including its header
    fn size(&self) -> Result<BlockSize, Error>;

    /// The header to be written before the block
    fn header(&self, last: bool) -> Result<BlockHeader, Error> {
        Ok(BlockHeader {
            last,
            block_type: Self::TYPE,
            size: self.size()?,
        })
    }

    /// Attempts to borrow ourself from a generic block
    fn from_block(block: &Block) -> Option<&Self>;

    /// Attempts to mutably borrow ourself from a generic block
    fn from_block_mut(block: &mut Block) -> Option<&mut Self>;
}

// serializes payload into a buffer so its length can be checked
// against the header's declared size before either is written
fn write_block<B, W>(w: &mut W, block: &B, last: bool) -> Result<(), Error>
where
    B: MetadataBlock,
    W: BitWrite + ?Sized,
{
    let header = block.header(last)?;

    let mut payload = vec![];
    BitWriter::endian(&mut payload, BigEndian)
        .build(block)
        .map_err(Into::<Error>::into)?;

    if usize::try_from(header.size.get()).ok() != Some(payload.len()) {
        return Err(InvalidFormat::BlockSizeMismatch {
            block_type: header.block_type.into(),
            declared: header.size.get(),
            written: payload.len(),
        }
        .into());
    }

    w.build(&header)?;
    w.write_bytes(&payload)?;
    trace!(
        message = "Wrote block",
        block_type = %header.block_type,
        size = payload.len(),
        last
    );
    Ok(())
}

/// A FLAC metadata block
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Block {
    /// The STREAMINFO block
    Streaminfo(Streaminfo),
    /// The PADDING block
    Padding(Padding),
    /// The APPLICATION block
    Application(Application),
    /// The SEEKTABLE block
    SeekTable(SeekTable),
    /// The VORBIS_COMMENT block
    VorbisComment(VorbisComment),
    /// The CUESHEET block
    Cuesheet(Cuesheet),
    /// The PICTURE block
    Picture(Picture),
    /// A block of some other type
    Unknown(Unknown),
}

impl Block {
    /// Our block type
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Streaminfo(_) => BlockType::Streaminfo,
            Self::Padding(_) => BlockType::Padding,
            Self::Application(_) => BlockType::Application,
            Self::SeekTable(_) => BlockType::SeekTable,
            Self::VorbisComment(_) => BlockType::VorbisComment,
            Self::Cuesheet(_) => BlockType::Cuesheet,
            Self::Picture(_) => BlockType::Picture,
            Self::Unknown(u) => u.block_type,
        }
    }

    /// Whether the block can be written back out
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Our header, as it would be written at the given position
    ///
    /// An unknown block returns the header it was read with.
    pub fn header(&self, last: bool) -> Result<BlockHeader, Error> {
        match self {
            Self::Streaminfo(b) => b.header(last),
            Self::Padding(b) => b.header(last),
            Self::Application(b) => b.header(last),
            Self::SeekTable(b) => b.header(last),
            Self::VorbisComment(b) => b.header(last),
            Self::Cuesheet(b) => b.header(last),
            Self::Picture(b) => b.header(last),
            Self::Unknown(u) => Ok(BlockHeader {
                last,
                block_type: u.block_type,
                size: u.size,
            }),
        }
    }
}

impl FromBitStreamWith<'_> for Block {
    type Context = BlockHeader;
    type Error = Error;

    // parses from reader without header
    fn from_reader<R: BitRead + ?Sized>(
        r: &mut R,
        header: &BlockHeader,
    ) -> Result<Self, Self::Error> {
        match header.block_type {
            BlockType::Streaminfo => Ok(Block::Streaminfo(r.parse()?)),
            BlockType::Padding => Ok(Block::Padding(r.parse_using(header.size)?)),
            BlockType::Application => Ok(Block::Application(r.parse_using(header.size)?)),
            BlockType::SeekTable => Ok(Block::SeekTable(r.parse_using(header.size)?)),
            BlockType::VorbisComment => Ok(Block::VorbisComment(r.parse()?)),
            BlockType::Cuesheet => Ok(Block::Cuesheet(r.parse()?)),
            BlockType::Picture => Ok(Block::Picture(r.parse()?)),
            block_type @ (BlockType::Reserved(_) | BlockType::Invalid) => {
                Ok(Block::Unknown(Unknown {
                    block_type,
                    size: header.size,
                }))
            }
        }
    }
}

impl ToBitStreamUsing for Block {
    type Context = bool;
    type Error = Error;

    // builds to writer with header
    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W, is_last: bool) -> Result<(), Error> {
        match self {
            Self::Streaminfo(streaminfo) => write_block(w, streaminfo, is_last),
            Self::Padding(padding) => write_block(w, padding, is_last),
            Self::Application(application) => write_block(w, application, is_last),
            Self::SeekTable(seektable) => write_block(w, seektable, is_last),
            Self::VorbisComment(vorbis_comment) => write_block(w, vorbis_comment, is_last),
            Self::Cuesheet(cuesheet) => write_block(w, cuesheet, is_last),
            Self::Picture(picture) => write_block(w, picture, is_last),
            // unknown payloads are never retained, so there's nothing to write
            Self::Unknown(_) => Ok(()),
        }
    }
}

macro_rules! block {
    ($t:ty, $v:ident) => {
        impl From<$t> for Block {
            fn from(b: $t) -> Self {
                Self::$v(b)
            }
        }

        impl TryFrom<Block> for $t {
            type Error = Block;

            fn try_from(block: Block) -> Result<Self, Block> {
                match block {
                    Block::$v(block) => Ok(block),
                    block => Err(block),
                }
            }
        }
    };
}

macro_rules! metadata_block {
    ($t:ty, $v:ident) => {
        block!($t, $v);

        impl MetadataBlock for $t {
            const TYPE: BlockType = BlockType::$v;

            fn size(&self) -> Result<BlockSize, Error> {
                self.bytes()
            }

            fn from_block(block: &Block) -> Option<&Self> {
                match block {
                    Block::$v(block) => Some(block),
                    _ => None,
                }
            }

            fn from_block_mut(block: &mut Block) -> Option<&mut Self> {
                match block {
                    Block::$v(block) => Some(block),
                    _ => None,
                }
            }
        }
    };
}

// like a slightly easier variant of "Take"
struct LimitedReader<R> {
    reader: R,
    size: usize,
}

impl<R: std::io::Read> std::io::Read for LimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let size = self.size.min(buf.len());
        self.reader.read(&mut buf[0..size]).inspect(|amt_read| {
            self.size -= amt_read;
        })
    }
}

/// An iterator over FLAC metadata blocks
///
/// Stops after the block flagged as last,
/// or after the first error.
pub struct BlockIterator<R: std::io::Read> {
    reader: R,
    tag_read: bool,
    finished: bool,
}

impl<R: std::io::Read> BlockIterator<R> {
    /// Creates an iterator over something that implements `Read`.
    /// Because this may perform many small reads,
    /// performance is greatly improved by buffering reads
    /// when reading from a raw `File`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tag_read: false,
            finished: false,
        }
    }

    fn read_tag(&mut self) -> Result<(), Error> {
        let mut tag = [0; 4];
        match self.reader.read_exact(&mut tag) {
            Ok(()) if &tag == FLAC_TAG => Ok(()),
            Ok(()) => Err(InvalidFormat::MissingFlacTag.into()),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(InvalidFormat::MissingFlacTag.into())
            }
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn read_block(&mut self) -> Result<Block, Error> {
        let header: BlockHeader = BitReader::endian(&mut self.reader, BigEndian).parse()?;

        let mut reader = BitReader::endian(
            LimitedReader {
                reader: self.reader.by_ref(),
                size: header
                    .size
                    .get()
                    .try_into()
                    .map_err(|_| Error::ExcessiveBlockSize)?,
            },
            BigEndian,
        );

        let block = reader.parse_with(&header)?;

        // anything the codec left unread is skipped over
        let mut remaining = reader.into_reader();
        if remaining.size > 0 {
            trace!(
                message = "Skipping unread block bytes",
                block_type = %header.block_type,
                remaining = remaining.size
            );
            std::io::copy(&mut remaining, &mut std::io::sink())?;
        }

        debug!(
            message = "Read block",
            block_type = %header.block_type,
            size = %header.size,
            last = header.last
        );
        self.finished = header.last;
        Ok(block)
    }
}

impl<R: std::io::Read> Iterator for BlockIterator<R> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            None
        } else if !self.tag_read {
            // "fLaC" tag must come before anything else
            match self.read_tag() {
                Ok(()) => {
                    self.tag_read = true;
                    self.next()
                }
                Err(err) => {
                    self.finished = true;
                    Some(Err(err))
                }
            }
        } else {
            Some(self.read_block().inspect_err(|_| {
                // once we hit an error, stop any further reads
                self.finished = true;
            }))
        }
    }
}

/// Returns iterator of blocks from the given reader
///
/// The reader should be positioned at the start of the FLAC
/// file, and is left positioned at the start of the
/// audio frames once the iterator is exhausted.
///
/// # Example
///
/// ```
/// use flac_meta::metadata::{read_blocks, write_blocks, Application, Block, Padding};
///
/// let mut flac = vec![];
/// write_blocks(
///     &mut flac,
///     &[
///         Block::from(Application::new(0x1234, vec![1, 2, 3, 4])),
///         Block::from(Padding::new(80).unwrap()),
///     ],
/// ).unwrap();
///
/// let blocks = read_blocks(flac.as_slice())
///     .collect::<Result<Vec<Block>, _>>()
///     .unwrap();
///
/// assert_eq!(
///     blocks,
///     vec![
///         Application::new(0x1234, vec![1, 2, 3, 4]).into(),
///         Padding::new(80).unwrap().into(),
///     ],
/// );
/// ```
pub fn read_blocks<R: std::io::Read>(r: R) -> BlockIterator<R> {
    BlockIterator::new(r)
}

/// Writes the "fLaC" tag and the given blocks to the given writer
///
/// Only the final block written is flagged as last.
/// Blocks which cannot be written (such as [`Unknown`] blocks)
/// are dropped from the output.
///
/// # Errors
///
/// Passes along any I/O errors, along with any errors
/// from a block which is not in a writable state.
pub fn write_blocks<'b>(
    mut w: impl std::io::Write,
    blocks: impl IntoIterator<Item = &'b Block>,
) -> Result<(), Error> {
    fn iter_last<T>(i: impl Iterator<Item = T>) -> impl Iterator<Item = (bool, T)> {
        struct LastIterator<I: std::iter::Iterator> {
            iter: std::iter::Peekable<I>,
        }

        impl<T, I: std::iter::Iterator<Item = T>> Iterator for LastIterator<I> {
            type Item = (bool, T);

            fn next(&mut self) -> Option<Self::Item> {
                let item = self.iter.next()?;
                Some((self.iter.peek().is_none(), item))
            }
        }

        LastIterator { iter: i.peekable() }
    }

    w.write_all(FLAC_TAG)?;

    let mut w = BitWriter::endian(w, BigEndian);

    iter_last(blocks.into_iter().filter(|block| match block {
        Block::Unknown(unknown) => {
            debug!(
                message = "Dropping unwritable block",
                block_type = %unknown.block_type,
                size = %unknown.size
            );
            false
        }
        _ => true,
    }))
    .try_for_each(|(last, block)| w.build_using(block, last))?;

    w.into_writer().flush()?;
    Ok(())
}

/// A STREAMINFO metadata block
///
/// This block contains metadata about the stream's contents.
///
/// It must *always* be present in a FLAC file.
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 16   | `minimum_block_size` | minimum block size (in samples) in the stream
/// | 16   | `maximum_block_size` | maximum block size (in samples) in the stream
/// | 24   | `minimum_frame_size` | minimum frame size (in bytes) in the stream
/// | 24   | `maximum_frame_size` | maximum frame size (in bytes) in the stream
/// | 20   | `sample_rate` | stream's sample rate, in Hz
/// | 3    | `channels` | stream's channel count (+1)
/// | 5    | `bits_per_sample` | stream's bits-per-sample (+1)
/// | 36   | `total_samples` | stream's total channel-independent samples
/// | 16×8 | `md5` | decoded stream's MD5 sum hash
///
/// The 64 bits from `sample_rate` to `total_samples`
/// are read as a single big-endian field and split apart.
///
/// # Example
/// ```
/// use bitstream_io::{BitReader, BitRead, BigEndian};
/// use flac_meta::metadata::Streaminfo;
///
/// let data: &[u8] = &[
///     0x10, 0x00,
///     0x10, 0x00,
///     0x00, 0x00, 0x0c,
///     0x00, 0x00, 0x0c,
///     0b00001010, 0b11000100, 0b0100_000_0, 0b1111_0000,
///     0b00000000, 0b00000000, 0b00000000, 0b01010000,
///     0xf5, 0x3f, 0x86, 0x87, 0x6d, 0xcd, 0x77, 0x83,
///     0x22, 0x5c, 0x93, 0xba, 0x8a, 0x93, 0x8c, 0x7d,
/// ];
///
/// let mut r = BitReader::endian(data, BigEndian);
/// let streaminfo = r.parse::<Streaminfo>().unwrap();
///
/// assert_eq!(streaminfo.minimum_block_size, 0x10_00);
/// assert_eq!(streaminfo.maximum_frame_size, 0x00_00_0c);
/// assert_eq!(streaminfo.sample_rate, 44100);
/// assert_eq!(streaminfo.channels, 1);
/// assert_eq!(streaminfo.bits_per_sample, 16);
/// assert_eq!(streaminfo.total_samples, 80);
/// assert_eq!(streaminfo.duration(), Some(0));
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Streaminfo {
    /// The minimum block size (in samples) used in the stream,
    /// excluding the last block.
    pub minimum_block_size: u16,
    /// The maximum block size (in samples) used in the stream,
    /// excluding the last block.
    pub maximum_block_size: u16,
    /// The minimum framesize (in bytes) used in the stream.
    ///
    /// 0 indicates the value is unknown.
    pub minimum_frame_size: u32,
    /// The maximum framesize (in bytes) used in the stream.
    ///
    /// 0 indicates the value is unknown.
    pub maximum_frame_size: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels, from 1 to 8
    pub channels: u8,
    /// Number of bits-per-sample, from 1 to 32
    pub bits_per_sample: u8,
    /// Total number of interchannel samples in stream.
    ///
    /// 0 indicates the value is unknown.
    pub total_samples: u64,
    /// MD5 hash of unencoded audio data.
    pub md5: [u8; 16],
}

impl Streaminfo {
    /// The maximum size of a frame, in bytes (2²⁴ - 1)
    pub const MAX_FRAME_SIZE: u32 = (1 << 24) - 1;

    /// The maximum sample rate, in Hz (2²⁰ - 1)
    pub const MAX_SAMPLE_RATE: u32 = (1 << 20) - 1;

    /// The maximum number of channels (8)
    pub const MAX_CHANNELS: u8 = 8;

    /// The maximum number of bits-per-sample (32)
    pub const MAX_BITS_PER_SAMPLE: u8 = 32;

    /// The maximum number of total samples (2³⁶ - 1)
    pub const MAX_TOTAL_SAMPLES: u64 = (1 << 36) - 1;

    /// Defined size of STREAMINFO block
    pub const SIZE: BlockSize = BlockSize(34);

    /// Stream's duration in whole seconds, with any partial second dropped
    ///
    /// Returns `None` if the sample rate is 0.
    pub fn duration(&self) -> Option<u64> {
        let rate = u64::from(self.sample_rate);
        (rate > 0).then(|| self.total_samples / rate)
    }

    fn bytes(&self) -> Result<BlockSize, Error> {
        Ok(Self::SIZE)
    }
}

metadata_block!(Streaminfo, Streaminfo);

impl FromBitStream for Streaminfo {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        let minimum_block_size = r.read_to()?;
        let maximum_block_size = r.read_to()?;
        let minimum_frame_size = r.read::<24, _>()?;
        let maximum_frame_size = r.read::<24, _>()?;
        let packed: [u8; 8] = r.read_to()?;

        Ok(Self {
            minimum_block_size,
            maximum_block_size,
            minimum_frame_size,
            maximum_frame_size,
            sample_rate: bits::read_bits_at(&packed, 0, 20)? as u32,
            channels: bits::read_bits(&packed, 2, 3, 4)? as u8 + 1,
            bits_per_sample: bits::read_bits(&packed, 2, 5, 7)? as u8 + 1,
            total_samples: bits::read_bits(&packed, 3, 36, 4)?,
            md5: r.read_to()?,
        })
    }
}

impl ToBitStream for Streaminfo {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        if self.minimum_frame_size > Self::MAX_FRAME_SIZE
            || self.maximum_frame_size > Self::MAX_FRAME_SIZE
            || self.sample_rate > Self::MAX_SAMPLE_RATE
            || !(1..=Self::MAX_CHANNELS).contains(&self.channels)
            || !(1..=Self::MAX_BITS_PER_SAMPLE).contains(&self.bits_per_sample)
            || self.total_samples > Self::MAX_TOTAL_SAMPLES
        {
            return Err(Error::InvalidStreaminfo);
        }

        w.write_from(self.minimum_block_size)?;
        w.write_from(self.maximum_block_size)?;
        w.write::<24, _>(self.minimum_frame_size)?;
        w.write::<24, _>(self.maximum_frame_size)?;
        w.write_from(
            (u64::from(self.sample_rate) << 44)
                | (u64::from(self.channels - 1) << 41)
                | (u64::from(self.bits_per_sample - 1) << 36)
                | self.total_samples,
        )?;
        w.write_from(self.md5)?;
        Ok(())
    }
}

/// A PADDING metadata block
///
/// Padding blocks are empty blocks consisting of all 0 bytes.
/// If one wishes to edit the metadata in other blocks,
/// adjusting the size of the padding block allows
/// us to do so without have to rewrite the entire FLAC file.
///
/// This block may occur multiple times in a FLAC file.
///
/// Its size is tracked in bits, but must always
/// be a whole number of bytes.
///
/// # Example
///
/// ```
/// use flac_meta::{Error, metadata::Padding};
///
/// let mut padding = Padding::new(256).unwrap();
/// assert_eq!(padding.empty_bit_count(), 256);
///
/// assert!(matches!(
///     padding.set_empty_bit_count(255),
///     Err(Error::InvalidPaddingBitCount(255)),
/// ));
/// assert_eq!(padding.empty_bit_count(), 256);
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Padding {
    empty_bit_count: u32,
}

impl Padding {
    /// Builds new padding of the given size, in bits
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPaddingBitCount`] if the size
    /// is not a multiple of 8, or [`Error::ExcessiveBlockSize`]
    /// if it's too large for a metadata block.
    pub fn new(empty_bit_count: u32) -> Result<Self, Error> {
        let mut padding = Self::default();
        padding.set_empty_bit_count(empty_bit_count)?;
        Ok(padding)
    }

    /// The size of the padding, in bits
    pub fn empty_bit_count(&self) -> u32 {
        self.empty_bit_count
    }

    /// Resizes padding to the given number of bits
    ///
    /// The padding is left unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPaddingBitCount`] if the size
    /// is not a multiple of 8, or [`Error::ExcessiveBlockSize`]
    /// if it's too large for a metadata block.
    pub fn set_empty_bit_count(&mut self, empty_bit_count: u32) -> Result<(), Error> {
        if !empty_bit_count.is_multiple_of(8) {
            return Err(Error::InvalidPaddingBitCount(empty_bit_count));
        }
        BlockSize::try_from(empty_bit_count / 8)?;
        self.empty_bit_count = empty_bit_count;
        Ok(())
    }

    fn bytes(&self) -> Result<BlockSize, Error> {
        BlockSize::try_from(self.empty_bit_count / 8)
    }
}

metadata_block!(Padding, Padding);

impl FromBitStreamUsing for Padding {
    type Context = BlockSize;
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R, size: BlockSize) -> Result<Self, Self::Error> {
        r.skip(size.get() * 8)?;
        Ok(Self {
            empty_bit_count: size.get() * 8,
        })
    }
}

impl ToBitStream for Padding {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.pad(self.empty_bit_count)
    }
}

/// An APPLICATION metadata block
///
/// This block is for handling application-specific binary metadata,
/// such as foreign RIFF WAVE tags.
///
/// This block may occur multiple times in a FLAC file.
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 32   | `id` | registered application ID
/// | rest of block | `data` | application-specific data
///
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Application {
    /// A registered application ID
    pub id: u32,
    /// Application-specific data
    pub data: Vec<u8>,
}

impl Application {
    /// Application ID for RIFF chunk storage
    pub const RIFF: u32 = 0x72696666;

    /// Application ID for AIFF chunk storage
    pub const AIFF: u32 = 0x61696666;

    /// Builds new APPLICATION block from ID and data
    pub fn new(id: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    fn bytes(&self) -> Result<BlockSize, Error> {
        self.data
            .len()
            .checked_add(4)
            .ok_or(Error::ExcessiveBlockSize)
            .and_then(BlockSize::try_from)
    }
}

metadata_block!(Application, Application);

impl FromBitStreamUsing for Application {
    type Context = BlockSize;
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R, size: BlockSize) -> Result<Self, Self::Error> {
        let data_size = size
            .get()
            .checked_sub(4)
            .ok_or(InvalidFormat::InsufficientApplicationBlock)?;

        Ok(Self {
            id: r.read_to()?,
            data: r.read_to_vec(
                data_size
                    .try_into()
                    .map_err(|_| Error::ExcessiveBlockSize)?,
            )?,
        })
    }
}

impl ToBitStream for Application {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_from(self.id)?;
        w.write_bytes(&self.data)
    }
}

/// A SEEKTABLE metadata block
///
/// Because FLAC frames do not store their compressed length,
/// a seek table is used for quicker random access
/// within a FLAC file.
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 18×8×count | `points` | seek points
///
/// Real seek points are kept ordered by sample number
/// and written first, followed by any placeholder points.
///
/// # Example
///
/// ```
/// use flac_meta::metadata::{SeekPoint, SeekTable};
///
/// let mut table = SeekTable::default();
/// table.points.add(SeekPoint::placeholder());
/// table.points.add(SeekPoint::new(4096, 1000, 4096));
/// table.points.add(SeekPoint::new(0, 0, 4096));
/// table.points.add(SeekPoint::placeholder());
///
/// assert_eq!(table.points.placeholders(), 2);
/// assert_eq!(
///     table.points.iter().map(|p| p.first_sample_number()).collect::<Vec<_>>(),
///     vec![0, 4096],
/// );
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct SeekTable {
    /// The seek table's points
    pub points: SeekPoints,
}

impl SeekTable {
    fn bytes(&self) -> Result<BlockSize, Error> {
        u32::try_from(self.points.len())
            .ok()
            .and_then(|real| real.checked_add(self.points.placeholders()))
            .and_then(|count| count.checked_mul(SeekPoint::SIZE))
            .ok_or(Error::ExcessiveBlockSize)
            .and_then(BlockSize::try_from)
    }
}

metadata_block!(SeekTable, SeekTable);

impl FromBitStreamUsing for SeekTable {
    type Context = BlockSize;
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R, size: BlockSize) -> Result<Self, Self::Error> {
        // any partial point at the end is left for the block reader to skip
        let mut points = SeekPoints::default();
        for _ in 0..size.get() / SeekPoint::SIZE {
            points.add(r.parse()?);
        }
        Ok(Self { points })
    }
}

impl ToBitStream for SeekTable {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        self.points.iter().try_for_each(|point| w.build(point))?;
        (0..self.points.placeholders()).try_for_each(|_| w.build(&SeekPoint::placeholder()))
    }
}

/// An individual SEEKTABLE seek point
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 64   | `first_sample_number` | sample number of first sample in target frame
/// | 64   | `byte_offset` | offset, in bytes, from first frame to target frame's header
/// | 16   | `number_of_samples` | number of samples in target frame
///
/// A seek point whose sample number is all 1 bits
/// is a placeholder.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SeekPoint {
    first_sample_number: u64,
    /// Offset to frame, in bytes, from the start of the first frame
    pub byte_offset: u64,
    /// Number of samples in frame
    pub number_of_samples: u16,
}

impl SeekPoint {
    /// The sample number which marks a placeholder point
    pub const PLACEHOLDER: u64 = u64::MAX;

    const SIZE: u32 = (64 + 64 + 16) / 8;

    /// Builds a new seek point
    pub fn new(first_sample_number: u64, byte_offset: u64, number_of_samples: u16) -> Self {
        Self {
            first_sample_number,
            byte_offset,
            number_of_samples,
        }
    }

    /// Builds a new placeholder seek point
    pub fn placeholder() -> Self {
        Self::new(Self::PLACEHOLDER, 0, 0)
    }

    /// The sample number of the first sample in the target frame
    pub fn first_sample_number(&self) -> u64 {
        self.first_sample_number
    }

    /// Retargets the seek point
    ///
    /// Setting the sample number to [`SeekPoint::PLACEHOLDER`]
    /// turns the point into a placeholder.
    pub fn set_first_sample_number(&mut self, first_sample_number: u64) {
        self.first_sample_number = first_sample_number;
    }

    /// Whether the point is a placeholder
    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.first_sample_number == Self::PLACEHOLDER
    }
}

impl FromBitStream for SeekPoint {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            first_sample_number: r.read_to()?,
            byte_offset: r.read_to()?,
            number_of_samples: r.read_to()?,
        })
    }
}

impl ToBitStream for SeekPoint {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_from(self.first_sample_number)?;
        w.write_from(self.byte_offset)?;
        w.write_from(self.number_of_samples)
    }
}

/// The seek points of a SEEKTABLE
///
/// Real points are keyed by their first sample number,
/// so adding a point with the same sample number as
/// an existing one replaces it.
/// Placeholder points carry no data of their own
/// and are only counted.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct SeekPoints {
    points: BTreeMap<u64, SeekPoint>,
    placeholders: u32,
}

impl SeekPoints {
    /// Adds seek point to collection
    pub fn add(&mut self, point: SeekPoint) {
        match point.is_placeholder() {
            true => self.placeholders += 1,
            false => {
                self.points.insert(point.first_sample_number, point);
            }
        }
    }

    /// Removes the point with the given sample number, if any
    ///
    /// Removing [`SeekPoint::PLACEHOLDER`] removes one placeholder.
    pub fn remove(&mut self, first_sample_number: u64) -> Option<SeekPoint> {
        match first_sample_number {
            SeekPoint::PLACEHOLDER => self.placeholders.checked_sub(1).map(|placeholders| {
                self.placeholders = placeholders;
                SeekPoint::placeholder()
            }),
            _ => self.points.remove(&first_sample_number),
        }
    }

    /// Returns real seek point with the given sample number, if any
    pub fn get(&self, first_sample_number: u64) -> Option<&SeekPoint> {
        self.points.get(&first_sample_number)
    }

    /// Returns mutable seek point with the given sample number, if any
    ///
    /// The point's sample number cannot be changed in place.
    pub fn get_mut(&mut self, first_sample_number: u64) -> Option<SeekPointMut<'_>> {
        self.points
            .get_mut(&first_sample_number)
            .map(|point| SeekPointMut {
                byte_offset: &mut point.byte_offset,
                number_of_samples: &mut point.number_of_samples,
            })
    }

    /// Whether a real seek point exists for the given sample number
    pub fn contains_key(&self, first_sample_number: u64) -> bool {
        self.points.contains_key(&first_sample_number)
    }

    /// Iterates over real seek points in ascending sample number order
    pub fn iter(&self) -> impl Iterator<Item = &SeekPoint> {
        self.points.values()
    }

    /// Number of real seek points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether there are no points at all, real or placeholder
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.placeholders == 0
    }

    /// Number of placeholder seek points
    pub fn placeholders(&self) -> u32 {
        self.placeholders
    }

    /// Sets the number of placeholder seek points
    pub fn set_placeholders(&mut self, placeholders: u32) {
        self.placeholders = placeholders;
    }
}

/// The editable fields of a stored seek point
#[derive(Debug)]
pub struct SeekPointMut<'p> {
    /// Offset to frame, in bytes, from the start of the first frame
    pub byte_offset: &'p mut u64,
    /// Number of samples in frame
    pub number_of_samples: &'p mut u16,
}

/// A VORBIS_COMMENT metadata block
///
/// This block contains metadata such as track name,
/// artist name, album name, etc.  Its contents are
/// UTF-8 encoded, `=`-delimited text fields
/// with a field name followed by value,
/// such as:
///
/// ```text
/// TITLE=Track Title
/// ```
///
/// Field names are case-insensitive and
/// may occur multiple times within the same comment
/// (a track may have multiple artists and choose to store
/// an "ARTIST" field for each one).
/// Values sharing a field name are grouped together
/// under the spelling of whichever was seen first.
///
/// Unlike the rest of the container, the lengths
/// in this block are little-endian.
///
/// | Bits      | Field | Meaning |
/// |----------:|------:|---------|
/// | 32        | vendor string len | length of vendor string, in bytes
/// | `len`×8   | `vendor_string` | vendor string, in UTF-8
/// | 32        | value count | total number of field values
/// | 32        | value₀ len | length of value₀, in bytes
/// | `len`×8   | value₀ | first `NAME=value` entry, in UTF-8
/// | 32        | value₁ len | length of value₁, in bytes
/// | `len`×8   | value₁ | second `NAME=value` entry, in UTF-8
/// | | | ⋮
///
/// # Example
///
/// ```
/// use flac_meta::metadata::{VorbisComment, fields::{ALBUM, ARTIST, TITLE}};
///
/// let mut comment = VorbisComment::default();
/// comment.add(TITLE, "Testing");
/// comment.add("artist", "Artist 1");
/// comment.add(ARTIST, "Artist 2");
///
/// assert_eq!(comment.get(TITLE).unwrap().value(), "Testing");
/// assert_eq!(comment.get(ARTIST).unwrap().as_slice(), ["Artist 1", "Artist 2"]);
/// assert!(comment.get(ALBUM).is_none());
///
/// // the mutable accessors create an empty field on a miss
/// assert!(comment.album().is_empty());
/// assert!(comment.contains(ALBUM));
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VorbisComment {
    /// The vendor string
    pub vendor_string: String,
    fields: Vec<(String, VorbisCommentValues)>,
}

impl Default for VorbisComment {
    fn default() -> Self {
        Self {
            vendor_string: concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
                .to_owned(),
            fields: vec![],
        }
    }
}

macro_rules! field_accessor {
    ($name:ident, $field:ident) => {
        #[doc = concat!("Values of the ", stringify!($field), " field, created empty if absent")]
        pub fn $name(&mut self) -> &mut VorbisCommentValues {
            self.entry(fields::$field)
        }
    };
}

impl VorbisComment {
    fn position(&self, field: &str) -> Option<usize> {
        assert!(!field.contains('='), "field must not contain '='");

        self.fields
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(field))
    }

    /// Given a field name, returns its values, if present
    ///
    /// Fields are matched case-insensitively
    ///
    /// # Panics
    ///
    /// Panics if field contains the `=` character.
    pub fn get(&self, field: &str) -> Option<&VorbisCommentValues> {
        self.position(field).map(|i| &self.fields[i].1)
    }

    /// Given a field name, returns its mutable values, if present
    ///
    /// # Panics
    ///
    /// Panics if field contains the `=` character.
    pub fn get_mut(&mut self, field: &str) -> Option<&mut VorbisCommentValues> {
        self.position(field).map(|i| &mut self.fields[i].1)
    }

    /// Given a field name, returns its mutable values,
    /// adding an empty field if not already present
    ///
    /// Fields are matched case-insensitively.
    /// An empty field is not written to disk
    /// until it has at least one value.
    ///
    /// # Panics
    ///
    /// Panics if field contains the `=` character.
    ///
    /// # Example
    ///
    /// ```
    /// use flac_meta::metadata::VorbisComment;
    ///
    /// let mut comment = VorbisComment::default();
    /// comment.entry("Artist").push("Artist 1");
    /// comment.entry("ARTIST").push("Artist 2");
    ///
    /// assert_eq!(comment.iter().count(), 1);
    /// assert_eq!(comment.iter().next().unwrap().0, "Artist");
    /// assert_eq!(comment.value_count(), 2);
    /// ```
    pub fn entry(&mut self, field: &str) -> &mut VorbisCommentValues {
        let index = match self.position(field) {
            Some(index) => index,
            None => {
                self.fields
                    .push((field.to_owned(), VorbisCommentValues::default()));
                self.fields.len() - 1
            }
        };
        &mut self.fields[index].1
    }

    /// Adds new value to the given field
    ///
    /// # Panics
    ///
    /// Panics if field contains the `=` character.
    pub fn add<S>(&mut self, field: &str, value: S)
    where
        S: std::fmt::Display,
    {
        self.entry(field).push(value);
    }

    /// Replaces any values of the given field with a single value
    ///
    /// # Panics
    ///
    /// Panics if field contains the `=` character.
    pub fn set<S>(&mut self, field: &str, value: S)
    where
        S: std::fmt::Display,
    {
        self.entry(field).set_value(value);
    }

    /// Replaces any values of the given field with the given values
    ///
    /// Fields are matched case-insensitively
    ///
    /// # Panics
    ///
    /// Panics if field contains the `=` character
    ///
    /// # Example
    ///
    /// ```
    /// use flac_meta::metadata::{VorbisComment, fields::ARTIST};
    ///
    /// let mut comment = VorbisComment::default();
    /// comment.add(ARTIST, "Artist 1");
    ///
    /// comment.replace(ARTIST, ["Artist 2", "Artist 3"]);
    /// assert_eq!(comment.get(ARTIST).unwrap().as_slice(), ["Artist 2", "Artist 3"]);
    ///
    /// // reminder that Option also implements IntoIterator
    /// comment.replace(ARTIST, Some("Artist 4"));
    /// assert_eq!(comment.get(ARTIST).unwrap().as_slice(), ["Artist 4"]);
    /// ```
    pub fn replace<S: std::fmt::Display>(
        &mut self,
        field: &str,
        replacements: impl IntoIterator<Item = S>,
    ) {
        let values = self.entry(field);
        values.0.clear();
        replacements
            .into_iter()
            .for_each(|value| values.push(value));
    }

    /// Removes the given field and all its values
    ///
    /// # Panics
    ///
    /// Panics if field contains the `=` character.
    pub fn remove(&mut self, field: &str) -> Option<VorbisCommentValues> {
        self.position(field).map(|i| self.fields.remove(i).1)
    }

    /// Removes matching values from the given field
    ///
    /// Both field and value are matched case-insensitively.
    /// Returns the number of values removed.
    ///
    /// # Panics
    ///
    /// Panics if field contains the `=` character.
    ///
    /// # Example
    ///
    /// ```
    /// use flac_meta::metadata::{VorbisComment, fields::GENRE};
    ///
    /// let mut comment = VorbisComment::default();
    /// comment.replace(GENRE, ["Rock", "Jazz", "ROCK"]);
    ///
    /// assert_eq!(comment.remove_value(GENRE, "rock"), 2);
    /// assert_eq!(comment.get(GENRE).unwrap().as_slice(), ["Jazz"]);
    /// ```
    pub fn remove_value(&mut self, field: &str, value: &str) -> usize {
        self.get_mut(field)
            .map(|values| {
                let len = values.len();
                values.0.retain(|v| !v.eq_ignore_ascii_case(value));
                len - values.len()
            })
            .unwrap_or(0)
    }

    /// Whether the given field is present, even if empty
    ///
    /// # Panics
    ///
    /// Panics if field contains the `=` character.
    pub fn contains(&self, field: &str) -> bool {
        self.position(field).is_some()
    }

    /// Iterates over field names and their values, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VorbisCommentValues)> {
        self.fields
            .iter()
            .map(|(key, values)| (key.as_str(), values))
    }

    /// Number of fields, including empty ones
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total number of values across all fields
    pub fn value_count(&self) -> usize {
        self.fields.iter().map(|(_, values)| values.len()).sum()
    }

    field_accessor!(artist, ARTIST);
    field_accessor!(title, TITLE);
    field_accessor!(album, ALBUM);
    field_accessor!(date, DATE);
    field_accessor!(track_number, TRACK_NUMBER);
    field_accessor!(genre, GENRE);
    field_accessor!(cuesheet, CUESHEET);

    fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    fn bytes(&self) -> Result<BlockSize, Error> {
        self.entries()
            .try_fold(4 + self.vendor_string.len() + 4, |total, (key, value)| {
                total.checked_add(4 + key.len() + 1 + value.len())
            })
            .ok_or(Error::ExcessiveBlockSize)
            .and_then(BlockSize::try_from)
    }
}

metadata_block!(VorbisComment, VorbisComment);

// lengths are the one little-endian field in the container
fn read_le_u32<R: BitRead + ?Sized>(r: &mut R) -> Result<u32, Error> {
    let mut raw: [u8; 4] = r.read_to()?;
    bits::reverse_bytes(&mut raw, 0, 4);
    Ok(bits::read_bits_at(&raw, 0, 32)? as u32)
}

fn write_le_u32<W: BitWrite + ?Sized>(w: &mut W, value: u32) -> Result<(), Error> {
    let mut raw = bits::pack(value.into(), 4)?;
    bits::reverse_bytes(&mut raw, 0, 4);
    w.write_bytes(&raw)?;
    Ok(())
}

impl FromBitStream for VorbisComment {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        fn read_string<R: BitRead + ?Sized>(r: &mut R) -> Result<String, Error> {
            let size = read_le_u32(r)?
                .try_into()
                .map_err(|_| Error::ExcessiveStringLength)?;
            Ok(String::from_utf8(r.read_to_vec(size)?)?)
        }

        let mut comment = Self {
            vendor_string: read_string(r)?,
            fields: vec![],
        };

        for _ in 0..read_le_u32(r)? {
            let entry = read_string(r)?;
            let (key, value) = entry
                .split_once('=')
                .ok_or(InvalidFormat::VorbisCommentEntry)?;
            comment.add(key, value);
        }

        Ok(comment)
    }
}

impl ToBitStream for VorbisComment {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        fn string_len(len: usize) -> Result<u32, Error> {
            len.try_into().map_err(|_| Error::ExcessiveStringLength)
        }

        write_le_u32(w, string_len(self.vendor_string.len())?)?;
        w.write_bytes(self.vendor_string.as_bytes())?;
        write_le_u32(
            w,
            self.value_count()
                .try_into()
                .map_err(|_| Error::ExcessiveBlockSize)?,
        )?;

        self.entries().try_for_each(|(key, value)| {
            write_le_u32(w, string_len(key.len() + 1 + value.len())?)?;
            w.write_bytes(key.as_bytes())?;
            w.write_bytes(b"=")?;
            w.write_bytes(value.as_bytes())?;
            Ok(())
        })
    }
}

/// The values of a single Vorbis comment field, in order
///
/// The first value is considered the primary one.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct VorbisCommentValues(Vec<String>);

impl VorbisCommentValues {
    /// The primary value, or an empty string if there are no values
    pub fn value(&self) -> &str {
        self.0.first().map(|s| s.as_str()).unwrap_or_default()
    }

    /// Replaces all values with a single value
    pub fn set_value<S: std::fmt::Display>(&mut self, value: S) {
        self.0.clear();
        self.push(value);
    }

    /// Appends a value
    pub fn push<S: std::fmt::Display>(&mut self, value: S) {
        self.0.push(value.to_string());
    }

    /// Removes all values
    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// Values as a slice
    pub fn as_slice(&self) -> &[String] {
        self.0.as_slice()
    }
}

impl std::ops::Deref for VorbisCommentValues {
    type Target = [String];

    fn deref(&self) -> &[String] {
        self.0.as_slice()
    }
}

impl From<Vec<String>> for VorbisCommentValues {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<VorbisCommentValues> for Vec<String> {
    fn from(VorbisCommentValues(values): VorbisCommentValues) -> Self {
        values
    }
}

impl<'v> IntoIterator for &'v VorbisCommentValues {
    type Item = &'v String;
    type IntoIter = std::slice::Iter<'v, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for VorbisCommentValues {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.value().fmt(f)
    }
}

/// Vorbis comment metadata tag fields
///
/// Not all of these fields are officially defined by Vorbis,
/// but they are in common use.
pub mod fields {
    /// Name of current work
    pub const TITLE: &str = "TITLE";

    /// Name of the artist generally responsible for the current work
    pub const ARTIST: &str = "ARTIST";

    /// Name of the collection the current work belongs to
    pub const ALBUM: &str = "ALBUM";

    /// Date the current work was recorded
    pub const DATE: &str = "DATE";

    /// The current work's track number within its collection
    pub const TRACK_NUMBER: &str = "TRACKNUMBER";

    /// The current work's musical genre
    pub const GENRE: &str = "GENRE";

    /// An embedded textual cue sheet
    pub const CUESHEET: &str = "CUESHEET";

    /// A free-form comment
    pub const COMMENT: &str = "COMMENT";
}

/// A PICTURE metadata block
///
/// Picture blocks are for embedding artwork
/// such as album covers, liner notes, etc.
///
/// This block may occur multiple times in a FLAC file.
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 32   | `picture_type` | picture type
/// | 32   | media type len | media type length, in bytes
/// | `len`×8 | `mime_type` | picture's MIME type, printable ASCII
/// | 32   | description len | description length, in bytes
/// | `len`×8 | `description` | description of picture, in UTF-8
/// | 32   | `width` | width of picture, in pixels
/// | 32   | `height`| height of picture, in pixels
/// | 32   | `color_depth` | color depth of picture in bits-per-pixel
/// | 32   | `colors` | for indexed-color pictures, number of colors used
/// | 32   | data len | length of picture data, in bytes
/// | `len`×8 | `data` | raw picture data
///
/// A MIME type of `-->` indicates the data is a URL
/// to the picture rather than the picture itself.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Picture {
    /// The picture type
    pub picture_type: PictureType,
    /// The MIME type string
    pub mime_type: String,
    /// The description of the picture
    pub description: String,
    /// The width of the picture in pixels
    pub width: u32,
    /// The height of the picture in pixels
    pub height: u32,
    /// The color depth of the picture in bits per pixel
    pub color_depth: u32,
    /// For indexed-color pictures, the number of colors used
    pub colors: u32,
    /// The binary picture data
    pub data: Vec<u8>,
}

impl Picture {
    /// The MIME type indicating picture data is a URL
    pub const URL_MIME_TYPE: &str = "-->";

    /// Builds picture from raw image data and its MIME type
    ///
    /// Image dimensions are left at 0 for the caller to fill in.
    pub fn new<M, S, V>(picture_type: PictureType, mime_type: M, description: S, data: V) -> Self
    where
        M: Into<String>,
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        Self {
            picture_type,
            mime_type: mime_type.into(),
            description: description.into(),
            width: 0,
            height: 0,
            color_depth: 0,
            colors: 0,
            data: data.into(),
        }
    }

    /// Builds picture which refers to an image by URL
    ///
    /// ```
    /// use flac_meta::metadata::{Picture, PictureType};
    ///
    /// let picture = Picture::from_url(
    ///     PictureType::FrontCover,
    ///     "cover",
    ///     "https://example.com/cover.png",
    /// );
    /// assert_eq!(picture.url().as_deref(), Some("https://example.com/cover.png"));
    /// ```
    pub fn from_url<S: Into<String>>(picture_type: PictureType, description: S, url: &str) -> Self {
        Self::new(
            picture_type,
            Self::URL_MIME_TYPE,
            description,
            url.as_bytes(),
        )
    }

    /// The picture's URL, if the picture is a reference
    ///
    /// Any invalid UTF-8 in the URL is replaced.
    pub fn url(&self) -> Option<std::borrow::Cow<'_, str>> {
        (self.mime_type == Self::URL_MIME_TYPE).then(|| String::from_utf8_lossy(&self.data))
    }

    // printable ASCII only, with anything else replaced by a space
    fn mime_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.mime_type.chars().map(|c| match c {
            ' '..='~' => c as u8,
            _ => b' ',
        })
    }

    fn bytes(&self) -> Result<BlockSize, Error> {
        [
            self.mime_type.chars().count(),
            self.description.len(),
            self.data.len(),
        ]
        .into_iter()
        .try_fold(32usize, |total, len| total.checked_add(len))
        .ok_or(Error::ExcessiveBlockSize)
        .and_then(BlockSize::try_from)
    }
}

metadata_block!(Picture, Picture);

metadata_block!(Cuesheet, Cuesheet);

impl FromBitStream for Picture {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Error> {
        fn prefixed_field<R: BitRead + ?Sized>(r: &mut R) -> Result<Vec<u8>, Error> {
            let size = r.read_to::<u32>()?;
            Ok(r.read_to_vec(size.try_into().map_err(|_| Error::ExcessiveBlockSize)?)?)
        }

        Ok(Self {
            picture_type: PictureType::try_from(r.read_to::<u32>()?)?,
            mime_type: prefixed_field(r)?
                .into_iter()
                .map(|b| match b.is_ascii() {
                    true => char::from(b),
                    false => '?',
                })
                .collect(),
            description: String::from_utf8(prefixed_field(r)?)?,
            width: r.read_to()?,
            height: r.read_to()?,
            color_depth: r.read_to()?,
            colors: r.read_to()?,
            data: prefixed_field(r)?,
        })
    }
}

impl ToBitStream for Picture {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Error> {
        fn field_len(len: usize) -> Result<u32, Error> {
            len.try_into().map_err(|_| Error::ExcessiveStringLength)
        }

        w.write_from(u32::from(self.picture_type))?;
        let mime_type = self.mime_bytes().collect::<Vec<u8>>();
        w.write_from(field_len(mime_type.len())?)?;
        w.write_bytes(&mime_type)?;
        w.write_from(field_len(self.description.len())?)?;
        w.write_bytes(self.description.as_bytes())?;
        w.write_from(self.width)?;
        w.write_from(self.height)?;
        w.write_from(self.color_depth)?;
        w.write_from(self.colors)?;
        w.write_from(field_len(self.data.len())?)?;
        w.write_bytes(&self.data)?;
        Ok(())
    }
}

/// Defined variants of PICTURE type
///
/// These match the picture types of ID3v2's APIC frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PictureType {
    /// Other
    Other = 0,
    /// PNG file icon of 32x32 pixels
    Png32x32 = 1,
    /// General file icon
    GeneralFileIcon = 2,
    /// Front cover
    FrontCover = 3,
    /// Back cover
    BackCover = 4,
    /// Liner notes page
    LinerNotes = 5,
    /// Media label (e.g., CD, Vinyl or Cassette label)
    MediaLabel = 6,
    /// Lead artist, lead performer, or soloist
    LeadArtist = 7,
    /// Artist or performer
    Artist = 8,
    /// Conductor
    Conductor = 9,
    /// Band or orchestra
    Band = 10,
    /// Composer
    Composer = 11,
    /// Lyricist or text writer
    Lyricist = 12,
    /// Recording location
    RecordingLocation = 13,
    /// During recording
    DuringRecording = 14,
    /// During performance
    DuringPerformance = 15,
    /// Movie or video screen capture
    ScreenCapture = 16,
    /// A bright colored fish
    Fish = 17,
    /// Illustration
    Illustration = 18,
    /// Band or artist logotype
    BandLogo = 19,
    /// Publisher or studio logotype
    PublisherLogo = 20,
}

impl std::fmt::Display for PictureType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Other => "Other".fmt(f),
            Self::Png32x32 => "32×32 PNG Icon".fmt(f),
            Self::GeneralFileIcon => "General File Icon".fmt(f),
            Self::FrontCover => "Cover (front)".fmt(f),
            Self::BackCover => "Cover (back)".fmt(f),
            Self::LinerNotes => "Liner Notes".fmt(f),
            Self::MediaLabel => "Media Label".fmt(f),
            Self::LeadArtist => "Lead Artist".fmt(f),
            Self::Artist => "Artist".fmt(f),
            Self::Conductor => "Conductor".fmt(f),
            Self::Band => "Band or Orchestra".fmt(f),
            Self::Composer => "Composer".fmt(f),
            Self::Lyricist => "Lyricist or Text Writer".fmt(f),
            Self::RecordingLocation => "Recording Location".fmt(f),
            Self::DuringRecording => "During Recording".fmt(f),
            Self::DuringPerformance => "During Performance".fmt(f),
            Self::ScreenCapture => "Movie or Video Screen Capture".fmt(f),
            Self::Fish => "A Bright Colored Fish".fmt(f),
            Self::Illustration => "Illustration".fmt(f),
            Self::BandLogo => "Band or Artist Logotype".fmt(f),
            Self::PublisherLogo => "Publisher or Studio Logotype".fmt(f),
        }
    }
}

impl TryFrom<u32> for PictureType {
    type Error = InvalidFormat;

    fn try_from(t: u32) -> Result<Self, InvalidFormat> {
        match t {
            0 => Ok(Self::Other),
            1 => Ok(Self::Png32x32),
            2 => Ok(Self::GeneralFileIcon),
            3 => Ok(Self::FrontCover),
            4 => Ok(Self::BackCover),
            5 => Ok(Self::LinerNotes),
            6 => Ok(Self::MediaLabel),
            7 => Ok(Self::LeadArtist),
            8 => Ok(Self::Artist),
            9 => Ok(Self::Conductor),
            10 => Ok(Self::Band),
            11 => Ok(Self::Composer),
            12 => Ok(Self::Lyricist),
            13 => Ok(Self::RecordingLocation),
            14 => Ok(Self::DuringRecording),
            15 => Ok(Self::DuringPerformance),
            16 => Ok(Self::ScreenCapture),
            17 => Ok(Self::Fish),
            18 => Ok(Self::Illustration),
            19 => Ok(Self::BandLogo),
            20 => Ok(Self::PublisherLogo),
            t => Err(InvalidFormat::PictureType(t)),
        }
    }
}

impl From<PictureType> for u32 {
    fn from(t: PictureType) -> u32 {
        t as u32
    }
}

/// A block of a reserved or invalid type
///
/// Its contents are skipped over when read and,
/// having no known layout, it is dropped
/// whenever blocks are written.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Unknown {
    /// The block's type
    pub block_type: BlockType,
    /// The block's size, in bytes, as read
    pub size: BlockSize,
}

block!(Unknown, Unknown);
