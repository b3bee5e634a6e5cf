// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For editing the metadata of a whole FLAC file
//!
//! A [`FlacFile`] reads all of a file's metadata blocks up front
//! and remembers where its audio frames begin.
//! Saving writes the current blocks to a temporary file
//! alongside the original, copies the original's audio frames
//! after them, and then moves the temporary file into place.

use crate::metadata::{
    Application, Block, Cuesheet, MetadataBlock, Padding, Picture, SeekTable, Streaminfo,
    VorbisComment, read_blocks, write_blocks,
};
use crate::{Counter, Error};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// A FLAC file's metadata blocks, along with the stream they came from
///
/// # Example
///
/// ```
/// use flac_meta::{FlacFile, metadata::{write_blocks, Block, Padding, Streaminfo}};
/// use std::io::Cursor;
///
/// let mut flac = vec![];
/// write_blocks(
///     &mut flac,
///     &[
///         Block::from(Streaminfo {
///             minimum_block_size: 4096,
///             maximum_block_size: 4096,
///             minimum_frame_size: 0,
///             maximum_frame_size: 0,
///             sample_rate: 44100,
///             channels: 1,
///             bits_per_sample: 16,
///             total_samples: 0,
///             md5: [0; 16],
///         }),
///         Block::from(Padding::new(64).unwrap()),
///     ],
/// ).unwrap();
///
/// let file = FlacFile::read(Cursor::new(flac)).unwrap();
/// assert_eq!(file.streaminfo().unwrap().sample_rate, 44100);
/// assert_eq!(file.padding().unwrap().empty_bit_count(), 64);
/// assert_eq!(file.frames_offset(), 4 + (4 + 34) + (4 + 8));
/// ```
#[derive(Debug)]
pub struct FlacFile<R = BufReader<File>> {
    reader: Option<R>,
    path: Option<PathBuf>,
    metadata: Vec<Block>,
    frames_offset: u64,
}

impl FlacFile<BufReader<File>> {
    /// Opens FLAC file from the given path
    ///
    /// Files opened this way may be saved back to disk.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from opening the file,
    /// or any error from reading its metadata blocks.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!(message = "Opening FLAC file", path = ?path);

        let mut file = Self::read(BufReader::new(File::open(path)?))?;
        file.path = Some(path.to_owned());
        Ok(file)
    }
}

impl<R: Read> FlacFile<R> {
    /// Reads FLAC metadata blocks from the given stream
    ///
    /// The stream should be positioned at the start of the FLAC file.
    /// Files read this way have no path and cannot be saved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if the stream is not
    /// a valid FLAC file, [`Error::MissingStreaminfo`] if
    /// it contains no STREAMINFO block, or any I/O error.
    pub fn read(mut reader: R) -> Result<Self, Error> {
        let mut counter = Counter::new(reader.by_ref());
        let metadata = read_blocks(&mut counter).collect::<Result<Vec<Block>, Error>>()?;
        let frames_offset = counter.count;

        if !metadata.iter().any(|block| matches!(block, Block::Streaminfo(_))) {
            return Err(Error::MissingStreaminfo);
        }

        debug!(
            message = "Read metadata",
            blocks = metadata.len(),
            frames_offset
        );

        Ok(Self {
            reader: Some(reader),
            path: None,
            metadata,
            frames_offset,
        })
    }
}

impl<R> FlacFile<R> {
    /// All metadata blocks, in file order
    pub fn metadata(&self) -> &[Block] {
        &self.metadata
    }

    /// All metadata blocks, in file order, for editing
    ///
    /// Blocks may be added, removed or reordered before saving.
    pub fn metadata_mut(&mut self) -> &mut Vec<Block> {
        &mut self.metadata
    }

    /// Offset of the first audio frame, in bytes,
    /// from the start of the original stream
    pub fn frames_offset(&self) -> u64 {
        self.frames_offset
    }

    /// Returns the final block of the given type, if any
    ///
    /// # Example
    ///
    /// ```no_run
    /// use flac_meta::{FlacFile, metadata::Streaminfo};
    ///
    /// let file = FlacFile::open("track.flac").unwrap();
    /// let streaminfo = file.get::<Streaminfo>().unwrap();
    /// println!("{} Hz", streaminfo.sample_rate);
    /// ```
    pub fn get<B: MetadataBlock>(&self) -> Option<&B> {
        self.metadata.iter().rev().find_map(B::from_block)
    }

    /// Returns the final block of the given type, if any, for editing
    pub fn get_mut<B: MetadataBlock>(&mut self) -> Option<&mut B> {
        self.metadata.iter_mut().rev().find_map(B::from_block_mut)
    }

    /// Iterates over all blocks of the given type, in file order
    pub fn get_all<'a, B: MetadataBlock + 'a>(&'a self) -> impl Iterator<Item = &'a B> {
        self.metadata.iter().filter_map(B::from_block)
    }

    /// The file's STREAMINFO block
    pub fn streaminfo(&self) -> Option<&Streaminfo> {
        self.get()
    }

    /// The file's STREAMINFO block, for editing
    pub fn streaminfo_mut(&mut self) -> Option<&mut Streaminfo> {
        self.get_mut()
    }

    /// The file's VORBIS_COMMENT block
    pub fn vorbis_comment(&self) -> Option<&VorbisComment> {
        self.get()
    }

    /// The file's VORBIS_COMMENT block, for editing
    pub fn vorbis_comment_mut(&mut self) -> Option<&mut VorbisComment> {
        self.get_mut()
    }

    /// The file's CUESHEET block
    pub fn cuesheet(&self) -> Option<&Cuesheet> {
        self.get()
    }

    /// The file's CUESHEET block, for editing
    pub fn cuesheet_mut(&mut self) -> Option<&mut Cuesheet> {
        self.get_mut()
    }

    /// The file's SEEKTABLE block
    pub fn seek_table(&self) -> Option<&SeekTable> {
        self.get()
    }

    /// The file's SEEKTABLE block, for editing
    pub fn seek_table_mut(&mut self) -> Option<&mut SeekTable> {
        self.get_mut()
    }

    /// The file's PADDING block
    pub fn padding(&self) -> Option<&Padding> {
        self.get()
    }

    /// The file's PADDING block, for editing
    pub fn padding_mut(&mut self) -> Option<&mut Padding> {
        self.get_mut()
    }

    /// The file's APPLICATION block
    pub fn application(&self) -> Option<&Application> {
        self.get()
    }

    /// The file's APPLICATION block, for editing
    pub fn application_mut(&mut self) -> Option<&mut Application> {
        self.get_mut()
    }

    /// All of the file's PICTURE blocks, in file order
    pub fn pictures(&self) -> Vec<&Picture> {
        self.get_all().collect()
    }

    /// Whether the underlying stream has been closed
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Closes the underlying stream
    ///
    /// Metadata remains available, but the file
    /// can no longer be saved.
    /// Closing an already-closed file does nothing.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            trace!(message = "Closed FLAC file", path = ?self.path);
        }
    }
}

impl<R: Read + Seek> FlacFile<R> {
    /// Rewrites the file on disk with the current metadata blocks
    ///
    /// The original's audio frames are copied verbatim
    /// after the new blocks.  Blocks of unknown type are dropped.
    ///
    /// The underlying stream is closed by saving,
    /// whether it succeeds or not, so the file
    /// must be re-opened to see its new contents
    /// or to save again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SaveNotSupported`] if the file
    /// was not opened from a path or has been closed.
    /// Returns any error from writing a block,
    /// or any I/O error.  On failure the original file
    /// is left in place and the temporary file is removed.
    pub fn save(&mut self) -> Result<(), Error> {
        let path = self.path.clone().ok_or(Error::SaveNotSupported)?;
        let mut reader = self.reader.take().ok_or(Error::SaveNotSupported)?;
        let temp = temp_path(&path);

        debug!(message = "Saving FLAC file", path = ?path, temp = ?temp);

        let result = self.write_to(&mut reader, &temp);
        drop(reader);

        // rename replaces the original in one step
        match result.and_then(|()| std::fs::rename(&temp, &path).map_err(Error::Io)) {
            Ok(()) => {
                debug!(message = "Saved FLAC file", path = ?path);
                Ok(())
            }
            Err(err) => {
                warn!(message = "Unable to save FLAC file", path = ?path, error = %err);
                if let Err(cleanup) = std::fs::remove_file(&temp) {
                    trace!(message = "Unable to remove temporary file", temp = ?temp, error = %cleanup);
                }
                Err(err)
            }
        }
    }

    fn write_to(&self, reader: &mut R, temp: &Path) -> Result<(), Error> {
        let mut w = BufWriter::new(File::create(temp)?);
        write_blocks(&mut w, &self.metadata)?;

        reader.seek(SeekFrom::Start(self.frames_offset))?;
        let copied = std::io::copy(reader, &mut w)?;
        trace!(message = "Copied audio frames", bytes = copied);

        w.flush()?;
        Ok(())
    }
}

// a hidden sibling of the original, so the final rename
// stays on the same filesystem
fn temp_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
