#![allow(dead_code)]

use flac_meta::metadata::{Block, Streaminfo, write_blocks};
use std::path::{Path, PathBuf};

/// STREAMINFO of a 3 second, 44.1kHz, mono, 16-bit stream
pub fn streaminfo() -> Streaminfo {
    Streaminfo {
        minimum_block_size: 4096,
        maximum_block_size: 4096,
        minimum_frame_size: 14,
        maximum_frame_size: 8210,
        sample_rate: 44100,
        channels: 1,
        bits_per_sample: 16,
        total_samples: 44100 * 3,
        md5: std::array::from_fn(|_| fastrand::u8(..)),
    }
}

/// Random bytes standing in for audio frames
pub fn frames(len: usize) -> Vec<u8> {
    std::iter::repeat_with(|| fastrand::u8(..)).take(len).collect()
}

/// A whole FLAC file, from its blocks and frames
pub fn flac(blocks: &[Block], frames: &[u8]) -> Vec<u8> {
    let mut flac = vec![];
    write_blocks(&mut flac, blocks).unwrap();
    flac.extend_from_slice(frames);
    flac
}

/// Appends a raw block header to some output
pub fn raw_header(output: &mut Vec<u8>, last: bool, block_type: u8, size: u32) {
    output.push(((last as u8) << 7) | block_type);
    output.extend_from_slice(&size.to_be_bytes()[1..]);
}

/// A file in the temporary directory which is removed when dropped
pub struct TempFlac {
    path: PathBuf,
}

impl TempFlac {
    pub fn new(data: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!("flac-meta-{:016x}.flac", fastrand::u64(..)));
        std::fs::write(&path, data).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> Vec<u8> {
        std::fs::read(&self.path).unwrap()
    }
}

impl Drop for TempFlac {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
