mod common;

use common::{TempFlac, flac, frames, raw_header, streaminfo};
use flac_meta::metadata::{Block, BlockType, Cuesheet, CuesheetTrack, Padding, VorbisComment};
use flac_meta::{Error, FlacFile, InvalidFormat};
use std::io::Cursor;

#[test]
fn test_bad_tag() {
    let mut data = flac(&[streaminfo().into()], &frames(100));
    data[0..4].copy_from_slice(b"RIFF");

    let err = FlacFile::read(Cursor::new(data)).unwrap_err();
    assert!(err.is_malformed());
    assert!(matches!(
        err,
        Error::InvalidFormat(InvalidFormat::MissingFlacTag)
    ));

    // a stream too short for the tag is no better
    assert!(matches!(
        FlacFile::read(Cursor::new(b"fL".to_vec())),
        Err(Error::InvalidFormat(InvalidFormat::MissingFlacTag))
    ));
}

#[test]
fn test_missing_streaminfo() {
    let data = flac(&[Padding::new(128).unwrap().into()], &frames(100));

    assert!(matches!(
        FlacFile::read(Cursor::new(data)),
        Err(Error::MissingStreaminfo)
    ));
}

#[test]
fn test_truncated_block() {
    let mut data = flac(&[streaminfo().into()], &[]);
    data.truncate(20);

    assert!(matches!(
        FlacFile::read(Cursor::new(data)),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_frames_offset() {
    let blocks: [Block; 3] = [
        streaminfo().into(),
        VorbisComment::default().into(),
        Padding::new(1024 * 8).unwrap().into(),
    ];
    let frames = frames(4000);
    let data = flac(&blocks, &frames);

    let file = FlacFile::read(Cursor::new(data.as_slice())).unwrap();
    assert_eq!(file.metadata(), &blocks);
    assert_eq!(file.frames_offset() as usize, data.len() - frames.len());
}

#[test]
fn test_unmodified_roundtrip() {
    let mut comment = VorbisComment::default();
    comment.add("TITLE", "Track Title");
    comment.add("ARTIST", "Artist Name");

    let original = flac(
        &[
            streaminfo().into(),
            comment.into(),
            Padding::new(512 * 8).unwrap().into(),
        ],
        &frames(10_000),
    );
    let temp = TempFlac::new(&original);

    let mut file = FlacFile::open(temp.path()).unwrap();
    file.save().unwrap();
    assert_eq!(temp.contents(), original);

    let file = FlacFile::open(temp.path()).unwrap();
    let info = file.streaminfo().unwrap();
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.channels, 1);
    assert_eq!(info.bits_per_sample, 16);
    assert_eq!(info.minimum_block_size, 4096);
    assert_eq!(info.maximum_block_size, 4096);
    assert_eq!(info.duration(), Some(3));
}

#[test]
fn test_frames_preserved() {
    let frames = frames(50_000);
    let temp = TempFlac::new(&flac(
        &[streaminfo().into(), VorbisComment::default().into()],
        &frames,
    ));

    let mut file = FlacFile::open(temp.path()).unwrap();
    file.vorbis_comment_mut()
        .unwrap()
        .add("COMMENT", "x".repeat(5000));
    file.metadata_mut()
        .push(Padding::new(4096 * 8).unwrap().into());
    file.save().unwrap();

    let saved = temp.contents();
    assert!(saved.ends_with(&frames));

    let file = FlacFile::open(temp.path()).unwrap();
    assert_eq!(file.frames_offset() as usize, saved.len() - frames.len());
    assert_eq!(file.metadata().len(), 3);
    assert_eq!(
        file.vorbis_comment().unwrap().get("comment").unwrap().value(),
        "x".repeat(5000)
    );
}

#[test]
fn test_last_flag() {
    let temp = TempFlac::new(&flac(
        &[
            streaminfo().into(),
            Padding::new(64).unwrap().into(),
            VorbisComment::default().into(),
        ],
        &frames(100),
    ));

    // dropping the final block moves the last flag
    let mut file = FlacFile::open(temp.path()).unwrap();
    file.metadata_mut().pop();
    file.save().unwrap();

    let saved = temp.contents();
    assert_eq!(saved[4] & 0x80, 0);
    assert_eq!(saved[4 + 4 + 34] & 0x80, 0x80);

    let file = FlacFile::open(temp.path()).unwrap();
    assert_eq!(file.metadata().len(), 2);
    assert!(file.vorbis_comment().is_none());
}

#[test]
fn test_unknown_block() {
    let frames = frames(1000);

    let mut data = b"fLaC".to_vec();
    raw_header(&mut data, false, 0, 34);
    flac(&[streaminfo().into()], &[])[8..]
        .iter()
        .for_each(|b| data.push(*b));
    raw_header(&mut data, false, 9, 3);
    data.extend_from_slice(&[1, 2, 3]);
    raw_header(&mut data, true, 1, 8);
    data.extend_from_slice(&[0; 8]);
    data.extend_from_slice(&frames);

    let temp = TempFlac::new(&data);

    let mut file = FlacFile::open(temp.path()).unwrap();
    assert_eq!(
        file.metadata()
            .iter()
            .map(|b| b.block_type())
            .collect::<Vec<_>>(),
        vec![
            BlockType::Streaminfo,
            BlockType::Reserved(9),
            BlockType::Padding
        ],
    );
    assert!(!file.metadata()[1].is_writable());
    assert_eq!(file.padding().unwrap().empty_bit_count(), 64);

    // unknown blocks are quietly dropped on save
    file.save().unwrap();

    let file = FlacFile::open(temp.path()).unwrap();
    assert_eq!(
        file.metadata()
            .iter()
            .map(|b| b.block_type())
            .collect::<Vec<_>>(),
        vec![BlockType::Streaminfo, BlockType::Padding],
    );
    assert!(temp.contents().ends_with(&frames));
}

#[test]
fn test_save_unsupported() {
    let data = flac(&[streaminfo().into()], &frames(100));

    // streams have no path to save to
    let mut file = FlacFile::read(Cursor::new(data.clone())).unwrap();
    assert!(matches!(file.save(), Err(Error::SaveNotSupported)));

    // nor can a closed file be saved
    let temp = TempFlac::new(&data);
    let mut file = FlacFile::open(temp.path()).unwrap();
    file.close();
    file.close();
    assert!(file.is_closed());
    assert!(file.streaminfo().is_some());
    assert!(matches!(file.save(), Err(Error::SaveNotSupported)));

    // saving closes the file, successful or not
    let mut file = FlacFile::open(temp.path()).unwrap();
    file.save().unwrap();
    assert!(file.is_closed());
    assert!(matches!(file.save(), Err(Error::SaveNotSupported)));
}

#[test]
fn test_failed_save() {
    let original = flac(&[streaminfo().into()], &frames(1000));
    let temp = TempFlac::new(&original);

    let mut file = FlacFile::open(temp.path()).unwrap();
    let mut cuesheet = Cuesheet::new(true);
    cuesheet.tracks.push(CuesheetTrack::new(0, 1)).unwrap();
    file.metadata_mut().push(cuesheet.into());

    assert!(matches!(
        file.save(),
        Err(Error::InvalidFormat(InvalidFormat::MissingLeadOut(1)))
    ));
    assert!(file.is_closed());

    // original file is untouched
    assert_eq!(temp.contents(), original);
}

// the hidden sibling a save writes through
fn temp_sibling(path: &std::path::Path) -> std::path::PathBuf {
    path.with_file_name(format!(
        ".{}.{}.tmp",
        path.file_name().unwrap().to_str().unwrap(),
        std::process::id()
    ))
}

#[test]
fn test_save_leaves_no_temp_file() {
    let temp = TempFlac::new(&flac(&[streaminfo().into()], &frames(1000)));

    let mut file = FlacFile::open(temp.path()).unwrap();
    file.save().unwrap();
    assert!(!temp_sibling(temp.path()).exists());
}

#[cfg(unix)]
#[test]
fn test_failed_replace() {
    let temp = TempFlac::new(&flac(&[streaminfo().into()], &frames(1000)));
    let mut file = FlacFile::open(temp.path()).unwrap();

    // swap the original for a directory the new file can't replace,
    // while the open handle still reads the old contents
    std::fs::remove_file(temp.path()).unwrap();
    std::fs::create_dir(temp.path()).unwrap();
    std::fs::write(temp.path().join("contents"), b"").unwrap();

    let result = file.save();
    let sibling_exists = temp_sibling(temp.path()).exists();
    std::fs::remove_dir_all(temp.path()).unwrap();

    assert!(matches!(result, Err(Error::Io(_))));
    assert!(file.is_closed());
    assert!(!sibling_exists);
}
