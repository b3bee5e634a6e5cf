mod common;

use common::{TempFlac, flac, frames, raw_header, streaminfo};
use flac_meta::metadata::{
    Application, Block, BlockHeader, BlockType, MetadataBlock, Padding, SeekPoint, SeekTable,
    Streaminfo, VorbisComment, fields::ARTIST, read_blocks, write_blocks,
};
use flac_meta::{Error, FlacFile, InvalidFormat};
use std::io::Cursor;

// reads the blocks following a STREAMINFO
fn read_raw(block_type: u8, payload: &[u8]) -> Result<Vec<Block>, Error> {
    let mut data = flac(&[streaminfo().into()], &[]);
    data[4] = 0; // STREAMINFO no longer last
    raw_header(&mut data, true, block_type, payload.len() as u32);
    data.extend_from_slice(payload);
    read_blocks(data.as_slice()).collect()
}

fn vorbis_payload(vendor: &str, entries: &[&str]) -> Vec<u8> {
    let mut payload = vec![];
    payload.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    payload.extend_from_slice(vendor.as_bytes());
    payload.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for entry in entries {
        payload.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        payload.extend_from_slice(entry.as_bytes());
    }
    payload
}

#[test]
fn test_edit_field() {
    let mut comment = VorbisComment::default();
    comment.add(ARTIST, "Old Artist");
    let temp = TempFlac::new(&flac(&[streaminfo().into(), comment.into()], &frames(100)));

    let mut file = FlacFile::open(temp.path()).unwrap();
    file.vorbis_comment_mut()
        .unwrap()
        .entry("ARTIST")
        .set_value("New Artist");
    file.save().unwrap();

    let mut file = FlacFile::open(temp.path()).unwrap();
    let comment = file.vorbis_comment_mut().unwrap();
    assert_eq!(comment.entry("artist").value(), "New Artist");
    assert_eq!(comment.artist().value(), "New Artist");
    assert_eq!(comment.artist().len(), 1);
}

#[test]
fn test_multiple_values() {
    let temp = TempFlac::new(&flac(&[streaminfo().into()], &frames(100)));

    let mut file = FlacFile::open(temp.path()).unwrap();
    let mut comment = VorbisComment::default();
    comment.add(ARTIST, "Artist A");
    comment.add(ARTIST, "Artist B");
    file.metadata_mut().push(comment.into());
    file.save().unwrap();

    let file = FlacFile::open(temp.path()).unwrap();
    let comment = file.vorbis_comment().unwrap();
    assert_eq!(comment.get(ARTIST).unwrap().as_slice(), ["Artist A", "Artist B"]);
    assert_eq!(comment.get(ARTIST).unwrap().value(), "Artist A");
    assert_eq!(comment.value_count(), 2);
}

#[test]
fn test_auto_vivify() {
    let mut comment = VorbisComment::default();
    assert!(comment.get("ALBUM").is_none());
    assert!(!comment.contains("ALBUM"));

    // a miss through the mutable accessors leaves an empty field behind
    assert!(comment.album().is_empty());
    assert_eq!(comment.album().value(), "");
    assert!(comment.contains("album"));
    assert!(comment.get("ALBUM").unwrap().is_empty());

    // but empty fields aren't written
    let mut data = vec![];
    write_blocks(&mut data, &[Block::from(comment)]).unwrap();
    match read_blocks(data.as_slice()).next() {
        Some(Ok(Block::VorbisComment(comment))) => assert!(!comment.contains("ALBUM")),
        _ => panic!("VORBIS_COMMENT block not read"),
    }
}

#[test]
fn test_case_insensitive_fields() {
    let blocks = read_raw(
        4,
        &vorbis_payload(
            "vendor",
            &["Artist=Artist 1", "TITLE=Title", "ARTIST=Artist 2", "EMPTY="],
        ),
    )
    .unwrap();

    let Block::VorbisComment(comment) = &blocks[1] else {
        panic!("VORBIS_COMMENT block not read");
    };
    assert_eq!(comment.vendor_string, "vendor");
    assert_eq!(
        comment.iter().map(|(k, _)| k).collect::<Vec<_>>(),
        vec!["Artist", "TITLE", "EMPTY"],
    );
    assert_eq!(comment.get("artist").unwrap().as_slice(), ["Artist 1", "Artist 2"]);
    assert_eq!(comment.get("empty").unwrap().as_slice(), [""]);
    assert_eq!(comment.value_count(), 4);
}

#[test]
fn test_invalid_entry() {
    assert!(matches!(
        read_raw(4, &vorbis_payload("vendor", &["TITLE=Title", "nonsense"])),
        Err(Error::InvalidFormat(InvalidFormat::VorbisCommentEntry))
    ));
}

#[test]
fn test_remove_fields() {
    let mut comment = VorbisComment::default();
    comment.replace("GENRE", ["Rock", "Jazz", "rock"]);
    comment.add(ARTIST, "Artist");

    assert_eq!(comment.remove_value("genre", "ROCK"), 2);
    assert_eq!(comment.get("GENRE").unwrap().as_slice(), ["Jazz"]);
    assert_eq!(comment.remove_value("ALBUM", "Album"), 0);

    assert_eq!(
        comment.remove("artist").map(Vec::from),
        Some(vec!["Artist".to_owned()])
    );
    assert!(comment.remove(ARTIST).is_none());
    assert_eq!(comment.len(), 1);

    comment.set("GENRE", "Blues");
    assert_eq!(comment.genre().as_slice(), ["Blues"]);
}

#[test]
#[should_panic]
fn test_field_with_equals() {
    VorbisComment::default().add("TITLE=", "Title");
}

#[test]
fn test_vorbis_size() {
    let mut comment = VorbisComment::default();
    comment.vendor_string = "vendor".to_owned();
    comment.add("TITLE", "Title");
    comment.add("ARTIST", "A");
    comment.add("ARTIST", "B");

    // 4 + 6 + 4 + (4 + 11) + (4 + 8) + (4 + 8)
    assert_eq!(u32::from(comment.size().unwrap()), 53);

    let mut data = vec![];
    write_blocks(&mut data, &[Block::from(comment)]).unwrap();
    assert_eq!(data.len(), 4 + 4 + 53);
    assert_eq!(&data[4..8], &[0x84, 0x00, 0x00, 53]);
}

#[test]
fn test_padding() {
    let temp = TempFlac::new(&flac(
        &[streaminfo().into(), Padding::new(64).unwrap().into()],
        &frames(100),
    ));

    let mut file = FlacFile::open(temp.path()).unwrap();
    let padding = file.padding_mut().unwrap();
    assert!(matches!(
        padding.set_empty_bit_count(255),
        Err(Error::InvalidPaddingBitCount(255))
    ));
    assert_eq!(padding.empty_bit_count(), 64);
    padding.set_empty_bit_count(256).unwrap();
    assert_eq!(u32::from(padding.size().unwrap()), 32);
    file.save().unwrap();

    let file = FlacFile::open(temp.path()).unwrap();
    assert_eq!(file.padding().unwrap().empty_bit_count(), 256);

    assert!(matches!(Padding::new(12), Err(Error::InvalidPaddingBitCount(12))));
    assert!(matches!(
        Padding::new(1 << 27),
        Err(Error::ExcessiveBlockSize)
    ));
}

#[test]
fn test_seektable() {
    let temp = TempFlac::new(&flac(&[streaminfo().into()], &frames(100)));

    let mut file = FlacFile::open(temp.path()).unwrap();
    let mut table = SeekTable::default();
    table.points.add(SeekPoint::placeholder());
    table.points.add(SeekPoint::new(4096, 1234, 4096));
    table.points.add(SeekPoint::placeholder());
    assert_eq!(u32::from(table.size().unwrap()), 18 * 3);
    file.metadata_mut().push(table.into());
    file.save().unwrap();

    let file = FlacFile::open(temp.path()).unwrap();
    let points = &file.seek_table().unwrap().points;
    assert_eq!(points.placeholders(), 2);
    assert_eq!(points.len(), 1);
    let point = points.get(4096).unwrap();
    assert_eq!(point.byte_offset, 1234);
    assert_eq!(point.number_of_samples, 4096);
    assert!(!point.is_placeholder());
}

#[test]
fn test_seekpoints() {
    let mut table = SeekTable::default();
    table.points.add(SeekPoint::new(8192, 2000, 4096));
    table.points.add(SeekPoint::new(0, 0, 4096));
    table.points.add(SeekPoint::new(8192, 3000, 4096));
    table.points.add(SeekPoint::placeholder());

    // duplicates replace, and points stay ordered
    assert_eq!(
        table
            .points
            .iter()
            .map(|p| (p.first_sample_number(), p.byte_offset))
            .collect::<Vec<_>>(),
        vec![(0, 0), (8192, 3000)],
    );

    // placeholders follow the real points on disk
    let mut data = vec![];
    write_blocks(&mut data, &[Block::from(table.clone())]).unwrap();
    assert_eq!(&data[8 + 36..8 + 44], &[0xff; 8]);

    *table.points.get_mut(0).unwrap().byte_offset = 10;
    assert_eq!(table.points.get(0).unwrap().byte_offset, 10);

    assert!(table.points.remove(SeekPoint::PLACEHOLDER).is_some());
    assert!(table.points.remove(SeekPoint::PLACEHOLDER).is_none());
    assert!(table.points.remove(8192).is_some());
    assert!(!table.points.contains_key(8192));

    let mut point = SeekPoint::new(0, 0, 0);
    point.set_first_sample_number(SeekPoint::PLACEHOLDER);
    assert!(point.is_placeholder());
}

#[test]
fn test_seektable_partial_point() {
    // one whole point followed by a stray byte
    let mut payload = vec![];
    payload.extend_from_slice(&4096u64.to_be_bytes());
    payload.extend_from_slice(&10u64.to_be_bytes());
    payload.extend_from_slice(&4096u16.to_be_bytes());
    payload.push(0xff);

    let mut data = flac(&[streaminfo().into()], &[]);
    data[4] = 0;
    raw_header(&mut data, false, 3, payload.len() as u32);
    data.extend_from_slice(&payload);
    raw_header(&mut data, true, 1, 8);
    data.extend_from_slice(&[0; 8]);

    let blocks = read_blocks(data.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(blocks.len(), 3);

    let Block::SeekTable(table) = &blocks[1] else {
        panic!("SEEKTABLE block not read");
    };
    assert_eq!(table.points.len(), 1);
    assert_eq!(table.points.placeholders(), 0);
    assert_eq!(table.points.get(4096).unwrap().byte_offset, 10);

    // the block after the stray byte is still read intact
    assert!(matches!(&blocks[2], Block::Padding(p) if p.empty_bit_count() == 64));

    // too short for any point at all
    let blocks = read_raw(3, &[0; 17]).unwrap();
    assert!(matches!(&blocks[1], Block::SeekTable(t) if t.points.is_empty()));
}

#[test]
fn test_application() {
    let application = Application::new(Application::RIFF, b"chunk data".to_vec());
    assert_eq!(u32::from(application.size().unwrap()), 4 + 10);

    let blocks = read_raw(2, &{
        let mut payload = Application::RIFF.to_be_bytes().to_vec();
        payload.extend_from_slice(b"chunk data");
        payload
    })
    .unwrap();
    assert_eq!(blocks[1], Block::from(application));

    assert!(matches!(
        read_raw(2, &[0x72, 0x69]),
        Err(Error::InvalidFormat(
            InvalidFormat::InsufficientApplicationBlock
        ))
    ));
}

#[test]
fn test_streaminfo() {
    let mut info = streaminfo();
    assert_eq!(info.duration(), Some(3));
    // partial seconds are dropped, not rounded
    info.total_samples = 66150;
    assert_eq!(info.duration(), Some(1));
    info.total_samples = 88199;
    assert_eq!(info.duration(), Some(1));
    info.total_samples = 44099;
    assert_eq!(info.duration(), Some(0));
    info.sample_rate = 0;
    assert_eq!(info.duration(), None);

    let invalid_fields: [fn(&mut Streaminfo); 6] = [
        |s| s.channels = 0,
        |s| s.channels = 9,
        |s| s.bits_per_sample = 33,
        |s| s.sample_rate = 1 << 20,
        |s| s.total_samples = 1 << 36,
        |s| s.maximum_frame_size = 1 << 24,
    ];

    for invalid in invalid_fields {
        let mut info = streaminfo();
        invalid(&mut info);
        assert!(matches!(
            write_blocks(std::io::sink(), &[Block::from(info)]),
            Err(Error::InvalidStreaminfo)
        ));
    }
}

#[test]
fn test_streaminfo_fixed_size() {
    // whatever size STREAMINFO claims, it's 34 bytes
    let mut data = flac(&[streaminfo().into(), Padding::new(8).unwrap().into()], &[]);
    data[7] = 0xff;

    let file = FlacFile::read(Cursor::new(data)).unwrap();
    assert_eq!(file.metadata().len(), 2);
    assert_eq!(file.padding().unwrap().empty_bit_count(), 8);

    let header = streaminfo().header(true).unwrap();
    assert_eq!(
        header,
        BlockHeader {
            last: true,
            block_type: BlockType::Streaminfo,
            size: 34u8.into(),
        }
    );
}

#[test]
fn test_get_returns_last() {
    let data = flac(
        &[
            streaminfo().into(),
            Application::new(1, vec![]).into(),
            Application::new(2, vec![]).into(),
        ],
        &[],
    );

    let file = FlacFile::read(Cursor::new(data)).unwrap();
    assert_eq!(file.application().unwrap().id, 2);
    assert_eq!(file.get_all::<Application>().count(), 2);
    assert!(file.get::<SeekTable>().is_none());
}
