//! Round trips through the writer and the reader

use super::super::consts::MINI_STREAM_CUTOFF;
use super::super::file::{OleError, OleFile};
use super::core::OleWriter;
use std::io::Cursor;

fn reopen(writer: &OleWriter) -> OleFile<Cursor<Vec<u8>>> {
    let data = writer.to_bytes().unwrap();
    OleFile::open(Cursor::new(data)).unwrap()
}

#[test]
fn test_write_simple_file() {
    let mut writer = OleWriter::new();
    writer.create_stream(&["PrvText"], b"Hello, World!").unwrap();

    let data = writer.to_bytes().unwrap();
    assert!(data.len() >= 1536);
    assert_eq!(&data[0..8], b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1");

    let mut ole = OleFile::open(Cursor::new(data)).unwrap();
    assert_eq!(ole.open_stream(&["PrvText"]).unwrap(), b"Hello, World!");
}

#[test]
fn test_write_hwp_layout() {
    let mut writer = OleWriter::new();
    writer.create_stream(&["FileHeader"], &[0x48; 256]).unwrap();
    writer.create_stream(&["DocInfo"], &[0x01; 700]).unwrap();
    writer.create_stream(&["BodyText", "Section0"], &[0xAA; 6000]).unwrap();
    writer.create_stream(&["BodyText", "Section1"], &[0xBB; 100]).unwrap();
    writer.create_stream(&["PrvText"], &[0x20; 2048]).unwrap();

    let mut ole = reopen(&writer);
    assert_eq!(ole.list_streams().len(), 5);
    assert_eq!(ole.list_storages(), vec![vec!["BodyText".to_string()]]);
    assert_eq!(ole.open_stream(&["BodyText", "Section0"]).unwrap(), vec![0xAA; 6000]);
    assert_eq!(ole.open_stream(&["BodyText", "Section1"]).unwrap(), vec![0xBB; 100]);
    assert_eq!(ole.open_stream(&["FileHeader"]).unwrap(), vec![0x48; 256]);
}

#[test]
fn test_write_empty_stream() {
    let mut writer = OleWriter::new();
    writer.create_stream(&["Empty"], b"").unwrap();

    let mut ole = reopen(&writer);
    assert!(ole.exists(&["Empty"]));
    assert!(ole.open_stream(&["Empty"]).unwrap().is_empty());
}

#[test]
fn test_write_many_small_streams() {
    let mut writer = OleWriter::new();
    for i in 0..40 {
        let payload = vec![i as u8; 100 + i * 7];
        writer.create_stream(&["Scripts", &format!("Script{}", i)], &payload).unwrap();
    }

    let mut ole = reopen(&writer);
    for i in 0..40 {
        let name = format!("Script{}", i);
        let data = ole.open_stream(&["Scripts", &name]).unwrap();
        assert_eq!(data, vec![i as u8; 100 + i * 7]);
    }
}

#[test]
fn test_write_large_stream() {
    // Large enough to need more than 109 FAT sectors, so DIFAT sectors are used
    let payload: Vec<u8> = (0..7_500_000u32).map(|i| (i % 251) as u8).collect();
    let mut writer = OleWriter::new();
    writer.create_stream(&["BodyText", "Section0"], &payload).unwrap();

    let mut ole = reopen(&writer);
    assert_eq!(ole.open_stream(&["BodyText", "Section0"]).unwrap(), payload);
}

#[test]
fn test_write_sector_size_4096() {
    let mut writer = OleWriter::with_sector_size(4096);
    writer.create_stream(&["DocInfo"], &[0x10; 300]).unwrap();
    writer.create_stream(&["BodyText", "Section0"], &[0x20; 20000]).unwrap();

    let mut ole = reopen(&writer);
    assert_eq!(ole.sector_size(), 4096);
    assert_eq!(ole.open_stream(&["DocInfo"]).unwrap(), vec![0x10; 300]);
    assert_eq!(ole.open_stream(&["BodyText", "Section0"]).unwrap(), vec![0x20; 20000]);
}

#[test]
fn test_root_clsid_preserved() {
    let clsid = *b"0123456789abcdef";
    let mut writer = OleWriter::new();
    writer.set_root_clsid(clsid);
    writer.create_stream(&["FileHeader"], &[0; 256]).unwrap();

    let ole = reopen(&writer);
    assert_eq!(ole.root_clsid(), clsid);
}

#[test]
fn test_empty_storage_survives() {
    let mut writer = OleWriter::new();
    writer.create_storage(&["BinData"]).unwrap();
    writer.create_stream(&["PrvText"], b"x").unwrap();

    let ole = reopen(&writer);
    assert!(ole.exists(&["BinData"]));
    assert_eq!(ole.list_storages(), vec![vec!["BinData".to_string()]]);
}

#[test]
fn test_directory_order_is_stable() {
    let mut writer = OleWriter::new();
    for name in ["Section10", "Section2", "Section0", "Section1"] {
        writer.create_stream(&["BodyText", name], name.as_bytes()).unwrap();
    }

    let ole = reopen(&writer);
    let names: Vec<String> = ole
        .list_streams()
        .into_iter()
        .map(|path| path.join("/"))
        .collect();
    assert_eq!(
        names,
        vec![
            "BodyText/Section0",
            "BodyText/Section1",
            "BodyText/Section2",
            "BodyText/Section10",
        ]
    );
}

#[test]
#[should_panic(expected = "Sector size must be 512 or 4096")]
fn test_invalid_sector_size() {
    let _ = OleWriter::with_sector_size(1024);
}

#[test]
fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("written.hwp");

    let mut writer = OleWriter::new();
    writer.create_stream(&["PrvText"], b"on disk").unwrap();
    let mut file = std::fs::File::create(&path).unwrap();
    writer.write_to(&mut file).unwrap();
    drop(file);

    let file = std::fs::File::open(&path).unwrap();
    let mut ole = OleFile::open(file).unwrap();
    assert_eq!(ole.open_stream(&["PrvText"]).unwrap(), b"on disk");
}

#[test]
fn test_boundary_conditions() {
    let cutoff = MINI_STREAM_CUTOFF as usize;
    let sizes = [1, 63, 64, 65, cutoff - 1, cutoff, cutoff + 1, 511, 512, 513];

    let mut writer = OleWriter::new();
    for (i, &size) in sizes.iter().enumerate() {
        writer
            .create_stream(&[&format!("S{}", i)], &vec![(i + 1) as u8; size])
            .unwrap();
    }

    let mut ole = reopen(&writer);
    for (i, &size) in sizes.iter().enumerate() {
        let data = ole.open_stream(&[&format!("S{}", i)]).unwrap();
        assert_eq!(data.len(), size, "stream S{}", i);
        assert!(data.iter().all(|&b| b == (i + 1) as u8));
    }
}

#[test]
fn test_storage_is_not_a_stream() {
    let mut writer = OleWriter::new();
    writer.create_stream(&["BodyText", "Section0"], b"abc").unwrap();

    let mut ole = reopen(&writer);
    assert!(matches!(
        ole.open_stream(&["BodyText"]),
        Err(OleError::InvalidFormat(_))
    ));
}
