//! End-to-end reader tests: real threads, a real chunk source and the
//! line-based fixture parser.
//!
//! Chunk sizes are kept tiny so that records straddle chunk boundaries
//! and the bounded input queue fills up.

use std::io::Cursor;
use std::path::PathBuf;

use strata_decoder::{DecodeError, OpenError, Reader, ReaderConfig};
use strata_tests::{init_tracing, line_factory, record_strings};
use strata_types::{Buffer, EntityBits, File};

const SAMPLE: &str = "@osmium/1.16\nn1 v1\nn2 v1\nw10 v3\nr5 v1\nc7\n";

fn tiny() -> ReaderConfig {
    ReaderConfig::default()
        .with_chunk_size(3)
        .with_input_queue_capacity(2)
}

fn open_bytes(data: impl Into<String>, read_types: EntityBits, config: &ReaderConfig) -> Reader {
    init_tracing();
    Reader::from_reader(
        &line_factory(),
        File::new("sample.opl"),
        Cursor::new(data.into().into_bytes()),
        read_types,
        config,
    )
    .unwrap_or_else(|err| panic!("failed to open reader: {err}"))
}

/// A file under the system temp dir, removed on drop.
struct TempFile(PathBuf);

impl TempFile {
    fn new(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("strata-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        Self(path)
    }

    fn name(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

#[test]
fn decodes_records_across_chunk_boundaries() {
    let mut reader = open_bytes(SAMPLE, EntityBits::ALL, &tiny());

    assert_eq!(reader.header().get().unwrap().generator(), "osmium/1.16");

    let buffers: Vec<Buffer> = reader.buffers().map(Result::unwrap).collect();
    assert_eq!(buffers.iter().map(Buffer::len).collect::<Vec<_>>(), vec![2, 2, 1]);
    assert_eq!(
        record_strings(&buffers),
        vec!["n1 v1", "n2 v1", "w10 v3", "r5 v1", "c7"]
    );

    let summary = reader.close();
    assert_eq!(summary.buffers, 3);
    assert_eq!(summary.discarded_chunks, 0);
}

#[test]
fn entity_filter_reaches_the_parser() {
    let mut reader = open_bytes(SAMPLE, EntityBits::WAY | EntityBits::RELATION, &tiny());

    let buffers: Vec<Buffer> = reader.buffers().map(Result::unwrap).collect();
    assert_eq!(record_strings(&buffers), vec!["w10 v3", "r5 v1", "c7"]);
}

#[test]
fn decode_error_ends_the_stream() {
    let data = "@gen\nn1\nn2\nn3\n!broken\nn4\n";
    let mut reader = open_bytes(data, EntityBits::ALL, &tiny());

    // The header was already resolved, so it stays good.
    assert_eq!(reader.header().get().unwrap().generator(), "gen");

    let items: Vec<_> = reader.buffers().collect();
    assert_eq!(items.len(), 2);
    assert_eq!(record_strings([items[0].as_ref().unwrap()]), vec!["n1", "n2"]);

    let failure = items[1].as_ref().unwrap_err();
    assert!(matches!(
        failure.error(),
        DecodeError::Malformed { offset: 14, .. }
    ));

    assert_eq!(reader.read().unwrap(), None);
}

#[test]
fn missing_header_line_fails_header_and_stream() {
    let mut reader = open_bytes("n1\nn2\n", EntityBits::ALL, &ReaderConfig::default());

    let header_failure = reader.header().get().unwrap_err();
    assert_eq!(
        header_failure.to_string(),
        "malformed input at offset 0: missing @generator line"
    );
    let stream_failure = reader.read().unwrap_err();
    assert!(stream_failure.same_as(&header_failure));
}

#[test]
fn empty_input_is_truncated() {
    let reader = open_bytes("", EntityBits::ALL, &ReaderConfig::default());
    let failure = reader.header().get().unwrap_err();
    assert!(matches!(failure.error(), DecodeError::Truncated { .. }));
}

#[test]
fn header_only_input_has_no_buffers() {
    let mut reader = open_bytes("@lonely", EntityBits::ALL, &ReaderConfig::default());

    assert_eq!(reader.header().get().unwrap().generator(), "lonely");
    assert_eq!(reader.read().unwrap(), None);
    assert!(reader.buffers().is_finished());
    assert!(reader.buffers().next().is_none());
}

#[test]
fn header_is_shared_between_threads() {
    let reader = open_bytes(SAMPLE, EntityBits::ALL, &tiny());
    let header = reader.header();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| header.get().unwrap().generator().to_string()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "osmium/1.16");
        }
    });
}

#[test]
fn closing_early_drains_the_input() {
    let data: String = std::iter::once("@big\n".to_string())
        .chain((0..500).map(|i| format!("n{i}\n")))
        .collect();
    let mut reader = open_bytes(data, EntityBits::ALL, &tiny());

    assert!(reader.read().unwrap().is_some());
    let summary = reader.close();
    assert_eq!(summary.buffers, 250);
    assert!(!summary.failed);
}

#[test]
fn opens_a_file_on_disk() {
    init_tracing();
    let file = TempFile::new("extract.opl", SAMPLE);

    let mut reader = Reader::open(
        &line_factory(),
        File::new(file.name()),
        EntityBits::NODE,
        &ReaderConfig::default(),
    )
    .unwrap_or_else(|err| panic!("failed to open {}: {err}", file.name()));

    assert_eq!(reader.file().filename(), file.name());
    let buffers: Vec<Buffer> = reader.buffers().map(Result::unwrap).collect();
    assert_eq!(record_strings(&buffers), vec!["n1 v1", "n2 v1", "c7"]);
}

#[test]
fn unsupported_file_is_not_opened() {
    init_tracing();
    let err = Reader::open(
        &line_factory(),
        File::new("/does/not/exist.osm.pbf"),
        EntityBits::ALL,
        &ReaderConfig::default(),
    )
    .err()
    .unwrap();

    // Format lookup happens first, so the missing file is never noticed.
    assert_eq!(
        err.to_string(),
        "unsupported format: /does/not/exist.osm.pbf (pbf)"
    );
}

#[test]
fn missing_file_is_an_io_error() {
    init_tracing();
    let err = Reader::open(
        &line_factory(),
        File::new("/does/not/exist.opl"),
        EntityBits::ALL,
        &ReaderConfig::default(),
    )
    .err()
    .unwrap();

    match err {
        OpenError::Io { path, source } => {
            assert_eq!(path, "/does/not/exist.opl");
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected an I/O error, got {other}"),
    }
}
