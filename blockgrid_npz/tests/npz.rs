//! Tests for writing and reading `.npz` archives on disk.

use std::collections::BTreeMap;

use blockgrid::{Block, chunking};
use blockgrid_npz::{
    NpyArray, NpzCompression, NpzEntry, NpzError, NpzOptions, NpzReader, NpzWriter, read_block,
    read_npz, write_npz,
};
use ndarray::{Array2, ArrayD, IxDyn};

fn volume(nbatches: usize) -> Block<f64> {
    let data = ArrayD::from_shape_fn(IxDyn(&[nbatches, 4, 6, 2]), |idx| {
        (idx[0] * 48 + idx[1] * 12 + idx[2] * 2 + idx[3]) as f64 / 8.0
    });
    let location = Array2::from_shape_fn((nbatches, 3), |(b, d)| (b * 10 + d) as i64 - 5);
    Block::new_with_data(location, data).unwrap()
}

#[test]
fn npz_round_trip_arrays_and_blocks() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("arrays.npz");

    let block = volume(3);
    let labels = NpyArray::from(ArrayD::from_shape_fn(IxDyn(&[3, 4, 6, 2]), |idx| {
        (idx[0] + idx[3]) as i32
    }));
    let scale = NpyArray::from(ArrayD::<f32>::from_elem(IxDyn(&[]), 0.25));
    write_npz(
        &path,
        [
            ("volume", NpzEntry::try_from(&block).unwrap()),
            ("labels", labels.clone().into()),
            ("scale", scale.clone().into()),
        ],
        &NpzOptions::default(),
    )
    .unwrap();

    let arrays = read_npz(&path).unwrap();
    assert_eq!(
        arrays.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["labels", "scale", "volume_data", "volume_location"]
    );
    assert_eq!(arrays["labels"], labels);
    assert_eq!(arrays["scale"], scale);
    assert_eq!(
        arrays["volume_location"],
        NpyArray::from(block.location().clone().into_dyn())
    );
    assert_eq!(read_block::<f64>(&arrays, "volume").unwrap(), block);
}

#[test]
fn npz_chunked_block() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("chunks.npz");

    let envelope = volume(2);
    let chunks = chunking::chunk_block(&envelope, &[2, 3, 1]).unwrap();
    write_npz(
        &path,
        [("chunks", NpzEntry::try_from(chunks.clone()).unwrap())],
        &NpzOptions::default(),
    )
    .unwrap();

    let mut reader = NpzReader::open(&path).unwrap();
    assert_eq!(reader.names(), vec!["chunks_data", "chunks_location"]);
    let read = reader.block::<f64>("chunks").unwrap();
    assert_eq!(read.nbatches(), 2 * 2 * 2 * 2);
    assert_eq!(read.shape(), &[2, 3, 1]);
    assert_eq!(read, chunks);
}

#[test]
fn npz_compression() {
    let dir = tempfile::TempDir::new().unwrap();
    let zeros = NpyArray::from(ArrayD::<f64>::zeros(IxDyn(&[64, 64])));

    let mut sizes = BTreeMap::new();
    for (name, compression) in [
        ("stored", NpzCompression::Stored),
        ("deflated", NpzCompression::Deflated),
    ] {
        let path = dir.path().join(format!("{name}.npz"));
        let options = NpzOptions::default()
            .with_compression(compression)
            .with_compression_level(Some(6));
        write_npz(&path, [("zeros", NpzEntry::from(zeros.clone()))], &options).unwrap();
        assert_eq!(read_npz(&path).unwrap()["zeros"], zeros);
        sizes.insert(name, std::fs::metadata(&path).unwrap().len());
    }
    assert!(sizes["deflated"] < sizes["stored"]);
    assert!(sizes["stored"] > 64 * 64 * 8);
}

#[test]
fn npz_writer_add_block() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("writer.npz");
    let block = volume(1);

    let mut writer = NpzWriter::create(&path, &NpzOptions::default()).unwrap();
    writer.add_block("v", &block).unwrap();
    writer
        .add_ndarray("mask", ArrayD::<i32>::ones(IxDyn(&[4, 6, 2])).view())
        .unwrap();
    writer.finish().unwrap();

    let mut reader = NpzReader::open(&path).unwrap();
    assert_eq!(reader.block::<f64>("v").unwrap(), block);
    assert_eq!(reader.array("mask").unwrap().shape(), &[4, 6, 2]);
    assert!(matches!(
        reader.block::<f32>("v"),
        Err(NpzError::DataTypeMismatch { expected: "<f4", got: "<f8", .. })
    ));
    assert!(matches!(
        reader.block::<f64>("w"),
        Err(NpzError::MissingEntry(name)) if name == "w_location"
    ));
}

#[test]
fn npz_block_without_data() {
    let block = Block::<f32>::new_with_shape([0, 0, 0], [4, 4, 4]).unwrap();
    assert!(matches!(
        NpzEntry::try_from(&block),
        Err(NpzError::MissingData)
    ));
}

#[test]
fn npz_read_block_missing_entries() {
    let mut arrays = BTreeMap::new();
    arrays.insert(
        "v_location".to_string(),
        NpyArray::from(ArrayD::<i64>::zeros(IxDyn(&[1, 2]))),
    );
    assert!(matches!(
        read_block::<f32>(&arrays, "v"),
        Err(NpzError::MissingEntry(name)) if name == "v_data"
    ));
    assert!(matches!(
        read_block::<f32>(&arrays, "u"),
        Err(NpzError::MissingEntry(name)) if name == "u_location"
    ));
}

#[test]
fn npz_missing_file() {
    let dir = tempfile::TempDir::new().unwrap();
    assert!(matches!(
        read_npz(dir.path().join("missing.npz")),
        Err(NpzError::Io(_))
    ));
}
