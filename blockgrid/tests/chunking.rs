//! Tests for the correspondence of chunk locations and chunk content.

use blockgrid::chunking::{self, ChunkError};
use blockgrid::{Block, BlockError, BlockState, Index, batchify};
use itertools::iproduct;
use ndarray::{Array2, ArrayD, Axis, IxDyn, SliceInfoElem};

/// An array holding the flat (row-major) index of each element.
fn iota(shape: &[usize]) -> ArrayD<u64> {
    let len = shape.iter().product::<usize>() as u64;
    ArrayD::from_shape_vec(IxDyn(shape), (0..len).collect()).unwrap()
}

#[test]
fn unbatched_location_is_single_batch() {
    for vdim in 0..5 {
        let location: Vec<Index> = (0..vdim).map(|d| d as Index - 2).collect();
        let block = Block::<f32>::new_with_shape(location, vec![1; vdim]).unwrap();
        assert_eq!(block.nbatches(), 1);
        assert_eq!(block.vdim(), vdim);
    }
}

#[test]
fn shape_tracks_data_after_every_mutation() {
    let mut block =
        Block::<u64>::new_with_shape(vec![[0, 0, 0], [1, 1, 1]], [2, 2, 2]).unwrap();
    for shape in [[6, 3, 8], [1, 1, 1], [4, 2, 9]] {
        let batched: Vec<usize> = std::iter::once(2).chain(shape).collect();
        block.set_data(iota(&batched)).unwrap();
        assert_eq!(block.shape(), &shape);
        assert_eq!(&block.data().unwrap().shape()[1..], block.shape());

        block.set_shape([3, 3, 3]).unwrap();
        assert_eq!(block.shape(), &[3, 3, 3]);
        assert!(block.data().is_none());
    }
}

#[test]
fn data_shape_wins_over_set_shape() {
    let mut block = Block::<u64>::new_with_shape([0, 0], [4, 4]).unwrap();
    block.set_shape([8, 8]).unwrap();
    block.set_data(iota(&[3, 5])).unwrap();
    assert_eq!(block.shape(), &[3, 5]);
    assert!(matches!(
        block.state(),
        BlockState::ShapeWithData(data) if data.shape() == [1, 3, 5]
    ));
}

#[test]
fn set_data_rejection_leaves_block_unchanged() {
    let mut block = Block::new_with_data([0, 0], iota(&[2, 2])).unwrap();
    let before = block.clone();
    assert!(matches!(
        block.set_data(iota(&[2, 2, 2, 2])),
        Err(BlockError::DataRank(..))
    ));
    assert_eq!(block, before);
}

#[test]
fn batchify_is_idempotent() {
    let location = Array2::<Index>::from_shape_fn((4, 3), |(b, d)| (b * 3 + d) as Index);
    let block = batchify(location, iota(&[4, 2, 3, 4])).unwrap();
    let (location, data) = block.clone().into_parts();
    let once = batchify(location, data.unwrap()).unwrap();
    let (location, data) = once.clone().into_parts();
    let twice = batchify(location, data.unwrap()).unwrap();
    assert_eq!(once, block);
    assert_eq!(twice, block);
}

#[test]
fn location_and_content_shapes_correspond() {
    let location = Array2::<Index>::ones((10, 3));
    let envelope = Block::new_with_data(location, iota(&[10, 6, 3, 8])).unwrap();
    let locations = chunking::location(&envelope, &[2, 3, 4]).unwrap();
    let contents = chunking::content(&envelope, &[2, 3, 4]).unwrap();
    assert_eq!(locations.shape(), &[10, 3, 1, 2, 3]);
    assert_eq!(contents.shape(), &[10, 3, 1, 2, 2, 3, 4]);
    assert_eq!(locations.shape()[1..4], contents.shape()[1..4]);
}

#[test]
fn location_and_content_select_the_same_chunk() {
    // With unit locations, each chunk location is the chunk offset within its volume.
    let envelope =
        Block::new_with_data(Array2::<Index>::ones((2, 3)), iota(&[2, 6, 3, 8])).unwrap();
    let chunk_shape = [2, 3, 4];
    let locations = chunking::location(&envelope, &chunk_shape).unwrap();
    let contents = chunking::content(&envelope, &chunk_shape).unwrap();
    let data = envelope.data().unwrap();

    for (b, i, j, k) in iproduct!(0..2, 0..3, 0..1, 0..2) {
        let offset = locations.slice_each_axis(|ax| match ax.axis.index() {
            0 => (b..=b).into(),
            1 => (i..=i).into(),
            2 => (j..=j).into(),
            3 => (k..=k).into(),
            _ => (..).into(),
        });
        let offset: Vec<usize> = offset.iter().map(|&o| usize::try_from(o).unwrap()).collect();
        let mut volume_slice: Vec<SliceInfoElem> = vec![SliceInfoElem::Index(b as isize)];
        volume_slice.extend(
            std::iter::zip(&offset, chunk_shape).map(|(&o, c)| SliceInfoElem::from(o..o + c)),
        );
        let expected = data.slice(volume_slice.as_slice());

        let chunk = contents
            .index_axis(Axis(0), b)
            .index_axis_move(Axis(0), i)
            .index_axis_move(Axis(0), j)
            .index_axis_move(Axis(0), k);
        assert_eq!(chunk, expected);
    }
}

#[test]
fn content_round_trip() {
    let data = iota(&[3, 6, 3, 8]);
    let envelope = Block::new_with_data(Array2::<Index>::zeros((3, 3)), data.clone()).unwrap();
    let contents = chunking::content(&envelope, &[2, 3, 4]).unwrap();

    // invert the layout steps: regroup within-chunk axes next to their chunk index axes, then merge
    let split = contents.view().permuted_axes(vec![0, 1, 4, 2, 5, 3, 6]);
    let restored = split
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order(vec![3, 6, 3, 8])
        .unwrap();
    assert_eq!(restored, data);

    assert_eq!(chunking::assemble(contents.view(), 3).unwrap(), data);
}

#[test]
fn content_rejects_non_multiple_without_mutation() {
    let data = iota(&[1, 5, 3, 8]);
    let envelope = Block::new_with_data([0, 0, 0], data.clone()).unwrap();
    let before = envelope.clone();
    assert!(matches!(
        chunking::content(&envelope, &[2, 3, 4]),
        Err(ChunkError::NotIntegerMultiple { .. })
    ));
    assert_eq!(envelope, before);
    assert_eq!(envelope.data().unwrap(), &data);
}

#[test]
fn chunking_dimensionality_agnostic() {
    for vdim in 1..=4 {
        let shape: Vec<usize> = (0..vdim).map(|d| 2 * (d + 1)).collect();
        let chunk_shape: Vec<usize> = (0..vdim).map(|d| d + 1).collect();
        let batched: Vec<usize> = std::iter::once(2).chain(shape.iter().copied()).collect();
        let data = iota(&batched);
        let envelope =
            Block::new_with_data(Array2::<Index>::ones((2, vdim)), data.clone()).unwrap();

        let locations = chunking::location(&envelope, &chunk_shape).unwrap();
        let contents = chunking::content(&envelope, &chunk_shape).unwrap();
        assert_eq!(locations.ndim(), vdim + 2);
        assert_eq!(contents.ndim(), 2 * vdim + 1);
        assert!(locations.shape()[1..=vdim].iter().all(|&m| m == 2));
        assert_eq!(locations.shape()[1..=vdim], contents.shape()[1..=vdim]);
        assert_eq!(&contents.shape()[vdim + 1..], chunk_shape.as_slice());
        assert_eq!(chunking::assemble(contents.view(), vdim).unwrap(), data);
    }
}

#[test]
fn chunk_block_pairs_location_with_content() {
    let envelope =
        Block::new_with_data(Array2::<Index>::ones((2, 2)), iota(&[2, 4, 4])).unwrap();
    let chunks = chunking::chunk_block(&envelope, &[2, 2]).unwrap();
    assert_eq!(chunks.nbatches(), 8);
    assert_eq!(chunks.size(), vec![8, 2, 2]);
    for (location, chunk) in chunks
        .location()
        .outer_iter()
        .zip(chunks.data().unwrap().outer_iter())
    {
        let (x, y) = (location[0] as u64, location[1] as u64);
        // the first element of a chunk of a 4x4 volume at offset (x, y)
        let batch = chunk[[0, 0]] / 16;
        assert_eq!(chunk[[0, 0]], batch * 16 + x * 4 + y);
    }
}
