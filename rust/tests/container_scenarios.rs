use paged_containers::{
    recommended_page_size, ArrayConfig, ContainerError, Direction, Endian, PagedVector,
    SparseArray, VectorConfig, DEFAULT_PAGE_SIZE,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const SCATTERED: [u64; 12] = [52, 53, 167, 223, 985, 986, 987, 988, 989, 990, 991, 992];

fn scattered_array() -> SparseArray {
    let mut array = SparseArray::new(4).unwrap();
    for &index in &SCATTERED {
        array.put_u32(index, (index * 3) as u32).unwrap();
    }
    array
}

#[test]
fn test_scattered_writes() {
    init_logging();
    let mut array = scattered_array();

    assert_eq!(array.elem_num(), 981);
    assert_eq!(array.size(), 12);
    assert_eq!(array.pages(), 2);
    assert_eq!(array.low(), Some(52));
    assert_eq!(array.high(), Some(992));
    assert_eq!(array.capacity(), 992 - 52 + 1);

    for &index in &SCATTERED {
        assert!(array.status(index));
        assert_eq!(array.get_u32(index).unwrap(), (index * 3) as u32);
    }
    assert!(!array.status(54));
    assert_eq!(
        array.get_u32(54),
        Err(ContainerError::UninitializedElement(54))
    );
    array.check_invariants_detailed().unwrap();
}

#[test]
fn test_scattered_iteration_both_directions() {
    init_logging();
    let array = scattered_array();

    let forward: Vec<u64> = array.iter().map(|(index, _)| index).collect();
    assert_eq!(forward, SCATTERED.to_vec());

    let mut backward: Vec<u64> = array.iter_rev().map(|(index, _)| index).collect();
    backward.reverse();
    assert_eq!(backward, SCATTERED.to_vec());

    for (index, bytes) in array.iter() {
        assert_eq!(bytes, ((index * 3) as u32).to_ne_bytes());
    }
}

#[test]
fn test_iterator_stepping() {
    init_logging();
    let array = scattered_array();
    let mut it = array.iter();
    assert_eq!(it.index(), Some(52));
    it.inc(4);
    assert_eq!(it.index(), Some(985));
    it.dec(2);
    assert_eq!(it.index(), Some(167));
    assert_eq!(it.elem(), Some(&501u32.to_ne_bytes()[..]));
}

#[test]
fn test_cursor_clears_while_walking() {
    init_logging();
    let mut array = scattered_array();
    let mut cursor = array.cursor(Direction::Forward);
    let mut cleared = Vec::new();
    while let Some(index) = cursor.next(&array) {
        if index >= 985 {
            array.set_status(index, false).unwrap();
            cleared.push(index);
        }
    }
    assert_eq!(cleared, SCATTERED[4..].to_vec());
    assert_eq!(array.size(), 4);
    // Clearing keeps the page and the touched range.
    assert_eq!(array.pages(), 2);
    assert_eq!(array.high(), Some(992));
    array.check_invariants_detailed().unwrap();
}

#[test]
fn test_bulk_write_across_pages() {
    init_logging();
    let mut array = SparseArray::with_page_size(1, 128).unwrap();
    assert_eq!(array.elem_num(), 68);

    let bytes: Vec<u8> = (0..200u8).collect();
    array.put_many(60, &bytes, 200).unwrap();
    assert_eq!(array.size(), 200);
    assert_eq!(array.pages(), 4);

    let mut out = vec![0u8; 200];
    array.get_many(60, &mut out, 200).unwrap();
    assert_eq!(out, bytes);

    // The gap at 260 stops the read after copying what came before.
    let mut out = vec![0u8; 3];
    let err = array.get_many(258, &mut out, 3).unwrap_err();
    assert_eq!(err, ContainerError::UninitializedElement(260));
    assert_eq!(&out[..2], &[198, 199]);
}

#[test]
fn test_array_rejects_bad_buffers() {
    init_logging();
    let mut array = SparseArray::new(4).unwrap();
    assert!(matches!(
        array.put(0, &[1, 2, 3]),
        Err(ContainerError::InvalidArgument(_))
    ));
    assert!(matches!(
        array.put(u64::MAX, &[0; 4]),
        Err(ContainerError::IndexOverflow(_))
    ));
    assert!(array.is_empty());
    assert_eq!(array.pages(), 0);
}

#[test]
fn test_array_from_config() {
    init_logging();
    let array = SparseArray::from_config(
        ArrayConfig::new(16)
            .with_page_size(512)
            .with_endian(Endian::Big),
    )
    .unwrap();
    assert_eq!(array.page_size(), 512);
    assert_eq!(array.endian(), Endian::Big);
    assert!(SparseArray::with_page_size(4, 1000).is_err());
    assert!(SparseArray::new(0).is_err());
}

#[test]
fn test_vector_growth_and_shrink() {
    init_logging();
    let mut vector = PagedVector::with_page_size("grow", 4, 128).unwrap();
    assert_eq!(vector.elem_num(), 20);

    vector.resize(45).unwrap();
    assert_eq!(vector.pages(), 3);
    for i in 0..45u64 {
        vector.put_u32(i, i as u32 + 1).unwrap();
    }

    vector.resize(21).unwrap();
    assert_eq!(vector.pages(), 2);
    assert_eq!(vector.get_u32(20).unwrap(), 21);

    // Shrinking zeroes the dropped tail of the last kept page.
    vector.resize(15).unwrap();
    vector.resize(20).unwrap();
    assert_eq!(vector.get_u32(14).unwrap(), 15);
    assert_eq!(vector.get_u32(15).unwrap(), 0);
    assert_eq!(vector.get_u32(19).unwrap(), 0);

    assert!(matches!(
        vector.get_u32(20),
        Err(ContainerError::IndexOutOfBounds(_))
    ));
    vector.check_invariants_detailed().unwrap();

    vector.resize(0).unwrap();
    assert!(vector.is_empty());
    assert_eq!(vector.pages(), 0);
}

#[test]
fn test_vector_iteration() {
    init_logging();
    let mut vector = PagedVector::with_page_size("iter", 8, 128).unwrap();
    vector.resize(25).unwrap();
    for i in 0..25u64 {
        vector.put_u64(i, i * i).unwrap();
    }

    let it = vector.iter();
    assert_eq!(it.len(), 25);
    let values: Vec<u64> = vector
        .iter()
        .map(|(_, bytes)| u64::from_ne_bytes(bytes.try_into().unwrap()))
        .collect();
    assert_eq!(values, (0..25u64).map(|i| i * i).collect::<Vec<_>>());

    let last: Vec<u64> = vector.iter_rev().take(3).map(|(i, _)| i).collect();
    assert_eq!(last, vec![24, 23, 22]);

    let mut it = vector.iter();
    it.inc(12);
    assert_eq!(it.index(), Some(12));
    assert_eq!(it.elem(), Some(&144u64.to_ne_bytes()[..]));
}

#[test]
fn test_vector_config_and_names() {
    init_logging();
    let vector = PagedVector::from_config(VectorConfig::new("named", 2)).unwrap();
    assert_eq!(vector.name(), "named");
    assert_eq!(vector.page_size(), DEFAULT_PAGE_SIZE);
    assert!(PagedVector::new(&"x".repeat(41), 2).is_err());
    assert!(PagedVector::new(&"x".repeat(40), 2).is_ok());
}

#[test]
fn test_recommended_page_size_fits_elements() {
    for elem_size in [1usize, 8, 100, 2048] {
        let page_size = recommended_page_size(elem_size);
        assert!(page_size.is_power_of_two());
        let array = SparseArray::with_page_size(elem_size, page_size).unwrap();
        assert!(array.elem_num() >= 1);
    }
}
