use paged_containers::{
    ChannelTransport, ContainerError, ContainerHeader, ContainerKind, Endian, PagedVector,
    SparseArray, Transport, PAGE_HEADER_SIZE,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample_array(endian: Endian) -> SparseArray {
    let mut array = SparseArray::with_page_size(4, 256).unwrap();
    array.set_endian(endian);
    for index in [3u64, 4, 90, 1_000, 123_456] {
        array.put_u32(index, index as u32 ^ 0xdead_beef).unwrap();
    }
    array
}

fn sample_vector(endian: Endian) -> PagedVector {
    let mut vector = PagedVector::with_page_size("samples", 8, 256).unwrap();
    vector.set_endian(endian);
    vector.resize(77).unwrap();
    for i in 0..77u64 {
        vector.put_u64(i, i.wrapping_mul(0x9e37_79b9_7f4a_7c15)).unwrap();
    }
    vector
}

fn array_contents(array: &SparseArray) -> Vec<(u64, Vec<u8>)> {
    array.iter().map(|(i, bytes)| (i, bytes.to_vec())).collect()
}

fn vector_contents(vector: &PagedVector) -> Vec<Vec<u8>> {
    vector.iter().map(|(_, bytes)| bytes.to_vec()).collect()
}

#[test]
fn test_array_round_trip_both_byte_orders() {
    init_logging();
    for endian in [Endian::Little, Endian::Big] {
        let array = sample_array(endian);
        let mut saved = Vec::new();
        array.save(&mut saved).unwrap();

        let page_len = ContainerKind::Array.page_len(array.geometry());
        assert_eq!(
            saved.len(),
            ContainerHeader::encoded_len(ContainerKind::Array) + array.pages() * page_len
        );
        assert_eq!(&saved[..4], b"ARRY");

        let loaded = SparseArray::load(&saved[..]).unwrap();
        assert_eq!(loaded.endian(), endian);
        assert_eq!(loaded.size(), array.size());
        assert_eq!(loaded.low(), array.low());
        assert_eq!(loaded.high(), array.high());
        assert_eq!(loaded.elem_num(), array.elem_num());
        assert_eq!(array_contents(&loaded), array_contents(&array));
        loaded.check_invariants_detailed().unwrap();
    }
}

#[test]
fn test_byte_order_changes_header_encoding() {
    init_logging();
    let mut little = Vec::new();
    let mut big = Vec::new();
    sample_vector(Endian::Little).save(&mut little).unwrap();
    sample_vector(Endian::Big).save(&mut big).unwrap();

    assert_eq!(little.len(), big.len());
    assert_ne!(little, big);
    assert_eq!(little[7], 0b01);
    assert_eq!(big[7], 0b10);
    // page_size (256) follows the 48 identification and name bytes.
    assert_eq!(&little[48..56], &256u64.to_le_bytes());
    assert_eq!(&big[48..56], &256u64.to_be_bytes());
}

#[test]
fn test_vector_round_trip() {
    init_logging();
    for endian in [Endian::Little, Endian::Big] {
        let vector = sample_vector(endian);
        let mut saved = Vec::new();
        vector.save(&mut saved).unwrap();
        assert_eq!(&saved[..4], b"VCTR");

        let mut loaded = PagedVector::load(&saved[..]).unwrap();
        assert_eq!(loaded.name(), "samples");
        assert_eq!(loaded.size(), 77);
        assert_eq!(loaded.pages(), vector.pages());
        assert_eq!(vector_contents(&loaded), vector_contents(&vector));
        assert_eq!(loaded.get_u64(76).unwrap(), 76u64.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        loaded.check_invariants_detailed().unwrap();
    }
}

#[test]
fn test_empty_containers_round_trip() {
    init_logging();
    let array = SparseArray::new(2).unwrap();
    let mut saved = Vec::new();
    array.save(&mut saved).unwrap();
    assert_eq!(saved.len(), ContainerHeader::encoded_len(ContainerKind::Array));
    let loaded = SparseArray::load(&saved[..]).unwrap();
    assert!(loaded.is_empty());
    assert_eq!(loaded.low(), None);

    let vector = PagedVector::new("", 2).unwrap();
    let mut saved = Vec::new();
    vector.save(&mut saved).unwrap();
    let loaded = PagedVector::load(&saved[..]).unwrap();
    assert_eq!(loaded.size(), 0);
    assert_eq!(loaded.name(), "");
}

#[test]
fn test_load_rejects_wrong_kind() {
    init_logging();
    let mut saved = Vec::new();
    sample_vector(Endian::Little).save(&mut saved).unwrap();
    assert!(matches!(
        SparseArray::load(&saved[..]),
        Err(ContainerError::TagMismatch(_))
    ));
}

#[test]
fn test_load_rejects_bad_identification() {
    init_logging();
    let mut saved = Vec::new();
    sample_array(Endian::Little).save(&mut saved).unwrap();

    let mut newer = saved.clone();
    newer[4] = 2;
    assert!(matches!(
        SparseArray::load(&newer[..]),
        Err(ContainerError::CorruptedData(_))
    ));

    let mut no_order = saved.clone();
    no_order[7] = 0;
    assert!(matches!(
        SparseArray::load(&no_order[..]),
        Err(ContainerError::CorruptedData(_))
    ));

    let mut bad_page = saved.clone();
    bad_page[ContainerHeader::encoded_len(ContainerKind::Array)] ^= 0xff;
    assert!(matches!(
        SparseArray::load(&bad_page[..]),
        Err(ContainerError::TagMismatch(_))
    ));
}

#[test]
fn test_load_rejects_truncated_stream() {
    init_logging();
    let mut saved = Vec::new();
    sample_array(Endian::Big).save(&mut saved).unwrap();

    for cut in [10, ContainerHeader::encoded_len(ContainerKind::Array) + 5, saved.len() - 1] {
        let err = SparseArray::load(&saved[..cut]).unwrap_err();
        assert!(err.is_eof(), "cut at {}: {}", cut, err);
    }
}

#[test]
fn test_load_rejects_inconsistent_size() {
    init_logging();
    let mut saved = Vec::new();
    sample_vector(Endian::Little).save(&mut saved).unwrap();
    // size field sits after page_size, page_count, elem_size and elem_num.
    saved[80..88].copy_from_slice(&500u64.to_le_bytes());
    assert!(matches!(
        PagedVector::load(&saved[..]),
        Err(ContainerError::CorruptedData(_))
    ));
}

#[test]
fn test_load_zeroes_bytes_past_logical_end() {
    init_logging();
    let mut vector = PagedVector::with_page_size("tail", 1, 128).unwrap();
    vector.set_endian(Endian::Little);
    vector.resize(10).unwrap();
    let values: Vec<u8> = (1..=10).collect();
    vector.put_many(0, &values, 10).unwrap();

    let mut saved = Vec::new();
    vector.save(&mut saved).unwrap();
    let data = ContainerHeader::encoded_len(ContainerKind::Vector) + PAGE_HEADER_SIZE;
    saved[data + 20] = 0xab;

    let mut loaded = PagedVector::load(&saved[..]).unwrap();
    loaded.validate().unwrap();
    loaded.resize(30).unwrap();
    assert_eq!(loaded.get_u8(20).unwrap(), 0);
    assert_eq!(loaded.get_u8(9).unwrap(), 10);
}

#[test]
fn test_load_widens_range_to_cover_initialized_elements() {
    init_logging();
    let mut array = SparseArray::with_page_size(4, 256).unwrap();
    array.set_endian(Endian::Little);
    array.put_u32(5, 55).unwrap();
    let mut saved = Vec::new();
    array.save(&mut saved).unwrap();

    // low and high follow the vector-shaped part of the header.
    let low = ContainerHeader::encoded_len(ContainerKind::Vector);
    let rewrite = |low_bound: u64, high_bound: u64| {
        let mut patched = saved.clone();
        patched[low..low + 8].copy_from_slice(&low_bound.to_le_bytes());
        patched[low + 8..low + 16].copy_from_slice(&high_bound.to_le_bytes());
        SparseArray::load(&patched[..]).unwrap()
    };

    let loaded = rewrite(6, 6);
    assert_eq!((loaded.low(), loaded.high()), (Some(5), Some(6)));
    assert_eq!(loaded.capacity(), 2);
    loaded.validate().unwrap();

    let loaded = rewrite(0, 2);
    assert_eq!((loaded.low(), loaded.high()), (Some(0), Some(5)));
    loaded.validate().unwrap();

    // A wider stored range is kept as is.
    let loaded = rewrite(1, 40);
    assert_eq!((loaded.low(), loaded.high()), (Some(1), Some(40)));
}

#[test]
fn test_transport_round_trip() {
    init_logging();
    let (mut left, mut right) = ChannelTransport::pair();

    let array = sample_array(Endian::Big);
    array.send(&mut left).unwrap();
    assert_eq!(right.pending(), array.pages() + 1);
    let received = SparseArray::receive(&mut right).unwrap();
    assert_eq!(right.pending(), 0);
    assert_eq!(array_contents(&received), array_contents(&array));
    assert_eq!(received.high(), array.high());

    let vector = sample_vector(Endian::Little);
    vector.send(&mut right).unwrap();
    let received = PagedVector::receive(&mut left).unwrap();
    assert_eq!(received.name(), vector.name());
    assert_eq!(vector_contents(&received), vector_contents(&vector));
}

#[test]
fn test_transport_matches_stream_layout() {
    init_logging();
    let vector = sample_vector(Endian::Little);
    let mut saved = Vec::new();
    vector.save(&mut saved).unwrap();

    let (mut left, mut right) = ChannelTransport::pair();
    vector.send(&mut left).unwrap();
    let mut concatenated = Vec::new();
    while right.pending() > 0 {
        concatenated.extend(right.receive().unwrap());
    }
    assert_eq!(concatenated, saved);
}

#[test]
fn test_transport_limit_and_missing_pages() {
    init_logging();
    let (mut left, _right) = ChannelTransport::pair_with_limit(128);
    let err = sample_vector(Endian::Little).send(&mut left).unwrap_err();
    assert!(matches!(err, ContainerError::InvalidArgument(_)));

    // A header promising pages that never arrive.
    let (mut left, mut right) = ChannelTransport::pair();
    let vector = sample_vector(Endian::Little);
    vector.send(&mut left).unwrap();
    let header = right.receive().unwrap();
    while right.pending() > 0 {
        right.receive().unwrap();
    }
    left.send(&header).unwrap();
    let err = PagedVector::receive(&mut right).unwrap_err();
    assert!(err.is_eof());
}
