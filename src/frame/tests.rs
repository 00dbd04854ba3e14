use super::codec::*;

const T: u64 = 1_700_000_000_123_456_789;

#[test]
fn test_encode_layout() {
    let frame = encode(b"img", T, "10.0.0.7").unwrap();
    assert_eq!(frame.len(), 3 + TRAILER_LEN);
    assert_eq!(&frame[..3], b"img");
    assert_eq!(&frame[3..23], b"01700000000123456789");
    assert_eq!(&frame[23..], b"-------10.0.0.7");
}

#[test]
fn test_decode_recovers_fields() {
    let frame = encode(b"payload bytes", T, "192.168.1.20").unwrap();
    match decode(&frame).unwrap() {
        Decoded::Work(work) => {
            assert_eq!(work.payload, b"payload bytes");
            assert_eq!(work.origin_ns, T);
            assert_eq!(work.timestamp_field, b"01700000000123456789");
            assert_eq!(work.reply_to, "192.168.1.20");
        }
        Decoded::Sentinel => panic!("expected a work frame"),
    }
}

#[test]
fn test_full_width_address_has_no_padding() {
    let addr = "192.168.100.200";
    assert_eq!(addr.len(), ADDRESS_WIDTH);
    let frame = encode(b"", 0, addr).unwrap();
    let Decoded::Work(work) = decode(&frame).unwrap() else {
        panic!("expected a work frame");
    };
    assert_eq!(work.reply_to, addr);
    assert!(work.payload.is_empty());
    assert_eq!(work.origin_ns, 0);
}

#[test]
fn test_sentinel() {
    assert_eq!(decode(SENTINEL).unwrap(), Decoded::Sentinel);
    assert_eq!(decode(b"2"), Err(FrameError::TooShort(1)));
}

#[test]
fn test_short_frame_is_rejected() {
    assert_eq!(decode(b"0123456789"), Err(FrameError::TooShort(10)));
    assert_eq!(decode(b""), Err(FrameError::TooShort(0)));
}

#[test]
fn test_bad_timestamp_is_rejected() {
    let mut frame = encode(b"x", T, "10.0.0.1").unwrap();
    frame[5] = b'a';
    assert_eq!(decode(&frame), Err(FrameError::InvalidTimestamp));

    // 20 digits but larger than u64::MAX
    let mut frame = b"x".to_vec();
    frame.extend_from_slice(b"99999999999999999999");
    frame.extend_from_slice(b"-------10.0.0.1");
    assert_eq!(decode(&frame), Err(FrameError::InvalidTimestamp));
}

#[test]
fn test_all_padding_address_is_rejected() {
    let mut frame = b"x".to_vec();
    frame.extend_from_slice(format!("{:020}", T).as_bytes());
    frame.extend_from_slice(&[b'-'; ADDRESS_WIDTH]);
    assert_eq!(decode(&frame), Err(FrameError::EmptyAddress));
}

#[test]
fn test_encode_rejects_bad_addresses() {
    assert_eq!(
        encode(b"x", T, "1234567890123456"),
        Err(FrameError::AddressTooLong("1234567890123456".to_string()))
    );
    assert_eq!(encode(b"x", T, ""), Err(FrameError::EmptyAddress));
    assert_eq!(encode(b"x", T, "-10.0.0.1"), Err(FrameError::InvalidAddress));
    assert_eq!(encode(b"x", T, "10.0 .0.1"), Err(FrameError::InvalidAddress));
}

#[test]
fn test_ack_echo() {
    let frame = encode(b"abc", T, "10.0.0.1").unwrap();
    let Decoded::Work(work) = decode(&frame).unwrap() else {
        panic!("expected a work frame");
    };

    let ack = encode_ack(None, work.timestamp_field);
    assert_eq!(ack.len(), TIMESTAMP_WIDTH);
    assert_eq!(decode_ack(&ack), Ok(T));

    let ack = encode_ack(Some("Hallo Welt".as_bytes()), work.timestamp_field);
    assert!(ack.starts_with(b"Hallo Welt"));
    assert_eq!(decode_ack(&ack), Ok(T));
}

#[test]
fn test_short_ack_is_rejected() {
    assert_eq!(decode_ack(b"123"), Err(FrameError::AckTooShort(3)));
}

#[test]
fn test_now_ns_is_nanosecond_epoch() {
    let now = super::now_ns();
    // nanosecond epoch timestamps have 19 digits until 2286
    assert_eq!(now.to_string().len(), 19);
}
