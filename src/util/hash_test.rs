use super::*;

#[test]
fn base32_round_trips() {
    for input in [&b""[..], b"a", b"ab", b"abc", b"abcd", b"abcde", b"hello world"] {
        let encoded = base32_encode(input);
        let decoded = base32_decode(&encoded).unwrap();
        assert_eq!(decoded, input);
    }
}

#[test]
fn sha256_is_deterministic() {
    let a = sha256_base32(b"fluree");
    let b = sha256_base32(b"fluree");
    assert_eq!(a, b);
    let c = sha256_base32(b"flureex");
    assert_ne!(a, c);
}

#[test]
fn fnv1a_is_deterministic_and_sensitive_to_input() {
    assert_eq!(fnv1a(b"segment-1"), fnv1a(b"segment-1"));
    assert_ne!(fnv1a(b"segment-1"), fnv1a(b"segment-2"));
}
