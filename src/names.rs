use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use unicode_normalization::UnicodeNormalization;

/// Name prefix of auxiliary "fork" entries (AppleDouble resource forks).
pub const FORK_PREFIX: &[u8] = b"._";

/// Whether `name` is a fork entry.
pub fn is_fork(name: &OsStr) -> bool {
    name.as_bytes().starts_with(FORK_PREFIX)
}

/// Comparison key for a raw filename.
///
/// Keys compare bytewise, which gives the merge-join its lexicographic order.
/// With `normalize`, valid UTF-8 names are canonically decomposed (NFD) first
/// so NFC and NFD spellings of the same name produce the same key. Names that
/// are not valid UTF-8 cannot be normalized and are used as-is.
pub fn name_key(name: &OsStr, normalize: bool) -> Vec<u8> {
    if normalize {
        if let Some(s) = name.to_str() {
            return s.nfd().collect::<String>().into_bytes();
        }
    }
    name.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NFC: &str = "caf\u{e9}";
    const NFD: &str = "cafe\u{301}";

    #[test]
    fn fork_prefix() {
        assert!(is_fork(OsStr::new("._foo")));
        assert!(is_fork(OsStr::new("._")));
        assert!(!is_fork(OsStr::new(".foo")));
        assert!(!is_fork(OsStr::new("foo._")));
    }

    #[test]
    fn canonically_equivalent_names_share_a_key_when_normalizing() {
        assert_ne!(NFC.as_bytes(), NFD.as_bytes());
        assert_eq!(
            name_key(OsStr::new(NFC), true),
            name_key(OsStr::new(NFD), true)
        );
    }

    #[test]
    fn raw_bytes_without_normalizing() {
        assert_ne!(
            name_key(OsStr::new(NFC), false),
            name_key(OsStr::new(NFD), false)
        );
        assert_eq!(name_key(OsStr::new(NFC), false), NFC.as_bytes());
    }

    #[test]
    fn invalid_utf8_passes_through() {
        let raw = OsStr::from_bytes(b"bad\xffname");
        assert_eq!(name_key(raw, true), b"bad\xffname".to_vec());
    }

    #[test]
    fn keys_order_bytewise() {
        let mut keys = vec![
            name_key(OsStr::new("b"), false),
            name_key(OsStr::new("B"), false),
            name_key(OsStr::new("a.txt"), false),
        ];
        keys.sort();
        assert_eq!(keys, vec![b"B".to_vec(), b"a.txt".to_vec(), b"b".to_vec()]);
    }
}
