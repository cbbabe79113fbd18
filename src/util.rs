use crate::eraftpb::Entry;

/// Get the approximate size of entry.
#[inline]
pub fn entry_approximate_size(e: &Entry) -> usize {
    // Index and term are 8 bytes each, the rest is the two payloads.
    e.data.len() + e.context.len() + 16
}

#[cfg(test)]
mod test {
    use super::entry_approximate_size;
    use crate::eraftpb::Entry;

    #[test]
    fn test_entry_approximate_size() {
        let mut e = Entry::new(5, 1);
        assert_eq!(entry_approximate_size(&e), 16);
        e.data = b"hello".to_vec().into();
        e.context = b"ctx".to_vec().into();
        assert_eq!(entry_approximate_size(&e), 24);
    }
}
