use rand::Rng;

/// Characters a generated name segment is made of.
///
/// Lowercase letters and digits keep the segment valid inside namespace, release and pod names.
const NAME_SEGMENT_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a generated name segment.
pub const NAME_SEGMENT_LEN: usize = 5;

/// Generates a random lowercase alphanumeric name segment of [`NAME_SEGMENT_LEN`] characters.
///
/// Segments are only statistically unique: two units of a batch could draw the same segment, so
/// callers combine several segments with prefixes to build names.
pub fn random_name_segment() -> String {
    let mut rng = rand::rng();
    (0..NAME_SEGMENT_LEN)
        .map(|_| NAME_SEGMENT_CHARSET[rng.random_range(0..NAME_SEGMENT_CHARSET.len())] as char)
        .collect()
}

/// Joins a prefix and a generated segment the way every generated name is built.
pub fn with_random_suffix(prefix: &str) -> String {
    format!("{prefix}-{}", random_name_segment())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn segment_is_short_lowercase_alphanumeric() {
        for _ in 0..100 {
            let segment = random_name_segment();
            assert_eq!(segment.len(), NAME_SEGMENT_LEN);
            assert!(
                segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            );
        }
    }

    #[test]
    fn segments_rarely_collide() {
        let segments: HashSet<_> = (0..200).map(|_| random_name_segment()).collect();
        // 36^5 possible segments, a handful of collisions would already be suspicious.
        assert!(segments.len() >= 195);
    }

    #[test]
    fn suffix_is_joined_with_dash() {
        let name = with_random_suffix("vcluster");
        assert!(name.starts_with("vcluster-"));
        assert_eq!(name.len(), "vcluster-".len() + NAME_SEGMENT_LEN);
    }
}
