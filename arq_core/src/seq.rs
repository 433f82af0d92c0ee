//! Modular sequence number arithmetic.

/// A sequence number space of `modulus` values with a window of `window`.
///
/// All numbers live in `[0, modulus)`. Anything at or above the modulus
/// (for example a header overwritten by the channel) has no offset and is
/// never inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
    window: u32,
    modulus: u32,
}

impl SeqSpace {
    /// Creates a sequence space.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero or `modulus <= window`; use
    /// [`ProtocolConfig::validate`](crate::ProtocolConfig::validate) first.
    pub fn new(window: u32, modulus: u32) -> Self {
        assert!(window >= 1, "window must be at least 1");
        assert!(modulus > window, "modulus must exceed the window");
        Self { window, modulus }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// `seq + n` wrapped into the space.
    #[inline]
    pub fn advance(&self, seq: u32, n: u64) -> u32 {
        ((u64::from(seq) + n) % u64::from(self.modulus)) as u32
    }

    /// Distance from `base` forward to `seq`, or `None` if either number is
    /// outside the space.
    #[inline]
    pub fn offset(&self, base: u32, seq: u32) -> Option<u32> {
        if seq >= self.modulus || base >= self.modulus {
            return None;
        }
        Some((seq + (self.modulus - base)) % self.modulus)
    }

    /// Offset of `seq` if it lies within `[base, base + len)`.
    pub fn in_range(&self, base: u32, len: u32, seq: u32) -> Option<u32> {
        self.offset(base, seq).filter(|offset| *offset < len)
    }

    /// Offset of `seq` if it lies within the window starting at `base`.
    pub fn in_window(&self, base: u32, seq: u32) -> Option<u32> {
        self.in_range(base, self.window, seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps() {
        let space = SeqSpace::new(10, 11);
        assert_eq!(space.advance(0, 1), 1);
        assert_eq!(space.advance(10, 1), 0);
        assert_eq!(space.advance(7, 15), 0);
    }

    #[test]
    fn test_offset_across_wrap() {
        let space = SeqSpace::new(10, 11);
        assert_eq!(space.offset(9, 9), Some(0));
        assert_eq!(space.offset(9, 2), Some(4));
        assert_eq!(space.offset(3, 2), Some(10));
    }

    #[test]
    fn test_window_excludes_only_previous_number() {
        // modulus = window + 1: exactly one number sits outside the window
        let space = SeqSpace::new(10, 11);
        let outside: Vec<u32> = (0..11).filter(|s| space.in_window(5, *s).is_none()).collect();
        assert_eq!(outside, vec![4]);
    }

    #[test]
    fn test_sentinel_is_never_in_range() {
        let space = SeqSpace::new(10, 11);
        assert_eq!(space.offset(0, 999_999), None);
        assert_eq!(space.in_range(0, 10, 11), None);
    }

    #[test]
    fn test_in_range_limits_length() {
        let space = SeqSpace::new(4, 8);
        assert_eq!(space.in_range(6, 3, 0), Some(2));
        assert_eq!(space.in_range(6, 3, 1), None);
        assert_eq!(space.in_range(6, 0, 6), None);
    }
}
