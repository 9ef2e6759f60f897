//! Rolling frame sequence numbers

/// Monotonically increasing 8-bit sequence counter shared by all domains.
///
/// Wraps from 255 to 0. The engine skips numbers still held by AREQs that
/// await a reply, so outstanding AREQs never share one.
#[derive(Debug, Clone, Default)]
pub struct SequenceGenerator {
    next: u8,
}

impl SequenceGenerator {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Start counting from `first`
    pub const fn starting_at(first: u8) -> Self {
        Self { next: first }
    }

    /// Returns the current number and advances the counter
    pub fn next_sequence(&mut self) -> u8 {
        let seq = self.next;
        self.next = self.next.wrapping_add(1);
        seq
    }

    /// The number the next call will return
    pub const fn peek(&self) -> u8 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_after_255() {
        let mut seq = SequenceGenerator::starting_at(254);
        assert_eq!(seq.next_sequence(), 254);
        assert_eq!(seq.next_sequence(), 255);
        assert_eq!(seq.next_sequence(), 0);
        assert_eq!(seq.peek(), 1);
    }
}
