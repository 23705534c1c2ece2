//! Bounded output cursor and reversed digit scratch.

/// Returned when a unit does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full;

/// Cursor over a caller-supplied UTF-16 buffer.
///
/// At most `capacity - 1` units are written; the last slot is reserved for
/// the NUL terminator written by [`BoundedWriter::finish`].
#[derive(Debug)]
pub struct BoundedWriter<'a> {
    buf: &'a mut [u16],
    len: usize,
    limit: usize,
    capacity: usize,
}

impl<'a> BoundedWriter<'a> {
    /// Writer over the first `capacity` units of `buf` (clamped to its
    /// length).
    pub fn new(buf: &'a mut [u16], capacity: usize) -> Self {
        let capacity = capacity.min(buf.len());
        Self {
            buf,
            len: 0,
            limit: capacity.saturating_sub(1),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Units that can still be written before the terminator slot.
    pub fn room(&self) -> usize {
        self.limit - self.len
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.limit
    }

    /// String and numeric copies keep two units in reserve.
    pub fn has_margin(&self) -> bool {
        self.room() > 2
    }

    pub fn put(&mut self, unit: u16) -> Result<(), Full> {
        if self.is_full() {
            return Err(Full);
        }
        self.buf[self.len] = unit;
        self.len += 1;
        Ok(())
    }

    pub fn put_all(&mut self, units: &[u16]) -> Result<(), Full> {
        units.iter().try_for_each(|&unit| self.put(unit))
    }

    /// NUL-terminate (when there is any capacity) and return the number of
    /// units written.
    pub fn finish(self) -> usize {
        if self.capacity > 0 {
            self.buf[self.len] = 0;
        }
        self.len
    }
}

/// Fixed scratch filled from the back, used for numeric digits.
#[derive(Debug, Clone)]
pub struct Scratch<const N: usize> {
    slots: [u16; N],
    start: usize,
}

impl<const N: usize> Default for Scratch<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Scratch<N> {
    pub const fn new() -> Self {
        Self {
            slots: [0; N],
            start: N,
        }
    }

    /// Prepend a unit. Returns false (and drops it) when full.
    pub fn push_front(&mut self, unit: u16) -> bool {
        if self.start == 0 {
            return false;
        }
        self.start -= 1;
        self.slots[self.start] = unit;
        true
    }

    pub fn len(&self) -> usize {
        N - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == N
    }

    pub fn is_full(&self) -> bool {
        self.start == 0
    }

    /// The used suffix, in reading order.
    pub fn as_slice(&self) -> &[u16] {
        &self.slots[self.start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_reserves_terminator() {
        let mut buf = [0xffffu16; 4];
        let mut w = BoundedWriter::new(&mut buf, 4);
        assert_eq!(w.put_all(&[1, 2, 3]), Ok(()));
        assert!(w.is_full());
        assert_eq!(w.put(4), Err(Full));
        assert_eq!(w.finish(), 3);
        assert_eq!(buf, [1, 2, 3, 0]);
    }

    #[test]
    fn zero_capacity_writes_nothing() {
        let mut buf = [7u16; 2];
        let w = BoundedWriter::new(&mut buf, 0);
        assert!(w.is_full());
        assert_eq!(w.finish(), 0);
        assert_eq!(buf, [7, 7]);
    }

    #[test]
    fn capacity_clamped_to_slice() {
        let mut buf = [0u16; 2];
        let w = BoundedWriter::new(&mut buf, 100);
        assert_eq!(w.room(), 1);
    }

    #[test]
    fn margin_needs_three_free_units() {
        let mut buf = [0u16; 5];
        let mut w = BoundedWriter::new(&mut buf, 5);
        w.put(b'a' as u16).unwrap();
        assert!(w.has_margin());
        w.put(b'b' as u16).unwrap();
        assert!(!w.has_margin());
    }

    #[test]
    fn scratch_fills_backwards() {
        let mut s = Scratch::<3>::new();
        assert!(s.is_empty());
        assert!(s.push_front(3));
        assert!(s.push_front(2));
        assert!(s.push_front(1));
        assert!(!s.push_front(0));
        assert!(s.is_full());
        assert_eq!(s.as_slice(), &[1, 2, 3]);
    }
}
