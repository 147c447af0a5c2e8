use parking_lot::Mutex;

use crate::error::{ClaimError, ClaimResult};

/// Local view of which remote indices are set.
///
/// Bit `i` lives in byte `i / 8`, most-significant bit first. Every operation
/// takes the lock once, so single-bit reads and writes are atomic; a `get`
/// followed by a `set` is not. Use [`BitSet::claim`] when the caller needs
/// test-and-set.
#[derive(Debug)]
pub struct BitSet {
    bytes: Mutex<Vec<u8>>,
    check_count: usize,
}

impl BitSet {
    /// Wraps decoded snapshot bytes. Fails when `bytes` cannot hold
    /// `check_count` bits.
    pub fn from_bytes(bytes: Vec<u8>, check_count: usize) -> ClaimResult<Self> {
        let capacity = bytes.len().saturating_mul(8);
        if capacity < check_count {
            return Err(ClaimError::Decode(format!(
                "snapshot holds {capacity} bits but claims {check_count} elements"
            )));
        }
        Ok(Self {
            bytes: Mutex::new(bytes),
            check_count,
        })
    }

    pub fn zeroed(check_count: usize) -> Self {
        Self {
            bytes: Mutex::new(vec![0; check_count.div_ceil(8)]),
            check_count,
        }
    }

    pub fn len(&self) -> usize {
        self.check_count
    }

    pub fn is_empty(&self) -> bool {
        self.check_count == 0
    }

    pub fn get(&self, index: usize) -> ClaimResult<bool> {
        let (byte, mask) = self.locate(index)?;
        Ok(self.bytes.lock()[byte] & mask != 0)
    }

    pub fn set(&self, index: usize, value: bool) -> ClaimResult<()> {
        let (byte, mask) = self.locate(index)?;
        let mut bytes = self.bytes.lock();
        if value {
            bytes[byte] |= mask;
        } else {
            bytes[byte] &= !mask;
        }
        Ok(())
    }

    /// Optimistically marks `index` as set.
    ///
    /// Returns `true` when the bit was clear, meaning the caller is now
    /// responsible for toggling it remotely. The mark is local only and is
    /// not rolled back if the toggle is never delivered; the next snapshot
    /// replaces it.
    pub fn claim(&self, index: usize) -> ClaimResult<bool> {
        let (byte, mask) = self.locate(index)?;
        let mut bytes = self.bytes.lock();
        let was_clear = bytes[byte] & mask == 0;
        bytes[byte] |= mask;
        Ok(was_clear)
    }

    /// Number of set bits within the logical range.
    pub fn count_set(&self) -> usize {
        let bytes = self.bytes.lock();
        let full = self.check_count / 8;
        let mut total: usize = bytes[..full].iter().map(|b| b.count_ones() as usize).sum();
        let tail = self.check_count % 8;
        if tail > 0 {
            let mask = !(0xffu8 >> tail);
            total += (bytes[full] & mask).count_ones() as usize;
        }
        total
    }

    fn locate(&self, index: usize) -> ClaimResult<(usize, u8)> {
        if index >= self.check_count {
            return Err(ClaimError::IndexOutOfRange {
                index,
                len: self.check_count,
            });
        }
        Ok((index / 8, 1u8 << (7 - (index % 8))))
    }
}
