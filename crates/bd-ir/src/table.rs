//! Read-only 8-bit sample tables.

use arrayvec::ArrayString;
use heapless::Vec;

/// Unsigned midpoint of an 8-bit table; subtracting it yields the signed sample.
pub const CENTER: u8 = 127;

/// Capacity of a single table, in bytes.
pub const MAX_TABLE_LEN: usize = 8192;

/// An owned 8-bit unsigned sample table, centred on [`CENTER`].
#[derive(Clone, Debug, Default)]
pub struct Table {
    /// Display name (file stem or built-in voice name)
    pub name: ArrayString<24>,
    /// Sample bytes
    pub data: Vec<u8, MAX_TABLE_LEN>,
}

impl Table {
    /// Create a table from raw bytes. Bytes beyond [`MAX_TABLE_LEN`] are
    /// dropped; names longer than the name buffer are truncated.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Self {
        let mut table = Self::default();
        for ch in name.chars() {
            if table.name.try_push(ch).is_err() {
                break;
            }
        }
        let take = bytes.len().min(MAX_TABLE_LEN);
        let _ = table.data.extend_from_slice(&bytes[..take]);
        table
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the table as a voice-facing view.
    pub fn view(&self) -> TableRef<'_> {
        TableRef::new(&self.data)
    }
}

/// A borrowed table view shared by voices.
///
/// `length()` is the last readable index, not the byte count, so both
/// `read(index)` and `read(length() - index)` stay in bounds for any
/// `index <= length()`.
#[derive(Clone, Copy, Debug)]
pub struct TableRef<'t> {
    data: &'t [u8],
}

impl<'t> TableRef<'t> {
    pub const fn new(data: &'t [u8]) -> Self {
        Self { data }
    }

    /// Last readable index. Zero for empty and single-byte tables.
    pub fn length(&self) -> u16 {
        self.data.len().saturating_sub(1).min(u16::MAX as usize) as u16
    }

    /// Raw byte at `index`, or [`CENTER`] outside the table.
    #[inline]
    pub fn read(&self, index: u16) -> u8 {
        self.data.get(index as usize).copied().unwrap_or(CENTER)
    }

    /// Byte at the mirrored position `length() - index`.
    #[inline]
    pub fn mirror(&self, index: u16) -> u8 {
        match self.length().checked_sub(index) {
            Some(i) => self.read(i),
            None => CENTER,
        }
    }

    pub fn bytes(&self) -> &'t [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_last_index() {
        let t = Table::from_bytes("t", &[1, 2, 3, 4]);
        assert_eq!(t.view().length(), 3);
        assert_eq!(TableRef::new(&[]).length(), 0);
    }

    #[test]
    fn read_out_of_range_is_center() {
        let t = Table::from_bytes("t", &[10, 20]);
        assert_eq!(t.view().read(1), 20);
        assert_eq!(t.view().read(2), CENTER);
        assert_eq!(TableRef::new(&[]).read(0), CENTER);
    }

    #[test]
    fn mirror_is_symmetric() {
        let bytes = [5u8, 6, 7, 8, 9];
        let t = TableRef::new(&bytes);
        for i in 0..=t.length() {
            assert_eq!(t.mirror(i), t.read(t.length() - i));
        }
        assert_eq!(t.mirror(0), 9);
        assert_eq!(t.mirror(4), 5);
    }

    #[test]
    fn oversize_input_is_truncated() {
        let big = [127u8; MAX_TABLE_LEN + 10];
        let t = Table::from_bytes("a-very-long-table-name-that-overflows", &big);
        assert_eq!(t.len(), MAX_TABLE_LEN);
        assert_eq!(t.name.len(), 24);
    }
}
