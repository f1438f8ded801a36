// Path: crates/crypto/src/secret.rs
//! An owning byte container that zeroizes on release.

use zeroize::{Zeroize, Zeroizing};

/// Owning container for secret bytes.
///
/// The bytes are overwritten with zeros on drop, and [`wipe`](Self::wipe)
/// may be called earlier on any exit path that no longer needs them.
/// There is no way to print the contents: `Debug` is redacted and no
/// `Display` exists.
#[derive(Default)]
pub struct SecretBuffer {
    bytes: Vec<u8>,
}

impl SecretBuffer {
    /// Takes ownership of `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Moves the contents of a `Zeroizing` vector in without copying.
    pub fn from_zeroizing(mut bytes: Zeroizing<Vec<u8>>) -> Self {
        Self {
            bytes: std::mem::take(&mut *bytes),
        }
    }

    /// Read-only view of the bytes. Empty after a wipe.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when nothing is held (including after a wipe).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Overwrites the bytes with zeros and releases them now rather than
    /// at drop time.
    pub fn wipe(&mut self) {
        self.bytes.zeroize();
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBuffer({} bytes)", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wipe_clears_contents() {
        let mut buf = SecretBuffer::new(vec![0xAB; 64]);
        assert_eq!(buf.len(), 64);
        buf.wipe();
        assert!(buf.is_empty());
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn debug_never_prints_bytes() {
        let buf = SecretBuffer::new(b"super secret".to_vec());
        let rendered = format!("{:?}", buf);
        assert!(!rendered.contains("super"));
        assert_eq!(rendered, "SecretBuffer(12 bytes)");
    }

    #[test]
    fn from_zeroizing_moves_without_copy() {
        let src = Zeroizing::new(vec![1, 2, 3]);
        let buf = SecretBuffer::from_zeroizing(src);
        assert_eq!(buf.as_slice(), &[1, 2, 3]);
    }
}
