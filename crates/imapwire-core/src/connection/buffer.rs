//! Pending output for a command that has not been committed yet

/// Bytes queued by `write(.., false)` calls since the last flush
#[derive(Debug, Default)]
pub struct OutputBuffer {
    pending: Vec<u8>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    /// Take the queued bytes, leaving the buffer empty
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_take() {
        let mut buffer = OutputBuffer::new();
        buffer.push(b"1 ");
        buffer.push(b"");
        buffer.push(b"SELECT INBOX");
        assert_eq!(buffer.as_bytes(), b"1 SELECT INBOX");

        assert_eq!(buffer.take(), b"1 SELECT INBOX".to_vec());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut buffer = OutputBuffer::new();
        buffer.push(b"stale");
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
