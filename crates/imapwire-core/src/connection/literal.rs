//! Sources for outgoing literal payloads

use async_trait::async_trait;
use std::io::SeekFrom;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// A rewindable byte source that can be streamed as a literal.
///
/// `read_chunk` returning `Ok(0)` signals end of data.
#[async_trait]
pub trait LiteralSource: Send {
    /// Move back to the first byte
    async fn rewind(&mut self) -> std::io::Result<()>;

    /// Read up to `buf.len()` bytes
    async fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

// Covers file handles (`tokio::fs::File`) as well as in-memory
// `std::io::Cursor` wrappers.
#[async_trait]
impl<T> LiteralSource for T
where
    T: AsyncRead + AsyncSeek + Unpin + Send,
{
    async fn rewind(&mut self) -> std::io::Result<()> {
        self.seek(SeekFrom::Start(0)).await.map(|_| ())
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.read(buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn drain(source: &mut dyn LiteralSource) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = source.read_chunk(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[tokio::test]
    async fn test_cursor_rewinds() {
        let mut cursor = Cursor::new(b"hello world".to_vec());
        cursor.set_position(6);

        LiteralSource::rewind(&mut cursor).await.unwrap();
        assert_eq!(drain(&mut cursor).await, b"hello world".to_vec());

        LiteralSource::rewind(&mut cursor).await.unwrap();
        assert_eq!(drain(&mut cursor).await, b"hello world".to_vec());
    }

    #[tokio::test]
    async fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("message.eml");
        tokio::fs::write(&path, b"Subject: hi\r\n\r\nbody\0").await.unwrap();

        let mut file = tokio::fs::File::open(&path).await.unwrap();
        LiteralSource::rewind(&mut file).await.unwrap();
        assert_eq!(drain(&mut file).await, b"Subject: hi\r\n\r\nbody\0".to_vec());
    }
}
