use futures::Stream;
use futures::io::{AsyncRead, AsyncReadExt};
use futures::stream;
use std::io::Result as IoResult;

/// Reads `reader` to the end as a stream of owned chunks of at most
/// `chunk_size` bytes. The stream ends after the first zero-length read.
pub fn into_chunks<R>(reader: R, chunk_size: usize) -> impl Stream<Item = IoResult<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let chunk_size = chunk_size.max(1);
    stream::try_unfold(reader, move |mut reader| async move {
        let mut buf = vec![0u8; chunk_size];
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        Ok(Some((buf, reader)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use futures::io::Cursor;

    #[tokio::test]
    async fn test_splits_into_chunks() {
        let data: Vec<u8> = (0..25).collect();
        let chunks: Vec<Vec<u8>> = into_chunks(Cursor::new(data.clone()), 10).try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 5);
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn test_empty_reader_yields_nothing() {
        let chunks: Vec<Vec<u8>> = into_chunks(Cursor::new(Vec::new()), 10).try_collect().await.unwrap();
        assert!(chunks.is_empty());
    }
}
