//! Line framing shared by both transports.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest accepted request line. Bytes past the cap are dropped until
/// the terminator so an oversized line cannot grow the buffer.
pub const MAX_LINE: usize = 256;

/// Read one newline-terminated line, tolerating CRLF endings.
///
/// Returns `Ok(None)` when the stream ends before a terminator arrives;
/// a partial line at EOF has no sender left to answer.
pub async fn read_line<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte).await? == 0 {
            return Ok(None);
        }
        match byte[0] {
            b'\n' => break,
            b'\r' => {}
            other => {
                if buf.len() < MAX_LINE {
                    buf.push(other);
                }
            }
        }
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_single_line() {
        let mut input: &[u8] = b"adc\n";
        assert_eq!(read_line(&mut input).await.unwrap(), Some("adc".to_string()));
    }

    #[tokio::test]
    async fn test_strips_carriage_return() {
        let mut input: &[u8] = b"adsGain=2\r\n";
        assert_eq!(
            read_line(&mut input).await.unwrap(),
            Some("adsGain=2".to_string())
        );
    }

    #[tokio::test]
    async fn test_sequential_lines() {
        let mut input: &[u8] = b"first\nsecond\n";
        assert_eq!(
            read_line(&mut input).await.unwrap(),
            Some("first".to_string())
        );
        assert_eq!(
            read_line(&mut input).await.unwrap(),
            Some("second".to_string())
        );
        assert_eq!(read_line(&mut input).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_eof_without_terminator_is_none() {
        let mut input: &[u8] = b"";
        assert_eq!(read_line(&mut input).await.unwrap(), None);

        let mut partial: &[u8] = b"dangling";
        assert_eq!(read_line(&mut partial).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_line_is_capped() {
        let mut raw = vec![b'a'; MAX_LINE + 100];
        raw.push(b'\n');
        let mut input: &[u8] = &raw;

        let line = read_line(&mut input).await.unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let mut input: &[u8] = b"ad\xffc\n";
        let line = read_line(&mut input).await.unwrap().unwrap();
        assert!(line.contains('\u{FFFD}'));
    }
}
