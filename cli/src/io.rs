use eyre::Result;
use tokio::fs::File;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt as _, AsyncReadExt as _, AsyncWrite, BufReader, BufWriter,
};

pub type Input = Box<dyn AsyncBufRead + Unpin + Send>;
pub type Output = Box<dyn AsyncWrite + Unpin + Send>;

/// Sample encodings accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
}

/// Opens a named input; "stdin" reads standard input.
pub async fn open(name: &str) -> Result<Input> {
    if name == "stdin" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let f = File::open(name)
        .await
        .map_err(|e| eyre::eyre!("open {}: {}", name, e))?;
    Ok(Box::new(BufReader::new(f)))
}

/// Creates a named output; "stdout" writes to standard output.
pub async fn create(name: &str) -> Result<Output> {
    if name == "stdout" {
        return Ok(Box::new(BufWriter::new(tokio::io::stdout())));
    }
    let f = File::create(name)
        .await
        .map_err(|e| eyre::eyre!("create {}: {}", name, e))?;
    Ok(Box::new(BufWriter::new(f)))
}

pub async fn read_all(name: &str) -> Result<Vec<u8>> {
    let mut input = open(name).await?;
    let mut buf = Vec::new();
    input.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Peeks at the first byte without consuming it: a leading '{' means JSON
/// lines, anything else CSV. Returns None for empty input.
pub async fn detect_format<R: AsyncBufRead + Unpin>(input: &mut R) -> Result<Option<Format>> {
    let buf = input.fill_buf().await?;
    Ok(match buf.first() {
        None => None,
        Some(b'{') => Some(Format::Json),
        Some(_) => Some(Format::Csv),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt as _;

    #[tokio::test]
    async fn detects_format_without_consuming() {
        let mut input: &[u8] = b"{\"x\":1,\"y\":2}\n";
        assert_eq!(detect_format(&mut input).await.unwrap(), Some(Format::Json));
        assert_eq!(input.len(), 14);

        let mut input: &[u8] = b"0,1\n";
        assert_eq!(detect_format(&mut input).await.unwrap(), Some(Format::Csv));

        let mut input: &[u8] = b"";
        assert_eq!(detect_format(&mut input).await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("apogee-io-{}.csv", std::process::id()));
        let name = path.to_str().unwrap();

        let mut output = create(name).await.unwrap();
        output.write_all(b"0,1\n").await.unwrap();
        output.flush().await.unwrap();
        drop(output);

        assert_eq!(read_all(name).await.unwrap(), b"0,1\n");
        std::fs::remove_file(&path).unwrap();

        assert!(open(name).await.is_err());
    }
}
