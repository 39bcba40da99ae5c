use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};

use crate::Error;

// Sample is a single (x, y) point of a telemetry channel.
//
// JSON has no non-finite numbers: serde_json writes them as `null`, which
// reads back as NaN (infinities do not survive a JSON round trip).
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Sample {
    #[serde(deserialize_with = "nan_if_null")]
    pub x: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub y: f64,
}

fn nan_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl Sample {
    pub const fn new(x: f64, y: f64) -> Self {
        Sample { x, y }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((x, y): (f64, f64)) -> Self {
        Sample { x, y }
    }
}

impl From<Sample> for (f64, f64) {
    fn from(s: Sample) -> Self {
        (s.x, s.y)
    }
}

/// Line-oriented sample encoding. `decode` returns `None` at end of input.
#[async_trait]
pub trait Codec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<(), Error>;
    async fn decode<R: AsyncBufRead + Unpin + Send>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Sample>, Error>;
}

pub struct JsonCodec;

#[async_trait]
impl Codec for JsonCodec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<(), Error> {
        let mut buf = serde_json::to_vec(sample)?;
        buf.push(b'\n');
        writer.write_all(&buf).await?;
        Ok(())
    }

    async fn decode<R: AsyncBufRead + Unpin + Send>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Sample>, Error> {
        let Some(line) = next_line(reader).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&line)?))
    }
}

pub struct CsvCodec;

#[async_trait]
impl Codec for CsvCodec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<(), Error> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        wtr.serialize(sample)?;
        let buf = wtr.into_inner().map_err(|e| e.into_error())?;
        writer.write_all(&buf).await?;
        Ok(())
    }

    async fn decode<R: AsyncBufRead + Unpin + Send>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Sample>, Error> {
        let Some(line) = next_line(reader).await? else {
            return Ok(None);
        };
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(line.as_bytes());
        match rdr.deserialize::<Sample>().next() {
            Some(sample) => Ok(Some(sample?)),
            None => Ok(None),
        }
    }
}

/// Decodes every sample of `reader`.
///
/// A leading CSV record that is not numeric (an `x,y` header) is skipped.
pub async fn read_samples<C, R>(codec: &C, reader: &mut R) -> Result<Vec<Sample>, Error>
where
    C: Codec + Sync,
    R: AsyncBufRead + Unpin + Send,
{
    let mut samples = Vec::new();
    let mut first = true;
    loop {
        match codec.decode(reader).await {
            Ok(Some(sample)) => samples.push(sample),
            Ok(None) => return Ok(samples),
            Err(Error::Csv(e)) if first => {
                tracing::debug!(error = %e, "skipping csv header");
            }
            Err(e) => return Err(e),
        }
        first = false;
    }
}

// Reads the next non-blank line, without its terminator.
async fn next_line<R: AsyncBufRead + Unpin + Send>(
    reader: &mut R,
) -> Result<Option<String>, Error> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode_all<C: Codec>(codec: &C, input: &[u8]) -> Vec<Sample> {
        let mut reader = input;
        let mut out = Vec::new();
        while let Some(sample) = codec.decode(&mut reader).await.unwrap() {
            out.push(sample);
        }
        out
    }

    #[tokio::test]
    async fn json_lines() {
        let mut buf = Vec::new();
        JsonCodec.encode(&mut buf, &Sample::new(1.5, -2.0)).await.unwrap();
        assert_eq!(buf, b"{\"x\":1.5,\"y\":-2.0}\n");

        let input = b"{\"x\":0,\"y\":1}\n\n{\"x\":2.5,\"y\":3}\n";
        assert_eq!(
            decode_all(&JsonCodec, input).await,
            vec![Sample::new(0.0, 1.0), Sample::new(2.5, 3.0)]
        );
    }

    #[tokio::test]
    async fn csv_rows() {
        let mut buf = Vec::new();
        CsvCodec.encode(&mut buf, &Sample::new(0.1, 42.0)).await.unwrap();
        assert_eq!(buf, b"0.1,42.0\n");

        let input = b"0, 1\r\n\n 2.5,3\n";
        assert_eq!(
            decode_all(&CsvCodec, input).await,
            vec![Sample::new(0.0, 1.0), Sample::new(2.5, 3.0)]
        );
    }

    #[tokio::test]
    async fn csv_rejects_non_numeric() {
        let mut reader: &[u8] = b"time,altitude\n";
        assert!(CsvCodec.decode(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn json_non_finite_reads_back_as_nan() {
        let mut buf = Vec::new();
        JsonCodec.encode(&mut buf, &Sample::new(1.0, f64::NAN)).await.unwrap();
        JsonCodec.encode(&mut buf, &Sample::new(f64::INFINITY, 2.0)).await.unwrap();
        assert_eq!(buf, b"{\"x\":1.0,\"y\":null}\n{\"x\":null,\"y\":2.0}\n");

        let samples = decode_all(&JsonCodec, &buf).await;
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].x, 1.0);
        assert!(samples[0].y.is_nan());
        assert!(samples[1].x.is_nan());
        assert_eq!(samples[1].y, 2.0);
    }

    #[tokio::test]
    async fn csv_nan_round_trips() {
        let mut buf = Vec::new();
        CsvCodec.encode(&mut buf, &Sample::new(f64::NAN, 3.0)).await.unwrap();
        let samples = decode_all(&CsvCodec, &buf).await;
        assert!(samples[0].x.is_nan());
        assert_eq!(samples[0].y, 3.0);
    }

    #[tokio::test]
    async fn read_samples_skips_csv_header() {
        let mut reader: &[u8] = b"x,y\n0,1\n2,3\n";
        let samples = read_samples(&CsvCodec, &mut reader).await.unwrap();
        assert_eq!(samples, vec![Sample::new(0.0, 1.0), Sample::new(2.0, 3.0)]);

        let mut reader: &[u8] = b"0,1\nx,y\n";
        assert!(read_samples(&CsvCodec, &mut reader).await.is_err());

        let mut reader: &[u8] = b"not json\n";
        assert!(read_samples(&JsonCodec, &mut reader).await.is_err());
    }
}
