use apogee::{read_samples, Codec, CsvCodec, JsonCodec, Sample, MAX_POINTS};
use clap::Args;
use eyre::Result;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::io::{create, detect_format, open, Format};

#[derive(Args, Debug)]
pub struct Opts {
    /// Number of samples to keep
    #[clap(long, env = "APOGEE_THRESHOLD", default_value_t = MAX_POINTS)]
    pub threshold: usize,

    /// Output encoding (json, csv)
    #[clap(long, default_value = "csv")]
    pub to: String,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,

    /// Input files, concatenated in order [default: stdin]
    pub files: Vec<String>,
}

pub async fn downsample(opts: &Opts) -> Result<()> {
    let to_csv = match opts.to.as_str() {
        "csv" => true,
        "json" => false,
        other => eyre::bail!("unknown encoding: {}", other),
    };

    let sources: Vec<String> = if opts.files.is_empty() {
        vec!["stdin".to_string()]
    } else {
        opts.files.clone()
    };

    let mut series: Vec<Sample> = Vec::new();
    for source in &sources {
        let mut input = open(source).await?;
        let Some(format) = detect_format(&mut input).await? else {
            continue;
        };
        debug!(source = %source, format = ?format, "decoding samples");

        let decoded = match format {
            Format::Json => read_samples(&JsonCodec, &mut input).await,
            Format::Csv => read_samples(&CsvCodec, &mut input).await,
        };
        series.extend(decoded.map_err(|e| eyre::eyre!("{}: {}", source, e))?);
    }

    let sampled = apogee::downsample(&series, opts.threshold);
    info!(read = series.len(), kept = sampled.len(), "downsampled");

    let mut output = create(&opts.output).await?;
    for sample in sampled.iter() {
        if to_csv {
            CsvCodec.encode(&mut output, sample).await?;
        } else {
            JsonCodec.encode(&mut output, sample).await?;
        }
    }
    output.flush().await?;
    Ok(())
}
