use apogee::{read_payload, read_radar, Chart, IngestOptions, PayloadLog, MAX_POINTS};
use clap::Args;
use eyre::Result;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::io::{create, read_all};

/// Telemetry logs and how to plot them, shared by `plot` and `report`.
#[derive(Args, Debug)]
pub struct Sources {
    /// Radar track log (time [s], .., .., altitude [ft])
    #[clap(long)]
    pub radar: Option<String>,

    /// Payload log (repeatable; Geiger counts are averaged across files)
    #[clap(long)]
    pub payload: Vec<String>,

    /// Field delimiter [default: sniffed from the first lines]
    #[clap(long, env = "APOGEE_DELIMITER")]
    pub delimiter: Option<char>,

    /// Points per plotted channel (LTTB downsampling threshold)
    #[clap(long, env = "APOGEE_THRESHOLD", default_value_t = MAX_POINTS)]
    pub threshold: usize,

    /// Largest threshold a chart may be resampled to
    #[clap(long, env = "APOGEE_MAX_POINTS", default_value_t = MAX_POINTS)]
    pub max_points: usize,
}

impl Sources {
    fn ingest_options(&self) -> Result<IngestOptions> {
        let delimiter = match self.delimiter {
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => eyre::bail!("delimiter must be an ASCII character, got {:?}", c),
            None => None,
        };
        Ok(IngestOptions {
            delimiter,
            ..IngestOptions::default()
        })
    }

    pub async fn load(&self, title: &str) -> Result<Chart> {
        if self.radar.is_none() && self.payload.is_empty() {
            eyre::bail!("no telemetry to plot: pass --radar and/or --payload");
        }

        let opts = self.ingest_options()?;
        let mut chart = Chart::new(title, self.max_points);

        if let Some(name) = &self.radar {
            let data = read_all(name).await?;
            let track = read_radar(&data, &opts).map_err(|e| eyre::eyre!("{}: {}", name, e))?;
            chart.add_radar(&track);
        }

        let mut logs = Vec::with_capacity(self.payload.len());
        for name in &self.payload {
            let data = read_all(name).await?;
            logs.push(read_payload(&data, &opts).map_err(|e| eyre::eyre!("{}: {}", name, e))?);
        }
        if !logs.is_empty() {
            chart.add_payload(&PayloadLog::merge(logs));
        }

        if self.threshold != self.max_points {
            chart.resample(self.threshold).await?;
        }
        Ok(chart)
    }
}

#[derive(Args, Debug)]
pub struct Opts {
    /// Plot title
    #[clap(long, default_value = "Rocket Telemetry")]
    title: String,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    output: String,

    #[command(flatten)]
    sources: Sources,
}

pub async fn plot(opts: &Opts) -> Result<()> {
    let chart = opts.sources.load(&opts.title).await?;

    let mut buf = Vec::new();
    apogee::report_html(&chart, &mut buf)?;

    let mut output = create(&opts.output).await?;
    output.write_all(&buf).await?;
    output.flush().await?;

    info!(channels = chart.channels.len(), output = %opts.output, "plot written");
    Ok(())
}
