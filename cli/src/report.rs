use clap::Args;
use eyre::Result;
use tokio::io::AsyncWriteExt;

use crate::io::create;
use crate::plot::Sources;

#[derive(Args, Debug)]
pub struct Opts {
    /// Report type (text, json)
    #[clap(long = "type", default_value = "text")]
    pub report_type: String,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,

    #[command(flatten)]
    pub sources: Sources,
}

pub async fn report(opts: &Opts) -> Result<()> {
    let chart = opts.sources.load("Rocket Telemetry").await?;

    let mut buf = Vec::new();
    match opts.report_type.as_str() {
        "text" => apogee::report_text(&chart, &mut buf)?,
        "json" => apogee::report_json(&chart, &mut buf)?,
        other => eyre::bail!("unknown report type: {}", other),
    }

    let mut output = create(&opts.output).await?;
    output.write_all(&buf).await?;
    output.flush().await?;
    Ok(())
}
