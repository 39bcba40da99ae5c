use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};

use crate::{downsample, Error, PayloadLog, RadarTrack, Sample};

/// Default plot budget per channel.
pub const MAX_POINTS: usize = 1000;

/// Shared y domain of the payload channels.
pub const PAYLOAD_DOMAIN: (f64, f64) = (-5.0, 50.0);

#[derive(Debug, Clone, Serialize)]
pub struct Channel {
    pub name: String,
    pub color: String,
    /// y axis range (low, high).
    pub domain: (f64, f64),
    #[serde(skip)]
    pub raw: Arc<[Sample]>,
    pub plotted: Vec<Sample>,
}

impl Channel {
    pub fn new(name: &str, color: &str, domain: (f64, f64), raw: Vec<Sample>) -> Self {
        Channel {
            name: name.to_string(),
            color: color.to_string(),
            domain,
            raw: raw.into(),
            plotted: Vec::new(),
        }
    }
}

/// A labelled marker on the time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub x: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub title: String,
    pub max_points: usize,
    pub channels: Vec<Channel>,
    pub annotations: Vec<Annotation>,
}

impl Chart {
    pub fn new(title: &str, max_points: usize) -> Self {
        Chart {
            title: title.to_string(),
            max_points,
            channels: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Adds a channel, plotted at the full point budget.
    pub fn push(&mut self, mut channel: Channel) {
        channel.plotted = downsample(&channel.raw, self.max_points).into_owned();
        debug!(
            channel = %channel.name,
            raw = channel.raw.len(),
            plotted = channel.plotted.len(),
            "channel added"
        );
        self.channels.push(channel);
    }

    pub fn add_radar(&mut self, track: &RadarTrack) {
        let top = track.apogee.map_or(0.0, |s| s.y.max(0.0));
        self.push(Channel::new(
            "RADAR Altitude",
            "rgba(255, 127, 0, 1.0)",
            (0.0, top),
            track.altitude.clone(),
        ));
        if let Some(apogee) = track.apogee {
            self.annotations.push(Annotation {
                x: apogee.x,
                label: "RADAR Apogee".to_string(),
            });
        }
    }

    pub fn add_payload(&mut self, log: &PayloadLog) {
        self.push(Channel::new(
            "Geiger Counts",
            "rgba(255, 0, 0, 0.4)",
            PAYLOAD_DOMAIN,
            log.geiger.clone(),
        ));
        self.push(Channel::new(
            "Gyroscope",
            "rgba(0, 255, 0, 0.8)",
            PAYLOAD_DOMAIN,
            log.gyro.clone(),
        ));
    }

    /// Replots every channel from its raw series at `threshold` points.
    ///
    /// Channels are downsampled concurrently on the blocking pool.
    pub async fn resample(&mut self, threshold: usize) -> Result<(), Error> {
        if threshold > self.max_points {
            return Err(Error::ThresholdTooLarge {
                threshold,
                max: self.max_points,
            });
        }

        let tasks = self.channels.iter().map(|channel| {
            let raw = Arc::clone(&channel.raw);
            tokio::task::spawn_blocking(move || downsample(&raw, threshold).into_owned())
        });
        let plotted = try_join_all(tasks).await?;

        for (channel, plotted) in self.channels.iter_mut().zip(plotted) {
            channel.plotted = plotted;
        }
        info!(threshold, channels = self.channels.len(), "resampled");
        Ok(())
    }
}
