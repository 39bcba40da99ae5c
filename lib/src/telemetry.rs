//! Radar and payload log ingestion.
//!
//! Both log formats are delimited text with one reading per row. Rows whose
//! first field is not a number (headers, comments, status lines) are
//! skipped, and empty fields are dropped before columns are looked up, so
//! runs of spaces behave like a single delimiter.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info};

use crate::{Error, Sample};

/// Feet to metres.
pub const FEET_TO_METERS: f64 = 0.3048;

/// Raw gyroscope reading per Hz of rotation.
pub const GYRO_COUNTS_PER_HZ: f64 = 5175.0;

const DELIMITERS: &[u8] = b",\t;| ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadarColumns {
    /// Seconds since the radar started tracking.
    pub time: usize,
    /// Altitude in feet.
    pub altitude: usize,
}

impl Default for RadarColumns {
    fn default() -> Self {
        RadarColumns {
            time: 0,
            altitude: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadColumns {
    /// Milliseconds since the payload booted.
    pub time: usize,
    pub gyro: usize,
    pub geiger: usize,
}

impl Default for PayloadColumns {
    fn default() -> Self {
        PayloadColumns {
            time: 0,
            gyro: 12,
            geiger: 13,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Field delimiter. Sniffed from the first lines when unset.
    pub delimiter: Option<u8>,
    pub radar: RadarColumns,
    pub payload: PayloadColumns,
}

/// Radar altitude track, one sample per tenth of a second.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadarTrack {
    /// Altitude in metres above the first tracked position.
    pub altitude: Vec<Sample>,
    pub apogee: Option<Sample>,
    /// Rows read, including skipped ones.
    pub rows: usize,
}

/// Payload channels of one or more flights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadLog {
    /// Geiger counts per second.
    pub geiger: Vec<Sample>,
    /// Gyroscope rate in Hz, one sample per row.
    pub gyro: Vec<Sample>,
    /// Rows read, including skipped ones.
    pub rows: usize,
}

pub fn read_radar(data: &[u8], opts: &IngestOptions) -> Result<RadarTrack, Error> {
    let start = Instant::now();
    let cols = opts.radar;

    let mut offset = None;
    // tenth-second bucket -> (altitude sum, rows)
    let mut buckets: BTreeMap<i64, (f64, u32)> = BTreeMap::new();

    let rows = for_each_row(data, opts.delimiter, |fields| {
        let (Some(t), Some(alt)) = (field(fields, cols.time), field(fields, cols.altitude)) else {
            return;
        };
        let base = *offset.get_or_insert(alt);
        let entry = buckets.entry((t * 10.0).ceil() as i64).or_insert((0.0, 0));
        entry.0 += alt - base;
        entry.1 += 1;
    })?;

    if buckets.is_empty() {
        return Err(Error::NoData("radar"));
    }

    let altitude: Vec<Sample> = buckets
        .into_iter()
        .map(|(tenth, (sum, steps))| {
            Sample::new(tenth as f64 / 10.0, sum * FEET_TO_METERS / steps as f64)
        })
        .collect();

    let apogee = altitude.iter().copied().fold(None, |best: Option<Sample>, s| match best {
        Some(b) if b.y >= s.y => Some(b),
        _ => Some(s),
    });

    info!(
        rows,
        samples = altitude.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "radar entries processed"
    );

    Ok(RadarTrack {
        altitude,
        apogee,
        rows,
    })
}

pub fn read_payload(data: &[u8], opts: &IngestOptions) -> Result<PayloadLog, Error> {
    let start = Instant::now();
    let cols = opts.payload;

    let mut geiger: BTreeMap<i64, f64> = BTreeMap::new();
    let mut gyro = Vec::new();

    let rows = for_each_row(data, opts.delimiter, |fields| {
        let Some(ms) = field(fields, cols.time) else {
            return;
        };
        if let Some(counts) = field(fields, cols.geiger) {
            *geiger.entry((ms / 1000.0).ceil() as i64).or_insert(0.0) += counts;
        }
        if let Some(raw) = field(fields, cols.gyro) {
            gyro.push(Sample::new(ms / 1000.0, raw / GYRO_COUNTS_PER_HZ));
        }
    })?;

    if geiger.is_empty() && gyro.is_empty() {
        return Err(Error::NoData("payload"));
    }

    let geiger: Vec<Sample> = geiger
        .into_iter()
        .map(|(sec, counts)| Sample::new(sec as f64, counts))
        .collect();

    info!(
        rows,
        geiger = geiger.len(),
        gyro = gyro.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "payload entries processed"
    );

    Ok(PayloadLog { geiger, gyro, rows })
}

impl PayloadLog {
    /// Combines the logs of repeated flights.
    ///
    /// Geiger counts become the per-second mean over all logs (a second
    /// missing from a log counts as zero). Gyroscope samples are pooled and
    /// stably sorted by time.
    pub fn merge(logs: Vec<PayloadLog>) -> PayloadLog {
        let n = logs.len();
        if n == 1 {
            return logs.into_iter().next().unwrap_or_default();
        }

        let mut geiger: BTreeMap<i64, f64> = BTreeMap::new();
        let mut gyro = Vec::new();
        let mut rows = 0;
        for log in logs {
            for s in log.geiger {
                *geiger.entry(s.x as i64).or_insert(0.0) += s.y;
            }
            gyro.extend(log.gyro);
            rows += log.rows;
        }
        gyro.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        PayloadLog {
            geiger: geiger
                .into_iter()
                .map(|(sec, total)| Sample::new(sec as f64, total / n as f64))
                .collect(),
            gyro,
            rows,
        }
    }
}

/// Guesses the field delimiter from the first lines of `data`.
pub fn sniff_delimiter(data: &[u8]) -> u8 {
    let head: Vec<&[u8]> = data
        .split(|&b| b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .take(10)
        .collect();

    DELIMITERS
        .iter()
        .copied()
        .map(|d| {
            let hits = head
                .iter()
                .map(|line| line.iter().filter(|&&b| b == d).count())
                .sum::<usize>();
            (d, hits)
        })
        .fold((b',', 0), |best, cur| if cur.1 > best.1 { cur } else { best })
        .0
}

// Feeds every data row to `f` and returns the number of rows read.
fn for_each_row(
    data: &[u8],
    delimiter: Option<u8>,
    mut f: impl FnMut(&[&str]),
) -> Result<usize, Error> {
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(data));
    debug!(delimiter = %(delimiter as char).escape_debug(), "reading log");

    // Logs never quote fields; a stray '"' in a status line must not
    // swallow the rows after it.
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(data);

    let mut rows = 0;
    let mut record = csv::ByteRecord::new();
    while rdr.read_byte_record(&mut record)? {
        rows += 1;
        // Undecodable fields (line noise) keep their position but never parse.
        let fields: Vec<&str> = record
            .iter()
            .filter(|f| !f.is_empty())
            .map(|f| std::str::from_utf8(f).unwrap_or("\u{fffd}"))
            .collect();
        if field(&fields, 0).is_some() {
            f(&fields);
        }
    }
    Ok(rows)
}

fn field(fields: &[&str], i: usize) -> Option<f64> {
    fields.get(i)?.parse().ok()
}
