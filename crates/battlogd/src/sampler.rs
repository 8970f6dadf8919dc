//! Periodic battery sampler
//!
//! Reads the power supplies, appends one CSV row and trims the log once it
//! outgrows `max_lines + trim_buffer`. The loop samples immediately, then
//! sleeps for the interval that matches the AC state it just saw.

use battlog_common::config::BattlogConfig;
use battlog_common::csv_log::CsvLog;
use battlog_common::power::{PowerReading, PowerSupplyReader};
use battlog_common::Result;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct Sampler {
    config: BattlogConfig,
    reader: PowerSupplyReader,
    log: CsvLog,
}

impl Sampler {
    pub fn new(config: BattlogConfig, reader: PowerSupplyReader, log: CsvLog) -> Self {
        Self {
            config,
            reader,
            log,
        }
    }

    /// Sampler over the system power supplies and the configured log path
    pub fn from_config(config: BattlogConfig) -> Result<Self> {
        let log = CsvLog::new(config.log_path()?);
        Ok(Self::new(config, PowerSupplyReader::default(), log))
    }

    pub fn log(&self) -> &CsvLog {
        &self.log
    }

    /// Take and store one reading
    pub fn sample_once(&self) -> Result<PowerReading> {
        let reading = self.reader.read()?;
        let timestamp = self.config.timestamp_now();
        self.log
            .append(&timestamp, reading.ac_connected, reading.battery_percent)?;
        debug!(
            "Logged {} ac={} battery={}%",
            timestamp, reading.ac_connected, reading.battery_percent
        );

        self.log
            .trim_if_needed(self.config.trim_threshold(), self.config.logger.max_lines)?;
        Ok(reading)
    }

    /// Next sleep after `last`; the battery interval when the reading failed
    pub fn next_interval(&self, last: Option<&PowerReading>) -> Duration {
        self.config
            .sample_interval(last.map(|r| r.ac_connected).unwrap_or(false))
    }

    /// Sample until `shutdown` flips. Failed samples are logged and retried
    /// on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Sampling into {}", self.log.path().display());

        loop {
            let reading = match self.sample_once() {
                Ok(reading) => Some(reading),
                Err(e) => {
                    warn!("Sample failed: {}", e);
                    None
                }
            };

            let interval = self.next_interval(reading.as_ref());
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Sampler stopped");
    }
}
