//! battlog common - shared model, analytics and storage for battlog
//!
//! The sampler daemon writes the CSV log; the control tool reads it back,
//! runs the analytics, and draws the chart through `chart::ChartSurface`.

pub mod analytics;
pub mod chart;
pub mod config;
pub mod csv_log;
pub mod error;
pub mod format;
pub mod lock;
pub mod power;
pub mod sample;
pub mod status;
pub mod window;

pub use config::BattlogConfig;
pub use error::{BattlogError, RenderError, Result};
pub use sample::{ChargeDirection, DataBounds, Sample, SampleCounts};
pub use window::{PanDirection, ViewNavigator, ViewWindow, WindowLimits};
