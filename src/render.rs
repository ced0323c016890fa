//! Render projection for the overlay.
//!
//! The meter itself may overflow its ceiling; only this projection clamps.
//! The overlay page polls a small JSON file, so the sink writes tmp+rename
//! to never expose a torn frame.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::engine::state::MeterState;
use crate::logging::{self, obj, v_num, v_str, Domain, Level};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    /// Filled-bar percentage, clamped to the ceiling.
    pub percent: f64,
    /// Label text: the percent rounded to the nearest whole number.
    pub label: String,
    pub value: f64,
    pub max: f64,
}

/// `displayPercent = min(value, max) / max * 100`. Monotonic in `value`
/// and capped at 100 once `value >= max`; no lower clamp.
pub fn project(state: &MeterState) -> RenderFrame {
    let percent = state.value.min(state.max) / state.max * 100.0;
    RenderFrame {
        percent,
        label: format!("{}%", percent.round() as i64),
        value: state.value,
        max: state.max,
    }
}

pub trait RenderSink {
    fn render(&mut self, frame: &RenderFrame);
}

/// Writes each frame to a JSON file the overlay polls.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write_frame(&self, frame: &RenderFrame) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string(frame)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl RenderSink for FileSink {
    fn render(&mut self, frame: &RenderFrame) {
        match self.write_frame(frame) {
            Ok(()) => logging::log(
                Level::Trace,
                Domain::Render,
                "frame",
                obj(&[
                    ("percent", v_num(frame.percent)),
                    ("value", v_num(frame.value)),
                    ("max", v_num(frame.max)),
                ]),
            ),
            // The overlay keeps showing the previous frame; not fatal.
            Err(err) => logging::log(
                Level::Error,
                Domain::Render,
                "write_failed",
                obj(&[
                    ("path", v_str(&self.path.to_string_lossy())),
                    ("error", v_str(&err.to_string())),
                ]),
            ),
        }
    }
}
