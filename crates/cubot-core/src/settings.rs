//! Robot servo settings and webcam settings persistence.
//!
//! Servo settings travel two ways: as JSON on the control plane (and in the
//! settings file), and as a flat list of 16 integers in a
//! `current_settings(...)` report. The flat order is the field order below.

use std::fs;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Number of values in a flat servo settings list.
pub const WIRE_VALUE_COUNT: usize = 16;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings payload has no parenthesised value list")]
    MissingPayload,

    #[error("Expected {expected} settings values, got {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("Invalid settings value '{0}'")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TopCoverAngles {
    pub flip: u32,
    pub open: u32,
    pub close: u32,
    pub release: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TopCoverTimes {
    pub flip_to_close: u32,
    pub close_to_flip: u32,
    pub flip_open: u32,
    pub open_close: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TopCover {
    pub angle: TopCoverAngles,
    pub time: TopCoverTimes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CubeHolderAngles {
    pub ccw: u32,
    pub home: u32,
    pub cw: u32,
    pub extra_ccw: u32,
    pub extra_home: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CubeHolderTimes {
    pub spin: u32,
    pub rotate: u32,
    pub release: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CubeHolder {
    pub angle: CubeHolderAngles,
    pub time: CubeHolderTimes,
}

/// Servo angles (degrees) and timings (ms) of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RobotSettings {
    pub top_cover: TopCover,
    pub cube_holder: CubeHolder,
}

impl Default for RobotSettings {
    fn default() -> Self {
        Self {
            top_cover: TopCover {
                angle: TopCoverAngles {
                    flip: 60,
                    open: 100,
                    close: 160,
                    release: 150,
                },
                time: TopCoverTimes {
                    flip_to_close: 500,
                    close_to_flip: 500,
                    flip_open: 600,
                    open_close: 300,
                },
            },
            cube_holder: CubeHolder {
                angle: CubeHolderAngles {
                    ccw: 0,
                    home: 90,
                    cw: 180,
                    extra_ccw: 5,
                    extra_home: 5,
                },
                time: CubeHolderTimes {
                    spin: 700,
                    rotate: 800,
                    release: 200,
                },
            },
        }
    }
}

impl RobotSettings {
    /// Flatten in wire order.
    pub fn to_wire_values(&self) -> [u32; WIRE_VALUE_COUNT] {
        let t = &self.top_cover;
        let c = &self.cube_holder;
        [
            t.angle.flip,
            t.angle.open,
            t.angle.close,
            t.angle.release,
            t.time.flip_to_close,
            t.time.close_to_flip,
            t.time.flip_open,
            t.time.open_close,
            c.angle.ccw,
            c.angle.home,
            c.angle.cw,
            c.angle.extra_ccw,
            c.angle.extra_home,
            c.time.spin,
            c.time.rotate,
            c.time.release,
        ]
    }

    pub fn from_wire_values(v: [u32; WIRE_VALUE_COUNT]) -> Self {
        Self {
            top_cover: TopCover {
                angle: TopCoverAngles {
                    flip: v[0],
                    open: v[1],
                    close: v[2],
                    release: v[3],
                },
                time: TopCoverTimes {
                    flip_to_close: v[4],
                    close_to_flip: v[5],
                    flip_open: v[6],
                    open_close: v[7],
                },
            },
            cube_holder: CubeHolder {
                angle: CubeHolderAngles {
                    ccw: v[8],
                    home: v[9],
                    cw: v[10],
                    extra_ccw: v[11],
                    extra_home: v[12],
                },
                time: CubeHolderTimes {
                    spin: v[13],
                    rotate: v[14],
                    release: v[15],
                },
            },
        }
    }

    /// Parse a comma separated value list, with or without its parentheses.
    /// Spaces are ignored.
    pub fn parse_wire(payload: &str) -> Result<Self, SettingsError> {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let body = match compact.find('(') {
            Some(open) => {
                let rest = &compact[open + 1..];
                let close = rest.find(')').ok_or(SettingsError::MissingPayload)?;
                &rest[..close]
            }
            None => compact.as_str(),
        };
        if body.is_empty() {
            return Err(SettingsError::MissingPayload);
        }

        let values = body
            .split(',')
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| SettingsError::InvalidValue(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let actual = values.len();
        let values: [u32; WIRE_VALUE_COUNT] =
            values.try_into().map_err(|_| SettingsError::WrongCount {
                expected: WIRE_VALUE_COUNT,
                actual,
            })?;
        Ok(Self::from_wire_values(values))
    }

    /// `(v1,v2,...,v16)`
    pub fn to_wire(&self) -> String {
        let joined = self
            .to_wire_values()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("({joined})")
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Robot settings saved");
        Ok(())
    }

    /// Keep a timestamped copy of a settings report, `YYYYmmdd_HHMMSS(v1,...)`.
    pub fn save_report<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        fs::write(path, format!("{}{}", timestamp(), self.to_wire()))?;
        Ok(())
    }
}

/// Webcam parameters handed to the recognition collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CamSettings {
    pub device: u32,
    pub width: u32,
    pub height: u32,
    /// Pixels cropped off the right side of the frame.
    pub crop_right: u32,
    /// Minimum facelets across the frame width.
    pub facelets_in_width: u32,
}

impl Default for CamSettings {
    fn default() -> Self {
        Self {
            device: 0,
            width: 640,
            height: 360,
            crop_right: 0,
            facelets_in_width: 11,
        }
    }
}

impl CamSettings {
    /// Parse a `[timestamp](a, b, c, d, e)` line.
    pub fn parse_line(line: &str) -> Result<Self, SettingsError> {
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let open = compact.find('(').ok_or(SettingsError::MissingPayload)?;
        let rest = &compact[open + 1..];
        let close = rest.find(')').ok_or(SettingsError::MissingPayload)?;

        let values = rest[..close]
            .split(',')
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| SettingsError::InvalidValue(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match values[..] {
            [device, width, height, crop_right, facelets_in_width] => Ok(Self {
                device,
                width,
                height,
                crop_right,
                facelets_in_width,
            }),
            _ => Err(SettingsError::WrongCount {
                expected: 5,
                actual: values.len(),
            }),
        }
    }

    /// `(a, b, c, d, e)`
    pub fn to_line(&self) -> String {
        format!(
            "({}, {}, {}, {}, {})",
            self.device, self.width, self.height, self.crop_right, self.facelets_in_width
        )
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::parse_line(content.lines().next().unwrap_or_default())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        fs::write(path, format!("{}{}", timestamp(), self.to_line()))?;
        Ok(())
    }
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered() -> RobotSettings {
        let mut values = [0u32; WIRE_VALUE_COUNT];
        for (i, v) in values.iter_mut().enumerate() {
            *v = 100 + i as u32;
        }
        RobotSettings::from_wire_values(values)
    }

    #[test]
    fn test_wire_order() {
        let s = numbered();
        assert_eq!(s.top_cover.angle.flip, 100);
        assert_eq!(s.top_cover.time.open_close, 107);
        assert_eq!(s.cube_holder.angle.ccw, 108);
        assert_eq!(s.cube_holder.angle.extra_home, 112);
        assert_eq!(s.cube_holder.time.release, 115);
    }

    #[test]
    fn test_parse_report() {
        let report = "current_settings(100, 101,102,103,104,105,106,107,108,109,110,111,112,113,114,115)";
        assert_eq!(RobotSettings::parse_wire(report).unwrap(), numbered());
        assert_eq!(
            RobotSettings::parse_wire(&numbered().to_wire()).unwrap(),
            numbered()
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            RobotSettings::parse_wire("(1,2,3)"),
            Err(SettingsError::WrongCount {
                expected: 16,
                actual: 3
            })
        ));
        assert!(matches!(
            RobotSettings::parse_wire("(1,x)"),
            Err(SettingsError::InvalidValue(_))
        ));
        assert!(matches!(
            RobotSettings::parse_wire("current_settings"),
            Err(SettingsError::MissingPayload)
        ));
    }

    #[test]
    fn test_json_schema() {
        let json = numbered().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["TOP_COVER"]["ANGLE"]["FLIP"], 100);
        assert_eq!(value["TOP_COVER"]["TIME"]["FLIP_TO_CLOSE"], 104);
        assert_eq!(value["CUBE_HOLDER"]["ANGLE"]["EXTRA_CCW"], 111);
        assert_eq!(value["CUBE_HOLDER"]["TIME"]["SPIN"], 113);
        assert_eq!(RobotSettings::from_json(&json).unwrap(), numbered());
    }

    #[test]
    fn test_report_survives_json_persistence() {
        let parsed = RobotSettings::parse_wire(&numbered().to_wire()).unwrap();
        let path = std::env::temp_dir().join(format!("cubot-settings-{}.json", std::process::id()));
        parsed.save_to_file(&path).unwrap();
        let loaded = RobotSettings::load_from_file(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded.to_wire_values(), numbered().to_wire_values());
    }

    #[test]
    fn test_cam_settings_line() {
        let cam = CamSettings::parse_line("20240101_120000(1, 1280, 720, 40, 9)").unwrap();
        assert_eq!(cam.width, 1280);
        assert_eq!(cam.facelets_in_width, 9);
        assert_eq!(CamSettings::parse_line(&cam.to_line()).unwrap(), cam);
        assert_eq!(CamSettings::default().to_line(), "(0, 640, 360, 0, 11)");
        assert!(CamSettings::parse_line("(1, 2)").is_err());
    }
}
