// src/config.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("seconds-to-wait must be greater than zero")]
    ZeroWait,
    #[error("seconds-to-wait `{value}` is not an integer or <digits>[s|m|h] duration")]
    BadWait { value: String },
    #[error("camera source `{uri}` has no scheme (expected usb://, http://, https:// or rtsp://)")]
    MissingScheme { uri: String },
    #[error("camera source `{uri}`: unsupported scheme `{scheme}`")]
    UnsupportedScheme { uri: String, scheme: String },
    #[error("camera source `{uri}`: device index is not an integer")]
    BadDeviceIndex { uri: String },
    #[error("suspend must be \"YES\" or \"NO\", got `{value}`")]
    BadSuspend { value: String },
    #[error("cameras-list is empty")]
    NoCameras,
    #[error("cron expression `{expr}` must have 5 fields, got {fields}")]
    CronFieldCount { expr: String, fields: usize },
    #[error("cron expression `{expr}`: {reason}")]
    CronSyntax { expr: String, reason: String },
}

// ---------- Wire format ----------

#[derive(Debug, Deserialize, Clone)]
struct ConfigDoc {
    #[serde(rename = "camshot-datastore")]
    datastore: String,
    #[serde(rename = "camshot-schedule")]
    schedule: ScheduleDoc,
    #[serde(rename = "cameras-list")]
    cameras: Vec<CameraDoc>,
}

#[derive(Debug, Deserialize, Clone)]
struct ScheduleDoc {
    #[serde(rename = "seconds-to-wait")]
    seconds_to_wait: WaitTime,
    #[serde(rename = "start-time")]
    start_time: String,
    #[serde(rename = "end-time")]
    end_time: String,
    suspend: String,
}

/// `seconds-to-wait` is either a JSON integer or a short duration string
/// (`<digits>` optionally suffixed with s, m or h). Arbitrary expressions
/// are deliberately not evaluated.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
enum WaitTime {
    Seconds(u64),
    Spelled(String),
}

#[derive(Debug, Deserialize, Clone)]
struct CameraDoc {
    source: String,
    #[serde(rename = "optional-auth")]
    auth: Option<CameraAuth>,
}

// ---------- Validated configuration ----------

#[derive(Debug, Clone)]
pub struct Config {
    pub datastore: PathBuf,
    pub schedule: ScheduleConfig,
    pub cameras: Vec<CameraDescriptor>,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub period_seconds: u64,
    pub daylight_begin: String,
    pub daylight_end: String,
    pub suspend_to_memory: bool,
}

#[derive(Debug, Clone)]
pub struct CameraDescriptor {
    pub source: CameraSource,
    pub auth: Option<CameraAuth>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    Usb(u32),
    Http(String),
    Rtsp(String),
}

impl std::fmt::Display for CameraSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraSource::Usb(index) => write!(f, "usb://{}", index),
            CameraSource::Http(url) | CameraSource::Rtsp(url) => write!(f, "{}", url),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraAuth {
    #[serde(rename = "user-name")]
    pub username: String,
    pub password: String,
}

// ---------- Loader ----------

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let txt = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let doc: ConfigDoc = serde_json::from_str(&txt).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(doc)
}

fn validate(doc: ConfigDoc) -> Result<Config, ConfigError> {
    if doc.cameras.is_empty() {
        return Err(ConfigError::NoCameras);
    }

    let cameras = doc
        .cameras
        .into_iter()
        .map(|cam| {
            Ok(CameraDescriptor {
                source: parse_camera_source(&cam.source)?,
                auth: cam.auth,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let schedule = ScheduleConfig {
        period_seconds: parse_wait_time(&doc.schedule.seconds_to_wait)?,
        daylight_begin: doc.schedule.start_time,
        daylight_end: doc.schedule.end_time,
        suspend_to_memory: parse_suspend(&doc.schedule.suspend)?,
    };

    Ok(Config {
        datastore: PathBuf::from(doc.datastore),
        schedule,
        cameras,
    })
}

fn parse_wait_time(wait: &WaitTime) -> Result<u64, ConfigError> {
    let seconds = match wait {
        WaitTime::Seconds(n) => *n,
        WaitTime::Spelled(s) => {
            let s = s.trim();
            let (digits, factor) = match s.as_bytes().last().copied() {
                Some(b's') => (&s[..s.len() - 1], 1),
                Some(b'm') => (&s[..s.len() - 1], 60),
                Some(b'h') => (&s[..s.len() - 1], 3600),
                _ => (s, 1),
            };
            let n: u64 = digits.parse().map_err(|_| ConfigError::BadWait {
                value: s.to_string(),
            })?;
            n * factor
        }
    };
    if seconds == 0 {
        return Err(ConfigError::ZeroWait);
    }
    Ok(seconds)
}

fn parse_camera_source(uri: &str) -> Result<CameraSource, ConfigError> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| ConfigError::MissingScheme {
            uri: uri.to_string(),
        })?;
    match scheme {
        "usb" => {
            let index: u32 = rest.parse().map_err(|_| ConfigError::BadDeviceIndex {
                uri: uri.to_string(),
            })?;
            Ok(CameraSource::Usb(index))
        }
        "http" | "https" => Ok(CameraSource::Http(uri.to_string())),
        "rtsp" => Ok(CameraSource::Rtsp(uri.to_string())),
        other => Err(ConfigError::UnsupportedScheme {
            uri: uri.to_string(),
            scheme: other.to_string(),
        }),
    }
}

fn parse_suspend(value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_uppercase().as_str() {
        "YES" => Ok(true),
        "NO" => Ok(false),
        _ => Err(ConfigError::BadSuspend {
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_DOC: &str = r#"{
        "camshot-datastore": "/var/lib/camshot",
        "camshot-schedule": {
            "seconds-to-wait": "15m",
            "start-time": "0 8 * * 1-5",
            "end-time": "30 18 * * 1-5",
            "suspend": "YES"
        },
        "cameras-list": [
            { "source": "usb://0" },
            {
                "source": "http://10.0.0.8/snapshot.jpg",
                "optional-auth": { "user-name": "cam", "password": "secret" }
            },
            { "source": "rtsp://10.0.0.9:554/video" }
        ]
    }"#;

    fn parse(doc: &str) -> Result<Config, ConfigError> {
        validate(serde_json::from_str(doc).expect("valid json"))
    }

    #[test]
    fn full_document_parses() {
        let cfg = parse(FULL_DOC).expect("config");
        assert_eq!(cfg.datastore, PathBuf::from("/var/lib/camshot"));
        assert_eq!(cfg.schedule.period_seconds, 900);
        assert_eq!(cfg.schedule.daylight_begin, "0 8 * * 1-5");
        assert!(cfg.schedule.suspend_to_memory);
        assert_eq!(cfg.cameras.len(), 3);
        assert_eq!(cfg.cameras[0].source, CameraSource::Usb(0));
        assert!(cfg.cameras[0].auth.is_none());
        let auth = cfg.cameras[1].auth.as_ref().expect("auth");
        assert_eq!(auth.username, "cam");
        assert_eq!(auth.password, "secret");
        assert!(matches!(cfg.cameras[2].source, CameraSource::Rtsp(_)));
    }

    #[test]
    fn wait_time_accepts_integer_and_durations() {
        assert_eq!(parse_wait_time(&WaitTime::Seconds(900)).unwrap(), 900);
        assert_eq!(
            parse_wait_time(&WaitTime::Spelled("900".into())).unwrap(),
            900
        );
        assert_eq!(parse_wait_time(&WaitTime::Spelled("15m".into())).unwrap(), 900);
        assert_eq!(
            parse_wait_time(&WaitTime::Spelled("2h".into())).unwrap(),
            7200
        );
        assert_eq!(parse_wait_time(&WaitTime::Spelled("45s".into())).unwrap(), 45);
    }

    #[test]
    fn wait_time_rejects_expressions() {
        assert!(matches!(
            parse_wait_time(&WaitTime::Spelled("15*60".into())),
            Err(ConfigError::BadWait { .. })
        ));
    }

    #[test]
    fn wait_time_rejects_zero() {
        assert!(matches!(
            parse_wait_time(&WaitTime::Seconds(0)),
            Err(ConfigError::ZeroWait)
        ));
    }

    #[test]
    fn camera_source_rejects_bad_uris() {
        assert!(matches!(
            parse_camera_source("0"),
            Err(ConfigError::MissingScheme { .. })
        ));
        assert!(matches!(
            parse_camera_source("usb://first"),
            Err(ConfigError::BadDeviceIndex { .. })
        ));
        assert!(matches!(
            parse_camera_source("ftp://10.0.0.1/img"),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn suspend_flag_is_yes_or_no() {
        assert!(parse_suspend("YES").unwrap());
        assert!(!parse_suspend("no").unwrap());
        assert!(matches!(
            parse_suspend("maybe"),
            Err(ConfigError::BadSuspend { .. })
        ));
    }

    #[test]
    fn empty_camera_list_is_rejected() {
        let doc = r#"{
            "camshot-datastore": "/tmp",
            "camshot-schedule": {
                "seconds-to-wait": 60,
                "start-time": "0 8 * * *",
                "end-time": "0 18 * * *",
                "suspend": "NO"
            },
            "cameras-list": []
        }"#;
        assert!(matches!(parse(doc), Err(ConfigError::NoCameras)));
    }
}
