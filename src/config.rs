//! Environment-driven configuration. Everything has a workable default
//! except the external-service credentials.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root for the database and stored receipt images.
    pub data_dir: PathBuf,
    pub bind_addr: String,

    pub ocr_endpoint: String,
    pub ocr_api_key: String,
    pub ocr_timeout: Duration,

    pub line_push_url: String,
    pub line_channel_token: String,
    pub staff_group_id: String,
    pub reviewer_ids: Vec<String>,

    /// Committee mailbox; reports are logged but not mailed when absent.
    pub smtp: Option<SmtpConfig>,
    pub report_times: Vec<NaiveTime>,
}

const DEFAULT_OCR_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
const DEFAULT_LINE_PUSH_URL: &str = "https://api.line.me/v2/bot/message/push";
const DEFAULT_REPORT_TIMES: &str = "09:00,16:00";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = match std::env::var("EXTENSO_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".extenso"),
        };

        let ocr_timeout_secs: u64 = optional("EXTENSO_OCR_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "EXTENSO_OCR_TIMEOUT_SECS",
                    reason: format!("not a number: {raw}"),
                })
            })
            .transpose()?
            .unwrap_or(30);

        let smtp = match optional("EXTENSO_SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: optional("EXTENSO_SMTP_PORT")
                    .map(|raw| {
                        raw.parse().map_err(|_| ConfigError::Invalid {
                            var: "EXTENSO_SMTP_PORT",
                            reason: format!("not a port number: {raw}"),
                        })
                    })
                    .transpose()?
                    .unwrap_or(587),
                username: required("EXTENSO_SMTP_USERNAME")?,
                password: required("EXTENSO_SMTP_PASSWORD")?,
                from: required("EXTENSO_REPORT_FROM")?,
                to: required("EXTENSO_REPORT_TO")?,
            }),
            None => None,
        };

        Ok(Self {
            data_dir,
            bind_addr: optional("EXTENSO_BIND_ADDR")
                .unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            ocr_endpoint: optional("EXTENSO_OCR_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_OCR_ENDPOINT.to_string()),
            ocr_api_key: required("EXTENSO_OCR_API_KEY")?,
            ocr_timeout: Duration::from_secs(ocr_timeout_secs),
            line_push_url: optional("EXTENSO_LINE_PUSH_URL")
                .unwrap_or_else(|| DEFAULT_LINE_PUSH_URL.to_string()),
            line_channel_token: required("EXTENSO_LINE_CHANNEL_TOKEN")?,
            staff_group_id: required("EXTENSO_STAFF_GROUP_ID")?,
            reviewer_ids: parse_id_list(
                &optional("EXTENSO_REVIEWER_IDS").unwrap_or_default(),
            ),
            smtp,
            report_times: parse_report_times(
                &optional("EXTENSO_REPORT_TIMES")
                    .unwrap_or_else(|| DEFAULT_REPORT_TIMES.to_string()),
            )?,
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingVar(var))
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Comma-separated list of messaging-channel ids.
fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma-separated "HH:MM" times for the daily report runs.
fn parse_report_times(raw: &str) -> Result<Vec<NaiveTime>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            NaiveTime::parse_from_str(t, "%H:%M").map_err(|_| ConfigError::Invalid {
                var: "EXTENSO_REPORT_TIMES",
                reason: format!("expected HH:MM, got {t}"),
            })
        })
        .collect()
}

pub fn default_log_filter() -> String {
    "info,extenso=debug".to_string()
}
