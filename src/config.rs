//! Environment-driven settings.
//!
//! Settings are resolved once at startup (after loading an optional `.env`)
//! and passed explicitly into every client constructor.
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "https://consultaprocesos.ramajudicial.gov.co:448/api/v2";
pub const DEFAULT_LEGACY_URL: &str =
    "https://procesos.ramajudicial.gov.co/procesoscs/ConsultaJusticias21.aspx";
pub const DEFAULT_CASES_TAB: &str = "Procesos";
pub const DEFAULT_ENTITIES_TAB: &str = "Entidades";
pub const DEFAULT_REPORT_TAB: &str = "Reporte";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 900;
const DEFAULT_STALE_AFTER_DAYS: i64 = 180;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or blank.
    #[error("missing required setting(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A variable is present but cannot be parsed.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Where the spreadsheet tabs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSource {
    Google {
        spreadsheet_id: String,
        credentials_path: Option<PathBuf>,
        access_token: Option<String>,
    },
    /// Local JSON workbook, for offline runs.
    Workbook(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSettings {
    pub api_base_url: String,
    pub legacy_url: String,
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub max_workers: usize,
    pub run_timeout: Duration,
    pub stale_after_days: i64,
    pub lock_path: PathBuf,
    pub history_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub sheet: SheetSource,
    pub cases_tab: String,
    pub entities_tab: String,
    pub report_tab: String,
    pub portal: PortalSettings,
    pub run: RunSettings,
    mail: RawMail,
}

/// SMTP variables as found; validated only when mail is actually needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RawMail {
    server: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    sender: Option<String>,
    recipients: Vec<String>,
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let sheet = if let Some(path) = get("RAMA_WORKBOOK_PATH") {
            SheetSource::Workbook(PathBuf::from(path))
        } else if let Some(spreadsheet_id) = get("SPREADSHEET_ID") {
            SheetSource::Google {
                spreadsheet_id,
                credentials_path: get("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
                access_token: get("GOOGLE_OAUTH_ACCESS_TOKEN"),
            }
        } else {
            return Err(ConfigError::Missing(vec!["SPREADSHEET_ID or RAMA_WORKBOOK_PATH"]));
        };

        let portal = PortalSettings {
            api_base_url: get("RAMA_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            legacy_url: get("RAMA_LEGACY_URL").unwrap_or_else(|| DEFAULT_LEGACY_URL.to_string()),
            fetch_timeout: Duration::from_secs(parse_or(
                get("RAMA_FETCH_TIMEOUT_SECS"),
                "RAMA_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )?),
        };

        let max_workers = parse_or(get("RAMA_MAX_WORKERS"), "RAMA_MAX_WORKERS", DEFAULT_MAX_WORKERS)?;
        if max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RAMA_MAX_WORKERS",
                reason: "must be at least 1".to_string(),
            });
        }
        let stale_after_days = parse_or(
            get("RAMA_STALE_AFTER_DAYS"),
            "RAMA_STALE_AFTER_DAYS",
            DEFAULT_STALE_AFTER_DAYS,
        )?;
        if stale_after_days < 0 {
            return Err(ConfigError::InvalidValue {
                field: "RAMA_STALE_AFTER_DAYS",
                reason: "must not be negative".to_string(),
            });
        }
        let run = RunSettings {
            max_workers,
            run_timeout: Duration::from_secs(parse_or(
                get("RAMA_RUN_TIMEOUT_SECS"),
                "RAMA_RUN_TIMEOUT_SECS",
                DEFAULT_RUN_TIMEOUT_SECS,
            )?),
            stale_after_days,
            lock_path: get("RAMA_LOCK_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_lock_path),
            history_path: match get("RAMA_HISTORY_PATH") {
                Some(value) if value == "off" => None,
                Some(value) => Some(PathBuf::from(value)),
                None => default_history_path(),
            },
        };

        let username = get("SMTP_USERNAME");
        let mail = RawMail {
            server: get("SMTP_SERVER"),
            port: get("SMTP_PORT")
                .map(|raw| parse_value(&raw, "SMTP_PORT"))
                .transpose()?,
            sender: get("SMTP_SENDER").or_else(|| username.clone()),
            username,
            password: get("SMTP_PASSWORD"),
            recipients: get("EMAIL_RECIPIENT")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|addr| !addr.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(Settings {
            sheet,
            cases_tab: get("RAMA_CASES_TAB").unwrap_or_else(|| DEFAULT_CASES_TAB.to_string()),
            entities_tab: get("RAMA_ENTITIES_TAB")
                .unwrap_or_else(|| DEFAULT_ENTITIES_TAB.to_string()),
            report_tab: get("RAMA_REPORT_TAB").unwrap_or_else(|| DEFAULT_REPORT_TAB.to_string()),
            portal,
            run,
            mail,
        })
    }

    /// SMTP settings, failing with every missing variable listed.
    pub fn require_mail(&self) -> Result<MailSettings, ConfigError> {
        let mail = &self.mail;
        let mut missing = Vec::new();
        if mail.server.is_none() {
            missing.push("SMTP_SERVER");
        }
        if mail.username.is_none() {
            missing.push("SMTP_USERNAME");
        }
        if mail.password.is_none() {
            missing.push("SMTP_PASSWORD");
        }
        if mail.recipients.is_empty() {
            missing.push("EMAIL_RECIPIENT");
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        Ok(MailSettings {
            server: mail.server.clone().unwrap_or_default(),
            port: mail.port.unwrap_or(DEFAULT_SMTP_PORT),
            username: mail.username.clone().unwrap_or_default(),
            password: mail.password.clone().unwrap_or_default(),
            sender: mail.sender.clone().unwrap_or_default(),
            recipients: mail.recipients.clone(),
        })
    }

    /// Spreadsheet id for links in the digest, when the sheet is remote.
    pub fn spreadsheet_id(&self) -> Option<&str> {
        match &self.sheet {
            SheetSource::Google { spreadsheet_id, .. } => Some(spreadsheet_id),
            SheetSource::Workbook(_) => None,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    field: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse_value(&raw, field),
        None => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(raw: &str, field: &'static str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|err| ConfigError::InvalidValue {
        field,
        reason: format!("{raw:?}: {err}"),
    })
}

fn default_lock_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("rama")
        .join("procesos.lock")
}

fn default_history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("rama").join("history.jsonl"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
