use super::{ConfigError, SheetSource, Settings, DEFAULT_API_BASE_URL, DEFAULT_CASES_TAB};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn requires_a_sheet_source() {
    let err = settings_from(&[]).expect_err("no sheet source");
    assert_eq!(
        err,
        ConfigError::Missing(vec!["SPREADSHEET_ID or RAMA_WORKBOOK_PATH"])
    );
}

#[test]
fn google_source_with_defaults() {
    let settings = settings_from(&[
        ("SPREADSHEET_ID", "sheet-123"),
        ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/rama/creds.json"),
        ("RAMA_HISTORY_PATH", "off"),
    ])
    .expect("settings");

    assert_eq!(
        settings.sheet,
        SheetSource::Google {
            spreadsheet_id: "sheet-123".to_string(),
            credentials_path: Some(PathBuf::from("/etc/rama/creds.json")),
            access_token: None,
        }
    );
    assert_eq!(settings.spreadsheet_id(), Some("sheet-123"));
    assert_eq!(settings.cases_tab, DEFAULT_CASES_TAB);
    assert_eq!(settings.portal.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(settings.portal.fetch_timeout, Duration::from_secs(30));
    assert_eq!(settings.run.max_workers, 4);
    assert_eq!(settings.run.history_path, None);
}

#[test]
fn workbook_takes_precedence_and_overrides_apply() {
    let settings = settings_from(&[
        ("SPREADSHEET_ID", "sheet-123"),
        ("RAMA_WORKBOOK_PATH", "/tmp/book.json"),
        ("RAMA_API_BASE_URL", "http://localhost:8080/api/v2/"),
        ("RAMA_MAX_WORKERS", "8"),
        ("RAMA_RUN_TIMEOUT_SECS", "60"),
        ("RAMA_LOCK_PATH", "/tmp/rama.lock"),
        ("RAMA_CASES_TAB", "Casos"),
    ])
    .expect("settings");

    assert_eq!(settings.sheet, SheetSource::Workbook(PathBuf::from("/tmp/book.json")));
    assert_eq!(settings.spreadsheet_id(), None);
    assert_eq!(settings.portal.api_base_url, "http://localhost:8080/api/v2");
    assert_eq!(settings.run.max_workers, 8);
    assert_eq!(settings.run.run_timeout, Duration::from_secs(60));
    assert_eq!(settings.run.lock_path, PathBuf::from("/tmp/rama.lock"));
    assert_eq!(settings.cases_tab, "Casos");
}

#[test]
fn rejects_unparsable_numbers() {
    let err = settings_from(&[("RAMA_WORKBOOK_PATH", "b.json"), ("RAMA_MAX_WORKERS", "many")])
        .expect_err("invalid worker count");
    assert!(matches!(
        err,
        ConfigError::InvalidValue { field: "RAMA_MAX_WORKERS", .. }
    ));

    let err = settings_from(&[("RAMA_WORKBOOK_PATH", "b.json"), ("RAMA_MAX_WORKERS", "0")])
        .expect_err("zero workers");
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn mail_settings_list_every_missing_variable() {
    let settings = settings_from(&[
        ("RAMA_WORKBOOK_PATH", "b.json"),
        ("SMTP_SERVER", "smtp.example.org"),
    ])
    .expect("settings");

    let err = settings.require_mail().expect_err("incomplete mail settings");
    assert_eq!(
        err,
        ConfigError::Missing(vec!["SMTP_USERNAME", "SMTP_PASSWORD", "EMAIL_RECIPIENT"])
    );
}

#[test]
fn mail_settings_default_port_and_sender() {
    let settings = settings_from(&[
        ("RAMA_WORKBOOK_PATH", "b.json"),
        ("SMTP_SERVER", "smtp.example.org"),
        ("SMTP_USERNAME", "robot@example.org"),
        ("SMTP_PASSWORD", "secret"),
        ("EMAIL_RECIPIENT", "a@example.org, b@example.org,"),
    ])
    .expect("settings");

    let mail = settings.require_mail().expect("mail settings");
    assert_eq!(mail.port, 587);
    assert_eq!(mail.sender, "robot@example.org");
    assert_eq!(mail.recipients, vec!["a@example.org", "b@example.org"]);
}
