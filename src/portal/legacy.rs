//! Scraper for the legacy ASP.NET consultation form.
//!
//! The form lists cities, and selecting a city (an async postback) lists the
//! judicial entities of that city. The session cookie issued by the landing
//! page is carried explicitly from request to request.
use crate::config::PortalSettings;
use crate::html::{input_value, select_options, SelectOption};
use crate::model::EntityRecord;
use anyhow::{anyhow, Context, Result};

pub const CITY_SELECT_ID: &str = "ddlCiudad";
pub const ENTITY_SELECT_ID: &str = "ddlEntidadEspecialidad";
const SESSION_COOKIE: &str = "ASP.NET_SessionId";
const MANAGER_SCRIPT: &str = "upPanelCiudad|ddlCiudad";
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:136.0) Gecko/20100101 Firefox/136.0";

/// Something that can list every judicial entity.
pub trait EntitySource {
    fn extract(&self) -> Result<Vec<EntityRecord>>;
}

/// Hidden form state read from the landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub manager_script_hidden_field: String,
    pub proceso_id: String,
    pub session_id: String,
}

impl FormState {
    pub fn from_page(html: &str) -> Self {
        Self {
            manager_script_hidden_field: input_value(html, "managerScript_HiddenField")
                .unwrap_or_default(),
            proceso_id: input_value(html, "txtNumeroProcesoID").unwrap_or_default(),
            session_id: input_value(html, "nwoDediSpUsIdlroWehT_ID").unwrap_or_default(),
        }
    }

    /// Async postback fields selecting `city`.
    pub fn city_payload(&self, city: &str) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = [
            ("managerScript", MANAGER_SCRIPT),
            ("managerScript_HiddenField", self.manager_script_hidden_field.as_str()),
            ("ddlCiudad", city),
            ("ddlEntidadEspecialidad", ""),
            ("rblConsulta", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        if !self.proceso_id.is_empty() {
            fields.push((self.proceso_id.clone(), String::new()));
        }
        let fixed = [
            ("SliderNumeroProceso", "1"),
            ("ddlTipoSujeto", "0"),
            ("ddlTipoPersona", "0"),
            ("SliderConsultaNom", "0"),
            ("ddlYear", "..."),
            ("tbxNumeroConstruido", "050013103"),
            ("SliderConstruirNumero", "0"),
            ("ddlTipoSujeto2", "0"),
            ("ddlTipoPersona2", "0"),
            ("SliderActFecha", "0"),
            ("SliderMagistrado", "0"),
            ("ddlTipoPersonaCN", "1"),
            ("SliderConsultaIdSujeto", "0"),
            ("HumanVerification", "SLIDER"),
            ("txtNumeroProcesoID", self.proceso_id.as_str()),
            ("nwoDediSpUsIdlroWehT_ID", self.session_id.as_str()),
            ("ddlJuzgados", "0"),
            ("hdControl", ""),
            ("BotDetector", "BotValue"),
            ("__EVENTTARGET", ""),
            ("__EVENTARGUMENT", ""),
            ("__LASTFOCUS", ""),
            ("__VIEWSTATE", ""),
            ("__ASYNCPOST", "true"),
        ];
        fields.extend(fixed.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        if !self.session_id.is_empty() {
            fields.push((self.session_id.clone(), "Consultar".to_string()));
        }
        fields
    }
}

/// Drop the placeholder options (`""` and `"0"`).
pub fn real_options(options: Vec<SelectOption>) -> Vec<SelectOption> {
    options
        .into_iter()
        .filter(|option| !option.value.is_empty() && option.value != "0")
        .collect()
}

/// Pull the session id out of `Set-Cookie` header values.
pub fn session_cookie<'a>(set_cookies: impl IntoIterator<Item = &'a str>) -> Option<String> {
    set_cookies.into_iter().find_map(|header| {
        let pair = header.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        (name.trim() == SESSION_COOKIE && !value.is_empty()).then(|| value.trim().to_string())
    })
}

pub struct LegacyPortal {
    url: String,
    agent: ureq::Agent,
}

struct Landing {
    html: String,
    session: Option<String>,
}

impl LegacyPortal {
    pub fn new(settings: &PortalSettings) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(settings.fetch_timeout))
            .build()
            .into();
        Self {
            url: settings.legacy_url.clone(),
            agent,
        }
    }

    fn landing(&self) -> Result<Landing> {
        let mut response = self
            .agent
            .get(self.url.as_str())
            .header("User-Agent", USER_AGENT)
            .call()
            .with_context(|| format!("fetch {}", self.url))?;
        let session = session_cookie(
            response
                .headers()
                .get_all("set-cookie")
                .iter()
                .filter_map(|value| value.to_str().ok()),
        );
        let html = response
            .body_mut()
            .read_to_string()
            .context("read landing page")?;
        Ok(Landing { html, session })
    }

    fn post_city(&self, session: Option<&str>, form: &FormState, city: &str) -> Result<String> {
        let mut request = self
            .agent
            .post(self.url.as_str())
            .header("User-Agent", USER_AGENT)
            .header("Accept", "*/*")
            .header("X-Requested-With", "XMLHttpRequest")
            .header("X-MicrosoftAjax", "Delta=true")
            .header("Cache-Control", "no-cache")
            .header("Origin", "https://procesos.ramajudicial.gov.co")
            .header("Referer", self.url.as_str());
        if let Some(session) = session {
            request = request.header("Cookie", format!("{SESSION_COOKIE}={session}"));
        }
        let mut response = request
            .send_form(form.city_payload(city))
            .with_context(|| format!("submit city {city}"))?;
        response
            .body_mut()
            .read_to_string()
            .with_context(|| format!("read entities for city {city}"))
    }
}

impl EntitySource for LegacyPortal {
    fn extract(&self) -> Result<Vec<EntityRecord>> {
        let landing = self.landing()?;
        let form = FormState::from_page(&landing.html);
        let cities = real_options(select_options(&landing.html, CITY_SELECT_ID));
        if cities.is_empty() {
            return Err(anyhow!("no cities found on {}", self.url));
        }
        tracing::info!(cities = cities.len(), "found cities");

        let mut records = Vec::new();
        for city in cities {
            let body = self
                .post_city(landing.session.as_deref(), &form, &city.value)
                .with_context(|| format!("list entities for {}", city.text))?;
            let entities = real_options(select_options(&body, ENTITY_SELECT_ID));
            tracing::info!(city = %city.text, entities = entities.len(), "listed entities");
            records.extend(entities.into_iter().map(|entity| EntityRecord {
                entity_name: entity.text,
                entity_code: entity.value,
                jurisdiction: city.text.clone(),
            }));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_session_cookie() {
        let headers = [
            "other=1; path=/",
            "ASP.NET_SessionId=oyauyt5wodatpi4yv3cqkr34; path=/; HttpOnly",
        ];
        assert_eq!(
            session_cookie(headers).as_deref(),
            Some("oyauyt5wodatpi4yv3cqkr34")
        );
        assert_eq!(session_cookie(["ASP.NET_SessionId=; path=/"]), None);
    }

    #[test]
    fn city_payload_carries_form_state() {
        let form = FormState {
            manager_script_hidden_field: ";;Ajax".to_string(),
            proceso_id: "abc123".to_string(),
            session_id: "sess9".to_string(),
        };
        let payload = form.city_payload("05001");
        let get = |key: &str| {
            payload
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("ddlCiudad"), Some("05001"));
        assert_eq!(get("managerScript"), Some("upPanelCiudad|ddlCiudad"));
        assert_eq!(get("abc123"), Some(""));
        assert_eq!(get("txtNumeroProcesoID"), Some("abc123"));
        assert_eq!(get("sess9"), Some("Consultar"));
        assert_eq!(get("__ASYNCPOST"), Some("true"));
    }

    #[test]
    fn payload_without_session_has_no_consult_action() {
        let payload = FormState::default().city_payload("1");
        assert!(!payload.iter().any(|(_, v)| v == "Consultar"));
    }

    #[test]
    fn filters_placeholder_options() {
        let page = r#"|updatePanel|upPanelCiudad|<select id="ddlEntidadEspecialidad">
            <option value="0">[Seleccione]</option>
            <option value="">--</option>
            <option value="310-1">JUZGADO CIVIL DEL CIRCUITO</option>
        </select>|"#;
        let options = real_options(select_options(page, ENTITY_SELECT_ID));
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].value, "310-1");
        assert_eq!(options[0].text, "JUZGADO CIVIL DEL CIRCUITO");
    }
}
