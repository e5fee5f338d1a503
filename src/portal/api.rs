//! JSON consultation API client.
//!
//! A case lookup is two requests: the process search by radicado, then the
//! first page of actuaciones for the matched process. The first actuación is
//! the most recent one.
use super::{FetchError, PortalClient};
use crate::config::PortalSettings;
use crate::dates::parse_date;
use crate::detect::normalize_status;
use crate::model::FetchResult;
use serde::Deserialize;
use std::collections::BTreeMap;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:144.0) Gecko/20100101 Firefox/144.0";
const PORTAL_ORIGIN: &str = "https://consultaprocesos.ramajudicial.gov.co";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProcessSearch {
    #[serde(default)]
    pub procesos: Vec<ProcessSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProcessSummary {
    pub id_proceso: Option<i64>,
    pub llave_proceso: Option<String>,
    pub despacho: Option<String>,
    pub departamento: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ActionPage {
    #[serde(default)]
    pub actuaciones: Vec<Actuacion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Actuacion {
    pub fecha_actuacion: Option<String>,
    pub actuacion: Option<String>,
    pub anotacion: Option<String>,
    pub fecha_inicial: Option<String>,
    pub fecha_final: Option<String>,
    pub fecha_registro: Option<String>,
    pub llave_proceso: Option<String>,
}

pub struct RamaApi {
    base_url: String,
    agent: ureq::Agent,
}

impl RamaApi {
    pub fn new(settings: &PortalSettings) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(settings.fetch_timeout))
            .build()
            .into();
        Self {
            base_url: settings.api_base_url.clone(),
            agent,
        }
    }

    fn search(&self, case_id: &str) -> Result<ProcessSearch, FetchError> {
        let url = format!("{}/Procesos/Consulta/NumeroRadicacion", self.base_url);
        let mut response = self
            .agent
            .get(url.as_str())
            .query("numero", case_id)
            .query("SoloActivos", "false")
            .query("pagina", "1")
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json, text/plain, */*")
            .header("Origin", PORTAL_ORIGIN)
            .header("Referer", "https://consultaprocesos.ramajudicial.gov.co/")
            .call()?;
        Ok(response.body_mut().read_json::<ProcessSearch>()?)
    }

    fn actions(&self, id_proceso: i64) -> Result<ActionPage, FetchError> {
        let url = format!("{}/Proceso/Actuaciones/{id_proceso}", self.base_url);
        let mut response = self
            .agent
            .get(url.as_str())
            .query("pagina", "1")
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json, text/plain, */*")
            .header("Origin", PORTAL_ORIGIN)
            .header("Referer", "https://consultaprocesos.ramajudicial.gov.co/")
            .call()?;
        Ok(response.body_mut().read_json::<ActionPage>()?)
    }
}

impl PortalClient for RamaApi {
    fn fetch(&self, case_id: &str) -> Result<FetchResult, FetchError> {
        let search = self.search(case_id)?;
        let Some(process) = search.procesos.into_iter().next() else {
            return Ok(FetchResult::not_found(case_id));
        };
        let id_proceso = process
            .id_proceso
            .ok_or_else(|| FetchError::Malformed("process without idProceso".to_string()))?;
        let page = self.actions(id_proceso)?;
        latest_state(case_id, id_proceso, &process, page)
    }
}

/// Build the fetch result from the newest actuación of a found process.
pub(super) fn latest_state(
    case_id: &str,
    id_proceso: i64,
    process: &ProcessSummary,
    page: ActionPage,
) -> Result<FetchResult, FetchError> {
    let latest = page
        .actuaciones
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Malformed(format!("no actuaciones for process {id_proceso}")))?;
    let status = normalize_status(latest.actuacion.as_deref().unwrap_or(""));
    if status.is_empty() {
        return Err(FetchError::Malformed("latest actuación has no text".to_string()));
    }
    let raw_date = latest
        .fecha_actuacion
        .as_deref()
        .ok_or_else(|| FetchError::Malformed("latest actuación has no fechaActuacion".to_string()))?;
    let update_date = parse_date(raw_date)
        .map_err(|err| FetchError::Malformed(format!("fechaActuacion: {err}")))?;

    let mut result = FetchResult::found(case_id, status, Some(update_date));
    let mut raw = BTreeMap::new();
    raw.insert("id_proceso".to_string(), id_proceso.to_string());
    let optional = [
        ("anotacion", latest.anotacion),
        ("fecha_inicial", latest.fecha_inicial),
        ("fecha_final", latest.fecha_final),
        ("fecha_registro", latest.fecha_registro),
        ("llave_proceso", latest.llave_proceso.or_else(|| process.llave_proceso.clone())),
        ("despacho", process.despacho.clone()),
        ("departamento", process.departamento.clone()),
    ];
    for (key, value) in optional {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            raw.insert(key.to_string(), value.trim().to_string());
        }
    }
    result.raw_fields = raw;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn search(json: &str) -> ProcessSearch {
        serde_json::from_str(json).expect("parse search")
    }

    fn page(json: &str) -> ActionPage {
        serde_json::from_str(json).expect("parse actuaciones")
    }

    #[test]
    fn parses_search_payload() {
        let parsed = search(
            r#"{"tipoConsulta":"NumeroRadicacion","procesos":[{"idProceso":137,"llaveProceso":"050013103001","despacho":"JUZGADO 001 CIVIL","departamento":"ANTIOQUIA","esPrivado":false}],"paginacion":{"cantidadRegistros":1}}"#,
        );
        assert_eq!(parsed.procesos.len(), 1);
        assert_eq!(parsed.procesos[0].id_proceso, Some(137));

        assert!(search(r#"{"procesos":[]}"#).procesos.is_empty());
        assert!(search(r#"{}"#).procesos.is_empty());
    }

    #[test]
    fn latest_actuacion_becomes_current_state() {
        let process = search(r#"{"procesos":[{"idProceso":9,"despacho":" JUZGADO 3 "}]}"#)
            .procesos
            .remove(0);
        let actions = page(
            r#"{"actuaciones":[
                {"fechaActuacion":"2025-02-12T00:00:00","actuacion":"Fijacion  estado","anotacion":"","fechaRegistro":"2025-02-12T00:00:00","llaveProceso":"050013103001"},
                {"fechaActuacion":"2025-01-02T00:00:00","actuacion":"Auto admite"}
            ]}"#,
        );

        let result = latest_state("050013103001", 9, &process, actions).expect("state");
        assert!(result.found);
        assert_eq!(result.current_status, "Fijacion estado");
        assert_eq!(result.current_update_date, NaiveDate::from_ymd_opt(2025, 2, 12));
        assert_eq!(result.raw_fields.get("despacho").map(String::as_str), Some("JUZGADO 3"));
        assert_eq!(result.raw_fields.get("id_proceso").map(String::as_str), Some("9"));
        assert!(!result.raw_fields.contains_key("anotacion"));
    }

    #[test]
    fn empty_actuaciones_are_malformed() {
        let process = search(r#"{"procesos":[{"idProceso":9}]}"#).procesos.remove(0);
        let err = latest_state("x", 9, &process, page(r#"{"actuaciones":[]}"#))
            .expect_err("no actuaciones");
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn bad_dates_are_malformed() {
        let process = search(r#"{"procesos":[{"idProceso":9}]}"#).procesos.remove(0);
        let err = latest_state(
            "x",
            9,
            &process,
            page(r#"{"actuaciones":[{"fechaActuacion":"mañana","actuacion":"Auto"}]}"#),
        )
        .expect_err("bad date");
        assert!(matches!(err, FetchError::Malformed(_)));
    }
}
