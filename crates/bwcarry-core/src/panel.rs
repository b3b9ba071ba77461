//! Panel admin API endpoints: inventory listing, bandwidth reset, limit update.
//!
//! Every call goes to the configured endpoint with `api=json`, the admin
//! key/secret pair and an `act=` selector.

use serde_json::Value;
use url::Url;

use crate::api::{redact, truncate_for_log, ApiClient, TransportError};
use crate::config::{ConfigError, PanelConfig};
use crate::error::UnitError;
use crate::model::ServerId;

/// Page selector for a paged inventory request (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

/// Endpoint builder and call wrapper around one [`ApiClient`].
#[derive(Debug)]
pub struct PanelApi {
    client: ApiClient,
    base: Url,
    api_key: String,
    api_secret: String,
}

impl PanelApi {
    pub fn new(client: ApiClient, panel: &PanelConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(panel.url.trim())
            .map_err(|e| ConfigError::Invalid(format!("panel.url: {}", e)))?;
        Ok(Self {
            client,
            base,
            api_key: panel.api_key.clone(),
            api_secret: panel.api_secret.clone(),
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn endpoint(&self, params: &[(&str, String)]) -> String {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in params {
                query.append_pair(k, v);
            }
            query
                .append_pair("api", "json")
                .append_pair("adminapikey", &self.api_key)
                .append_pair("adminapipass", &self.api_secret);
        }
        url.into()
    }

    /// Raw inventory response body: the whole list, or one page of it.
    pub fn list_servers(&self, page: Option<PageRequest>) -> Result<String, TransportError> {
        let mut params = vec![("act", "vs".to_string())];
        if let Some(p) = page {
            params.push(("page", p.page.to_string()));
            params.push(("reslen", p.size.to_string()));
        }
        self.client.request(&self.endpoint(&params), None)
    }

    /// Resets the server's usage counter. Succeeds only when the top-level `done`
    /// flag is set.
    pub fn reset_bandwidth(&self, id: ServerId) -> Result<(), UnitError> {
        let url = self.endpoint(&[
            ("act", "vs".to_string()),
            ("bwreset", id.to_string()),
        ]);
        let body = self.client.request(&url, None)?;
        check_flag(&body, "reset", &["done"])
    }

    /// Sets a new bandwidth limit, sending `plan_id` back unchanged so the plan
    /// assignment holds.
    /// Succeeds only when the nested `done.done` flag is set.
    pub fn update_bandwidth(
        &self,
        id: ServerId,
        new_limit: i64,
        plan_id: &str,
    ) -> Result<(), UnitError> {
        let url = self.endpoint(&[
            ("act", "managevps".to_string()),
            ("vpsid", id.to_string()),
        ]);
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("editvps", "1")
            .append_pair("bandwidth", &new_limit.to_string())
            .append_pair("plid", plan_id)
            .finish();
        let body = self.client.request(&url, Some(&form))?;
        check_flag(&body, "update", &["done", "done"])
    }
}

fn check_flag(body: &str, step: &'static str, path: &[&str]) -> Result<(), UnitError> {
    let rejected = |detail: String| UnitError::Rejected {
        step,
        detail: redact(&detail),
    };
    let value: Value = serde_json::from_str(body).map_err(|e| {
        rejected(format!(
            "response is not JSON ({}): {}",
            e,
            truncate_for_log(body, 200)
        ))
    })?;
    let flag = path.iter().try_fold(&value, |v, key| v.get(key));
    if flag.is_some_and(is_truthy) {
        Ok(())
    } else {
        Err(rejected(format!(
            "success flag `{}` not set: {}",
            path.join("."),
            truncate_for_log(body, 200)
        )))
    }
}

/// Panel success flags come back as booleans, numbers or strings.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false")
        }
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}
