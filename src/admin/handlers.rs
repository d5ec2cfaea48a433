use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::admin::service::{AdminError, AdminService, ServiceStatus};
use crate::features::FeatureFlag;
use crate::stats::ProxyStatsView;
use crate::upstream::Lang;

pub type AdminState = Arc<AdminService>;

/// Rejections are 200 with the localized text in the body, which is what the
/// admin page shows inline. Persistence faults are 500.
fn error_response(err: AdminError, lang: Lang) -> Response {
    let status = if err.is_rejection() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    if !err.is_rejection() {
        tracing::error!(error = %err, "Admin operation failed");
    }
    (status, err.message(lang)).into_response()
}

fn respond(result: Result<(), AdminError>, lang: Lang) -> Response {
    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e, lang),
    }
}

fn field<'a>(form: &'a HashMap<String, String>, key: &str) -> &'a str {
    form.get(key).map(String::as_str).unwrap_or_default()
}

pub async fn refresh_proxies(State(svc): State<AdminState>) -> &'static str {
    svc.refresh_proxies().await;
    "OK"
}

pub async fn list_proxies(State(svc): State<AdminState>) -> Json<ProxyStatsView> {
    Json(svc.list_proxy_stats())
}

pub async fn set_flag(svc: AdminState, headers: HeaderMap, flag: FeatureFlag, enabled: bool) -> Response {
    respond(svc.set_feature_flag(flag, enabled).await, Lang::from_headers(&headers))
}

pub async fn add_proxy(
    State(svc): State<AdminState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let lang = Lang::from_headers(&headers);
    let result = svc.add_proxy(field(&form, "proxy_type"), &form).await;
    respond(result.map(|_| ()), lang)
}

pub async fn update_proxy(
    State(svc): State<AdminState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let lang = Lang::from_headers(&headers);
    let result = svc
        .update_proxy(field(&form, "proxy_id"), field(&form, "proxy_type"), &form)
        .await;
    respond(result, lang)
}

pub async fn delete_proxy(
    State(svc): State<AdminState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let lang = Lang::from_headers(&headers);
    respond(svc.delete_proxy(field(&form, "proxy_id")).await, lang)
}

pub async fn get_proxy(
    State(svc): State<AdminState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let proxy_id = field(&query, "proxy_id");
    match svc.get_proxy(proxy_id).await {
        Ok(Some(def)) => Json(json!({
            "proxy_id": proxy_id,
            "proxy_type": def.proxy_type(),
            "properties": def.properties(),
        }))
        .into_response(),
        Ok(None) => Json(Value::Object(Default::default())).into_response(),
        Err(e) => error_response(e, Lang::from_headers(&headers)),
    }
}

pub async fn save_dns_bypass(
    State(svc): State<AdminState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let lang = Lang::from_headers(&headers);
    respond(svc.set_dns_bypass_hosts(field(&form, "content")).await, lang)
}

pub async fn get_status(State(svc): State<AdminState>) -> Json<ServiceStatus> {
    Json(svc.status())
}
