use axum::{
    extract::{Path, RawQuery},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config;
use crate::error::ApiError;

/// GET /gis/*path - pass-through to the external GIS service so its layers
/// are reachable from the app's origin over HTTPS. This handler only builds
/// the target URL; upstream failures are relayed as 502.
pub async fn proxy(Path(path): Path<String>, RawQuery(query): RawQuery) -> Result<Response, ApiError> {
    let root = &config::config().integrations.gis_proxy_root;
    let target = build_target_url(root, &path, query.as_deref())
        .map_err(|_| ApiError::bad_request("Invalid GIS path"))?;

    let upstream = reqwest::get(target.clone()).await.map_err(|e| {
        tracing::warn!("GIS upstream request to {} failed: {}", target, e);
        ApiError::bad_gateway("GIS service unavailable")
    })?;

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let body = upstream.bytes().await.map_err(|e| {
        tracing::warn!("GIS upstream body read failed: {}", e);
        ApiError::bad_gateway("GIS service unavailable")
    })?;

    Ok((status, [(header::CONTENT_TYPE, content_type)], body).into_response())
}

fn build_target_url(root: &str, path: &str, query: Option<&str>) -> Result<url::Url, url::ParseError> {
    let mut target = url::Url::parse(&format!(
        "{}/{}",
        root.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))?;
    target.set_query(query);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_path_suffix_to_gis_root() {
        let url = build_target_url(
            "http://gis.phila.gov/ArcGIS/rest/services/PhilaGov",
            "MapServer/export",
            None,
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://gis.phila.gov/ArcGIS/rest/services/PhilaGov/MapServer/export"
        );
    }

    #[test]
    fn preserves_query_string_and_extra_slashes() {
        let url = build_target_url(
            "http://gis.example.org/root/",
            "/layers/0/query",
            Some("where=1%3D1&f=json"),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://gis.example.org/root/layers/0/query?where=1%3D1&f=json"
        );
    }
}
