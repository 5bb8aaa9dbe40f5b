//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Error page template; `{{context}}` and `{{e}}` are substituted.
const ERROR_TEMPLATE: &str = include_str!("../templates/error.template.html");

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The service catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] hs_catalog::CatalogError),

    /// Live reload was requested but is not enabled.
    #[error("Live reload is disabled")]
    LiveReloadDisabled,

    /// The catalog watcher could not be started.
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// What the server was doing when the error occurred.
    fn context(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "loading the service catalog",
            Self::LiveReloadDisabled => "opening the live reload stream",
            Self::Watch(_) => "watching the service catalog",
            Self::Io(_) => "handling the request",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if matches!(self, Self::LiveReloadDisabled) {
            return (StatusCode::NOT_FOUND, self.to_string()).into_response();
        }

        let context = self.context();
        tracing::warn!(context, error = %self, "Request failed");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(render_error_page(context, &self.to_string())),
        )
            .into_response()
    }
}

/// Fill the error template with escaped values.
pub(crate) fn render_error_page(context: &str, error: &str) -> String {
    ERROR_TEMPLATE
        .replace("{{context}}", &html_escape::encode_text(context))
        .replace("{{e}}", &html_escape::encode_text(error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_page_escapes() {
        let html = render_error_page("loading <cfg>", "bad & worse");

        assert!(html.contains("loading &lt;cfg&gt;"));
        assert!(html.contains("bad &amp; worse"));
        assert!(!html.contains("{{context}}"));
        assert!(!html.contains("{{e}}"));
    }

    #[test]
    fn test_catalog_error_is_500() {
        let err = ServerError::Catalog(hs_catalog::CatalogError::CreateDir {
            path: "/root/cfg".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });

        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_live_reload_disabled_is_404() {
        let response = ServerError::LiveReloadDisabled.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
