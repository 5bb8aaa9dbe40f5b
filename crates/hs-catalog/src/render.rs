//! HTML rendering of catalog entries.

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::service::Service;

/// Render services as `<li>` entries for the index page.
pub(crate) fn render_list(services: &[Service]) -> String {
    services.iter().fold(String::new(), |mut out, service| {
        let _ = write!(out, "<li>{}</li>", render_entry(service));
        out
    })
}

/// Render a single service card.
fn render_entry(service: &Service) -> String {
    let Service { name, url, desc } = service;
    format!(
        r#"<a class="service-entry" href="{}"><article><h2>{}</h2><span>{}</span></article></a>"#,
        encode_double_quoted_attribute(url),
        encode_text(name),
        encode_text(desc),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn service(name: &str, url: &str, desc: &str) -> Service {
        Service {
            name: name.to_owned(),
            url: url.to_owned(),
            desc: desc.to_owned(),
        }
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_list(&[]), "");
    }

    #[test]
    fn test_render_entries_in_order() {
        let html = render_list(&[
            service("Grafana", "http://grafana:3000", "Dashboards"),
            service("NAS", "http://nas", "Storage"),
        ]);

        assert_eq!(
            html,
            "<li><a class=\"service-entry\" href=\"http://grafana:3000\"><article>\
             <h2>Grafana</h2><span>Dashboards</span></article></a></li>\
             <li><a class=\"service-entry\" href=\"http://nas\"><article>\
             <h2>NAS</h2><span>Storage</span></article></a></li>"
        );
    }

    #[test]
    fn test_render_escapes_values() {
        let html = render_list(&[service(
            "<script>alert(1)</script>",
            "http://x/\"onmouseover=\"alert(1)",
            "Tom & Jerry",
        )]);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("href=\"http://x/&quot;onmouseover=&quot;alert(1)\""));
        assert!(html.contains("Tom &amp; Jerry"));
    }
}
