//! Client for rendering Mermaid diagrams to PNG via the Kroki web service.

use std::time::Duration;

use crate::error::{DiagramError, Result};

const KROKI_MERMAID_PNG_URL: &str = "https://kroki.io/mermaid/png";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("hwpx-diagrams/", env!("CARGO_PKG_VERSION"));

/// Render Mermaid source to a PNG image.
///
/// Returns the rendered bytes on success. The caller decides what to do on
/// error — per the conversion pipeline's policy, that is always "log a
/// warning and fall back to a plain-text code block", never a fatal error.
#[cfg(feature = "kroki")]
pub fn render_mermaid_png(source: &str) -> Result<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let response = client
        .post(KROKI_MERMAID_PNG_URL)
        .header("Content-Type", "text/plain")
        .header("User-Agent", USER_AGENT)
        .body(source.trim().to_string())
        .send()?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().unwrap_or_else(|_| "unknown error".to_string());
        return Err(DiagramError::ServerError {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.bytes()?.to_vec())
}

#[cfg(not(feature = "kroki"))]
pub fn render_mermaid_png(_source: &str) -> Result<Vec<u8>> {
    Err(DiagramError::Disabled)
}

#[cfg(all(test, feature = "kroki"))]
mod tests {
    use super::*;

    #[test]
    #[ignore] // requires network access to kroki.io
    fn renders_a_simple_graph() {
        let png = render_mermaid_png("graph TD; A-->B;").expect("kroki reachable");
        assert_eq!(&png[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }
}

#[cfg(all(test, not(feature = "kroki")))]
mod tests_disabled {
    use super::*;

    #[test]
    fn returns_disabled_error_without_the_feature() {
        assert!(matches!(render_mermaid_png("graph TD;"), Err(DiagramError::Disabled)));
    }
}
