//! QR rendering of the pairing payload for terminals and SVG files.

use anyhow::{Context, Result};
use qrcode::render::{svg, unicode};
use qrcode::QrCode;

use super::PairingPayload;

fn encode(payload: &PairingPayload) -> Result<QrCode> {
    QrCode::new(payload.qr_payload().as_bytes()).context("Failed to encode pairing QR code")
}

/// Render the payload with unicode half blocks.
///
/// Colours are inverted so the code scans on dark terminal backgrounds.
pub fn render_terminal(payload: &PairingPayload) -> Result<String> {
    let code = encode(payload)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

/// Render the payload as a standalone SVG document
pub fn render_svg(payload: &PairingPayload) -> Result<String> {
    let code = encode(payload)?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(380, 380)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PairingPayload {
        PairingPayload {
            name: "abcde".to_string(),
            password: "123456".to_string(),
        }
    }

    #[test]
    fn test_render_terminal_is_square_block() {
        let rendered = render_terminal(&sample()).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines.len() > 10);
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn test_render_svg_document() {
        let rendered = render_svg(&sample()).unwrap();
        assert!(rendered.contains("<svg"));
        assert!(rendered.contains("#000000"));
    }
}
