//! QR codes printed on drug labels and movement slips.
//!
//! The payload is a small JSON object so scanners can verify a label offline
//! before calling `/api/drugs/scan`.

use qrcode::render::svg;
use qrcode::QrCode;
use serde::Serialize;
use tracing::error;

use crate::model::drug::Drug;
use crate::model::movement::Movement;

const MIN_DIMENSION: u32 = 200;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("Failed to encode QR payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Failed to render QR code: {0}")]
    Render(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DrugLabel<'a> {
    drug_id: &'a str,
    batch_no: &'a str,
    name: &'a str,
    expiry_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MovementSlip<'a> {
    movement_id: &'a str,
    batch_no: &'a str,
    from: &'a str,
    to: &'a str,
}

/// JSON payload encoded into a drug's label.
pub fn drug_payload(drug: &Drug) -> Result<String, QrError> {
    Ok(serde_json::to_string(&DrugLabel {
        drug_id: &drug.drug_id,
        batch_no: &drug.batch_no,
        name: &drug.name,
        expiry_date: drug.expiry_date.format("%Y-%m-%d").to_string(),
    })?)
}

pub fn movement_payload(movement: &Movement) -> Result<String, QrError> {
    Ok(serde_json::to_string(&MovementSlip {
        movement_id: &movement.movement_id,
        batch_no: &movement.batch_no,
        from: movement.from.as_str(),
        to: movement.to.as_str(),
    })?)
}

/// Renders `payload` as a standalone SVG document.
pub fn render_svg(payload: &str) -> Result<String, QrError> {
    let code = QrCode::new(payload.as_bytes()).map_err(|e| {
        error!("QR encoding failed: {}", e);
        QrError::Render(e.to_string())
    })?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .build())
}

pub fn drug_qr(drug: &Drug) -> Result<String, QrError> {
    render_svg(&drug_payload(drug)?)
}

pub fn movement_qr(movement: &Movement) -> Result<String, QrError> {
    render_svg(&movement_payload(movement)?)
}
