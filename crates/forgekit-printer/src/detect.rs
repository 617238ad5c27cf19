//! Printer model detection.
//!
//! Maps the model string a printer reports during discovery onto a
//! [`PrinterModel`]. A force-legacy override wins over detection, and an
//! unknown model string falls back to the legacy strategy with a logged
//! warning instead of failing — an unrecognized printer still gets the
//! lowest-common-denominator feature surface.

use forgekit_core::PrinterModel;

/// Detect the printer model from its reported model string.
pub fn detect_model(reported: &str, force_legacy: bool) -> PrinterModel {
    if force_legacy {
        tracing::info!("Force-legacy override set, treating '{}' as legacy", reported);
        return PrinterModel::GenericLegacy;
    }

    let normalized = reported.to_ascii_lowercase();
    if normalized.contains("ad5x") {
        PrinterModel::Ad5x
    } else if normalized.contains("5m pro") {
        PrinterModel::Adventurer5MPro
    } else if normalized.contains("5m") {
        PrinterModel::Adventurer5M
    } else {
        tracing::warn!(
            "Unknown printer model '{}', falling back to the legacy strategy",
            reported
        );
        PrinterModel::GenericLegacy
    }
}
