use serde::{Deserialize, Serialize};

/// Family of a payment method, used to pick the processing step sequence.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum MethodFamily {
    MobileMoney,
    Card,
}

/// A payment method as published by the method catalog.
///
/// Immutable reference data, read-only to the checkout core. The success rate
/// hint is advisory display metadata; the accept/reject decision belongs to
/// the payment authority.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentMethod {
    pub code: String,
    pub display_name: String,
    pub description: String,
    pub family: MethodFamily,
    pub success_rate_hint: f64,
    pub icon_class: String,
}

impl PaymentMethod {
    pub fn new(
        code: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        family: MethodFamily,
        success_rate_hint: f64,
        icon_class: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            description: description.into(),
            family,
            success_rate_hint: success_rate_hint.clamp(0.0, 1.0),
            icon_class: icon_class.into(),
        }
    }
}
