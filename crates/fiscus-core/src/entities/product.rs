use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line item on an invoice.
///
/// `quantity` is fractional and must stay fractional end to end; any cast
/// that discards the fractional part is a defect, not a simplification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductLine {
    pub id: String,
    pub invoice_id: String,
    pub name: String,
    pub unit: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_vat: Decimal,
}
