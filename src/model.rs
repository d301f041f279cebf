use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LineItem {
    #[serde(rename = "qty")]
    pub quantity: f64,
    #[serde(rename = "name")]
    pub description: String,
    #[serde(rename = "price")]
    pub unit_price: f64,
}

impl LineItem {
    pub fn new(quantity: f64, description: impl Into<String>, unit_price: f64) -> Self {
        Self {
            quantity,
            description: description.into(),
            unit_price,
        }
    }

    /// Computed on demand, never stored.
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

impl Default for LineItem {
    fn default() -> Self {
        Self::new(1.0, "", 0.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvoiceType {
    #[default]
    #[serde(rename = "penjualan")]
    Sale,
    #[serde(rename = "service")]
    Service,
    #[serde(rename = "gabungan")]
    Combined,
}

impl InvoiceType {
    pub const ALL: [InvoiceType; 3] = [InvoiceType::Sale, InvoiceType::Service, InvoiceType::Combined];

    /// Code stored in the snapshot.
    pub fn code(self) -> &'static str {
        match self {
            InvoiceType::Sale => "penjualan",
            InvoiceType::Service => "service",
            InvoiceType::Combined => "gabungan",
        }
    }

    /// Unknown codes fall back to a sale invoice.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "service" => InvoiceType::Service,
            "gabungan" => InvoiceType::Combined,
            _ => InvoiceType::Sale,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InvoiceType::Sale => "Penjualan",
            InvoiceType::Service => "Service",
            InvoiceType::Combined => "Gabungan",
        }
    }

    pub fn has_service_section(self) -> bool {
        matches!(self, InvoiceType::Service | InvoiceType::Combined)
    }
}

impl std::fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ServiceDetails {
    pub device: String,
    pub serial_number: String,
    pub work_description: String,
    pub note: String,
}

/// The complete invoice-in-progress. This is the single source of truth;
/// previews and snapshots are projections of it.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub invoice_type: InvoiceType,
    /// ISO `YYYY-MM-DD`, kept as text so a loaded value survives untouched.
    pub date: String,
    pub number: String,
    pub customer: Customer,
    pub items: Ledger,
    pub discount: f64,
    /// Only part of the total when the tax policy says so. Older snapshots carry it.
    pub tax: f64,
    pub terms: String,
    pub service: ServiceDetails,
}

impl InvoiceDraft {
    /// Hard-coded defaults. The number stays blank until a numbering policy fills it.
    pub fn with_defaults(today: &str) -> Self {
        Self {
            invoice_type: InvoiceType::Sale,
            date: today.to_string(),
            number: String::new(),
            customer: Customer::default(),
            items: Ledger::new(),
            discount: 0.0,
            tax: 0.0,
            terms: String::new(),
            service: ServiceDetails::default(),
        }
    }
}

/// Brand assets. Survives draft resets.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrandSettings {
    #[serde(default, alias = "displayName")]
    pub name: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub logo_data_url: Option<String>,
    #[serde(default)]
    pub stamp_data_url: Option<String>,
}

impl BrandSettings {
    /// The stamp falls back to the logo when none was uploaded.
    pub fn stamp_or_logo(&self) -> Option<&str> {
        self.stamp_data_url
            .as_deref()
            .or(self.logo_data_url.as_deref())
    }
}
