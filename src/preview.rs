//! Totals and the read-only preview projection of a draft.
//!
//! Nothing here holds state: the same draft and settings always produce the
//! same preview, and nothing is ever read back out of it.

use serde::Serialize;
use tera::{Context, Tera};

use crate::format::{format_date, or_dash, rupiah};
use crate::model::{BrandSettings, InvoiceDraft};
use crate::settings::{DEFAULT_NAME, DEFAULT_TAGLINE};

const INVOICE_TEMPLATE: &str = include_str!("../templates/invoice.html.tera");

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub discount: f64,
    pub tax: Option<f64>,
    pub total: f64,
}

/// `total = max(0, subtotal - discount [+ tax])`. Tax only counts when
/// `include_tax` is set.
pub fn compute_totals(draft: &InvoiceDraft, include_tax: bool) -> Totals {
    let subtotal = draft.items.subtotal();
    let tax = include_tax.then_some(draft.tax);
    let total = (subtotal - draft.discount + tax.unwrap_or(0.0)).max(0.0);
    Totals {
        subtotal,
        discount: draft.discount,
        tax,
        total,
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PreviewRow {
    pub quantity: String,
    pub description: String,
    pub unit_price: String,
    pub subtotal: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PreviewService {
    pub device: String,
    pub serial_number: String,
    pub work_description: String,
    pub note: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PreviewBrand {
    pub name: String,
    pub tagline: String,
    pub logo: Option<String>,
    pub stamp: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Preview {
    pub type_label: String,
    pub date: String,
    pub number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub rows: Vec<PreviewRow>,
    pub subtotal: String,
    pub discount: String,
    pub tax: Option<String>,
    pub total: String,
    pub terms: String,
    pub show_service: bool,
    pub service: PreviewService,
    pub brand: PreviewBrand,
}

pub fn build_preview(draft: &InvoiceDraft, settings: &BrandSettings, include_tax: bool) -> Preview {
    let totals = compute_totals(draft, include_tax);

    let rows = draft
        .items
        .items()
        .iter()
        .map(|item| PreviewRow {
            quantity: item.quantity.to_string(),
            description: or_dash(&item.description),
            unit_price: rupiah(item.unit_price),
            subtotal: rupiah(item.subtotal()),
        })
        .collect();

    Preview {
        type_label: draft.invoice_type.label().to_string(),
        date: format_date(&draft.date),
        number: or_dash(&draft.number),
        customer_name: or_dash(&draft.customer.name),
        customer_phone: or_dash(&draft.customer.phone),
        customer_address: or_dash(&draft.customer.address),
        rows,
        subtotal: rupiah(totals.subtotal),
        discount: rupiah(totals.discount),
        tax: totals.tax.map(rupiah),
        total: rupiah(totals.total),
        terms: or_dash(&draft.terms),
        show_service: draft.invoice_type.has_service_section(),
        service: PreviewService {
            device: or_dash(&draft.service.device),
            serial_number: or_dash(&draft.service.serial_number),
            work_description: or_dash(&draft.service.work_description),
            note: or_dash(&draft.service.note),
        },
        brand: PreviewBrand {
            name: settings.name.clone().unwrap_or_else(|| DEFAULT_NAME.to_string()),
            tagline: settings
                .tagline
                .clone()
                .unwrap_or_else(|| DEFAULT_TAGLINE.to_string()),
            logo: settings.logo_data_url.clone(),
            stamp: settings.stamp_or_logo().map(str::to_string),
        },
    }
}

/// Printable HTML page for the preview. Text is escaped by the template engine.
pub fn render_html(preview: &Preview) -> Result<String, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template("invoice.html", INVOICE_TEMPLATE)?;
    let context = Context::from_serialize(preview)?;
    tera.render("invoice.html", &context)
}
