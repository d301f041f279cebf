//! Draft snapshot persistence.
//!
//! The snapshot is one JSON object written over the previous one on every
//! save. Loading is tolerant per field: a bad or missing key only resets that
//! field, never the rest of the draft.

use std::rc::Rc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::format::{clamp_amount, coerce_amount, iso};
use crate::ledger::Ledger;
use crate::model::{Customer, InvoiceDraft, InvoiceType, LineItem, ServiceDetails};
use crate::numbering::NumberingPolicy;
use crate::storage::{BlobStore, DRAFT_KEY, Loaded, StoreError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a> {
    invoice_type: InvoiceType,
    invoice_date: &'a str,
    invoice_no: &'a str,
    customer_name: &'a str,
    customer_phone: &'a str,
    customer_address: &'a str,
    items: &'a Ledger,
    discount: f64,
    tax: f64,
    terms: &'a str,
    svc_device: &'a str,
    #[serde(rename = "svcSN")]
    svc_sn: &'a str,
    svc_work: &'a str,
    svc_note: &'a str,
}

impl<'a> From<&'a InvoiceDraft> for Snapshot<'a> {
    fn from(d: &'a InvoiceDraft) -> Self {
        Self {
            invoice_type: d.invoice_type,
            invoice_date: &d.date,
            invoice_no: &d.number,
            customer_name: &d.customer.name,
            customer_phone: &d.customer.phone,
            customer_address: &d.customer.address,
            items: &d.items,
            discount: d.discount,
            tax: d.tax,
            terms: &d.terms,
            svc_device: &d.service.device,
            svc_sn: &d.service.serial_number,
            svc_work: &d.service.work_description,
            svc_note: &d.service.note,
        }
    }
}

pub struct DraftStore {
    store: Rc<dyn BlobStore>,
}

impl DraftStore {
    pub fn new(store: Rc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, draft: &InvoiceDraft) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&Snapshot::from(draft)).map_err(|source| {
            StoreError::Encode {
                key: DRAFT_KEY.to_string(),
                source,
            }
        })?;
        self.store.set(DRAFT_KEY, &raw)
    }

    /// `today` fills the date when the snapshot has none. Callers keep their
    /// own defaults on `Absent` and `Corrupt`.
    pub fn load(&self, today: &str) -> Loaded<InvoiceDraft> {
        let raw = match self.store.get(DRAFT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Loaded::Absent,
            Err(e) => {
                warn!("Reading draft snapshot failed: {}", e);
                return Loaded::Absent;
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Null) => Loaded::Corrupt,
            Ok(Value::Object(obj)) => Loaded::Found(restore(&obj, today)),
            Ok(_) => Loaded::Found(restore(&Map::new(), today)),
            Err(e) => {
                debug!("draft snapshot corrupt: {}", e);
                Loaded::Corrupt
            }
        }
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(DRAFT_KEY)
    }

    /// Drops the snapshot and starts over with a freshly issued number.
    pub fn reset_all(
        &self,
        numbering: &mut dyn NumberingPolicy,
        today: NaiveDate,
    ) -> Result<InvoiceDraft, StoreError> {
        self.clear()?;
        let mut draft = InvoiceDraft::with_defaults(&iso(today));
        draft.number = numbering.next(today);
        Ok(draft)
    }
}

fn restore(obj: &Map<String, Value>, today: &str) -> InvoiceDraft {
    let invoice_type = match text(obj, "invoiceType") {
        code if code.is_empty() => InvoiceType::Sale,
        code => InvoiceType::from_code(&code),
    };
    let date = match text(obj, "invoiceDate") {
        d if d.is_empty() => today.to_string(),
        d => d,
    };

    InvoiceDraft {
        invoice_type,
        date,
        number: text(obj, "invoiceNo"),
        customer: Customer {
            name: text(obj, "customerName"),
            phone: text(obj, "customerPhone"),
            address: text(obj, "customerAddress"),
        },
        items: items(obj.get("items")),
        discount: amount(obj.get("discount")),
        tax: amount(obj.get("tax")),
        terms: text(obj, "terms"),
        service: ServiceDetails {
            device: text(obj, "svcDevice"),
            serial_number: text(obj, "svcSN"),
            work_description: text(obj, "svcWork"),
            note: text(obj, "svcNote"),
        },
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Older snapshots stored numbers as form text.
fn amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => clamp_amount(n.as_f64().unwrap_or(0.0)),
        Some(Value::String(s)) => coerce_amount(s),
        _ => 0.0,
    }
}

fn items(value: Option<&Value>) -> Ledger {
    let Some(Value::Array(rows)) = value else {
        return Ledger::new();
    };
    let rows = rows
        .iter()
        .filter_map(|row| match row {
            Value::Object(o) => Some(LineItem {
                quantity: amount(o.get("qty")),
                description: text(o, "name"),
                unit_price: amount(o.get("price")),
            }),
            _ => None,
        })
        .collect();
    Ledger::from_items(rows)
}
