//! The editing session: owns the draft and keeps the preview in step with it.
//! Every mutation goes through here and ends with a recompute.

use std::path::Path;
use std::rc::Rc;

use chrono::NaiveDate;
use tracing::debug;

use crate::draft::DraftStore;
use crate::format::{coerce_amount, iso};
use crate::ledger::ItemField;
use crate::model::{BrandSettings, InvoiceDraft, InvoiceType, LineItem};
use crate::numbering::NumberingPolicy;
use crate::preview::{Preview, Totals, build_preview, compute_totals};
use crate::settings::SettingsStore;
use crate::storage::{BlobStore, Loaded, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    InvoiceType,
    Date,
    Number,
    CustomerName,
    CustomerPhone,
    CustomerAddress,
    Discount,
    Tax,
    Terms,
    ServiceDevice,
    ServiceSerial,
    ServiceWork,
    ServiceNote,
}

impl DraftField {
    pub const ALL: [DraftField; 13] = [
        DraftField::InvoiceType,
        DraftField::Date,
        DraftField::Number,
        DraftField::CustomerName,
        DraftField::CustomerPhone,
        DraftField::CustomerAddress,
        DraftField::Discount,
        DraftField::Tax,
        DraftField::Terms,
        DraftField::ServiceDevice,
        DraftField::ServiceSerial,
        DraftField::ServiceWork,
        DraftField::ServiceNote,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DraftField::InvoiceType => "Invoice type",
            DraftField::Date => "Date",
            DraftField::Number => "Invoice number",
            DraftField::CustomerName => "Customer name",
            DraftField::CustomerPhone => "Customer phone",
            DraftField::CustomerAddress => "Customer address",
            DraftField::Discount => "Discount",
            DraftField::Tax => "Tax",
            DraftField::Terms => "Terms",
            DraftField::ServiceDevice => "Device",
            DraftField::ServiceSerial => "Serial number",
            DraftField::ServiceWork => "Work description",
            DraftField::ServiceNote => "Service note",
        }
    }

    pub fn is_service(self) -> bool {
        matches!(
            self,
            DraftField::ServiceDevice
                | DraftField::ServiceSerial
                | DraftField::ServiceWork
                | DraftField::ServiceNote
        )
    }
}

impl std::fmt::Display for DraftField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub struct Session {
    drafts: DraftStore,
    settings_store: SettingsStore,
    numbering: Box<dyn NumberingPolicy>,
    today: NaiveDate,
    include_tax: bool,
    draft: InvoiceDraft,
    settings: BrandSettings,
    preview: Preview,
}

impl Session {
    /// Settings first, then the saved draft over the defaults, then a number
    /// if the draft still has none.
    pub fn open(
        store: Rc<dyn BlobStore>,
        numbering: Box<dyn NumberingPolicy>,
        include_tax: bool,
        today: NaiveDate,
    ) -> Self {
        let drafts = DraftStore::new(store.clone());
        let settings_store = SettingsStore::new(store);
        let settings = settings_store.load();

        let today_iso = iso(today);
        let draft = match drafts.load(&today_iso) {
            Loaded::Found(draft) => draft,
            Loaded::Absent => InvoiceDraft::with_defaults(&today_iso),
            Loaded::Corrupt => {
                debug!("saved draft unreadable, starting from defaults");
                InvoiceDraft::with_defaults(&today_iso)
            }
        };

        let preview = build_preview(&draft, &settings, include_tax);
        let mut session = Self {
            drafts,
            settings_store,
            numbering,
            today,
            include_tax,
            draft,
            settings,
            preview,
        };
        if session.draft.date.trim().is_empty() {
            session.draft.date = today_iso;
        }
        session.ensure_number();
        session.recompute();
        session
    }

    pub fn draft(&self) -> &InvoiceDraft {
        &self.draft
    }

    pub fn settings(&self) -> &BrandSettings {
        &self.settings
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn totals(&self) -> Totals {
        compute_totals(&self.draft, self.include_tax)
    }

    pub fn include_tax(&self) -> bool {
        self.include_tax
    }

    /// Fills a blank number. A number typed or loaded by the user is kept.
    pub fn ensure_number(&mut self) {
        if self.draft.number.trim().is_empty() {
            self.draft.number = self.numbering.next(self.today);
        }
    }

    pub fn add_item(&mut self, item: LineItem) {
        self.draft.items.add_item(item);
        self.recompute();
    }

    pub fn remove_item(&mut self, index: usize) {
        self.draft.items.remove_item(index);
        self.recompute();
    }

    pub fn update_item(&mut self, index: usize, field: ItemField, raw: &str) {
        self.draft.items.update_field(index, field, raw);
        self.recompute();
    }

    pub fn set_field(&mut self, field: DraftField, raw: &str) {
        let d = &mut self.draft;
        match field {
            DraftField::InvoiceType => d.invoice_type = InvoiceType::from_code(raw),
            DraftField::Date => d.date = raw.trim().to_string(),
            DraftField::Number => d.number = raw.to_string(),
            DraftField::CustomerName => d.customer.name = raw.to_string(),
            DraftField::CustomerPhone => d.customer.phone = raw.to_string(),
            DraftField::CustomerAddress => d.customer.address = raw.to_string(),
            DraftField::Discount => d.discount = coerce_amount(raw),
            DraftField::Tax => d.tax = coerce_amount(raw),
            DraftField::Terms => d.terms = raw.to_string(),
            DraftField::ServiceDevice => d.service.device = raw.to_string(),
            DraftField::ServiceSerial => d.service.serial_number = raw.to_string(),
            DraftField::ServiceWork => d.service.work_description = raw.to_string(),
            DraftField::ServiceNote => d.service.note = raw.to_string(),
        }
        self.recompute();
    }

    pub fn save(&self) -> Result<(), StoreError> {
        self.drafts.save(&self.draft)
    }

    pub fn reset_all(&mut self) -> Result<(), StoreError> {
        self.draft = self.drafts.reset_all(self.numbering.as_mut(), self.today)?;
        self.recompute();
        Ok(())
    }

    pub fn apply_settings(
        &mut self,
        name: &str,
        tagline: &str,
        logo: Option<&Path>,
        stamp: Option<&Path>,
    ) -> Result<(), StoreError> {
        self.settings = self.settings_store.apply(name, tagline, logo, stamp)?;
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.preview = build_preview(&self.draft, &self.settings, self.include_tax);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::rupiah;
    use crate::numbering::{CounterPolicy, INVOICE_START};
    use crate::storage::{DRAFT_KEY, MemoryStore};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn open(store: &Rc<dyn BlobStore>) -> Session {
        let numbering = Box::new(CounterPolicy::new(store.clone(), INVOICE_START));
        Session::open(store.clone(), numbering, false, day())
    }

    fn memory() -> Rc<dyn BlobStore> {
        Rc::new(MemoryStore::new())
    }

    #[test]
    fn fresh_session_gets_defaults_and_a_number() {
        let store = memory();
        let session = open(&store);
        assert_eq!(session.draft().date, "2024-05-17");
        assert_eq!(session.draft().number, "303");
        assert_eq!(session.draft().items.len(), 1);
        assert_eq!(session.preview().number, "303");
    }

    #[test]
    fn loaded_number_is_never_overwritten() {
        let store = memory();
        let mut first = open(&store);
        first.set_field(DraftField::Number, "A-17");
        first.save().unwrap();

        let mut second = open(&store);
        assert_eq!(second.draft().number, "A-17");
        second.ensure_number();
        assert_eq!(second.draft().number, "A-17");
    }

    #[test]
    fn corrupt_snapshot_keeps_defaults() {
        let store = memory();
        store.set(DRAFT_KEY, "{{{{").unwrap();
        let session = open(&store);
        let mut expected = InvoiceDraft::with_defaults("2024-05-17");
        expected.number = "303".to_string();
        assert_eq!(session.draft(), &expected);
    }

    #[test]
    fn every_mutation_refreshes_the_preview() {
        let store = memory();
        let mut session = open(&store);

        session.update_item(0, ItemField::UnitPrice, "100000");
        assert_eq!(session.preview().subtotal, rupiah(100_000.0));

        session.set_field(DraftField::Discount, "150000");
        assert_eq!(session.totals().total, 0.0);
        assert_eq!(session.preview().total, "Rp 0");

        session.set_field(DraftField::InvoiceType, "service");
        assert!(session.preview().show_service);

        session.set_field(DraftField::CustomerName, "Rina");
        assert_eq!(session.preview().customer_name, "Rina");

        session.add_item(LineItem::new(2.0, "Kabel", 10_000.0));
        assert_eq!(session.preview().rows.len(), 2);
        session.remove_item(0);
        session.remove_item(0);
        assert_eq!(session.preview().rows.len(), 1);
    }

    #[test]
    fn reset_yields_one_blank_item_and_new_number() {
        let store = memory();
        let mut session = open(&store);
        session.add_item(LineItem::new(3.0, "Oli", 45_000.0));
        session.set_field(DraftField::Discount, "5000");
        session.save().unwrap();

        session.reset_all().unwrap();
        assert_eq!(session.draft().items.items(), &[LineItem::default()]);
        assert_eq!(session.draft().number, "304");
        assert_eq!(session.draft().discount, 0.0);
        assert_eq!(store.get(DRAFT_KEY).unwrap(), None);
    }

    #[test]
    fn settings_survive_reset_and_reach_the_preview() {
        let store = memory();
        let mut session = open(&store);
        session.apply_settings("Bengkel Jaya", "", None, None).unwrap();
        session.reset_all().unwrap();

        assert_eq!(session.preview().brand.name, "Bengkel Jaya");
        let reopened = open(&store);
        assert_eq!(reopened.settings().name.as_deref(), Some("Bengkel Jaya"));
    }
}
