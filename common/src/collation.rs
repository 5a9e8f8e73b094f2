//! Locale-aware ordering of staff names.

use crate::StaffRecord;
use crate::error::ProgressError;
use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;
use std::cmp::Ordering;

/// Compares names the way a Traditional Chinese reader expects, not by byte order.
pub struct NameCollator {
    collator: Collator,
}

impl NameCollator {
    /// Load the `zh-Hant` collation tables compiled into the binary.
    ///
    /// # Errors
    /// Returns an error if the collation data cannot be loaded.
    pub fn new() -> Result<Self, ProgressError> {
        let collator = Collator::try_new(&locale!("zh-Hant").into(), CollatorOptions::new())
            .map_err(|e| ProgressError::Collation(e.to_string()))?;
        Ok(Self { collator })
    }

    #[must_use]
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.collator.compare(a, b)
    }

    /// Sort staff by collated name, falling back to id for identical names.
    pub fn sort_staff(&self, staff: &mut [StaffRecord]) {
        staff.sort_by(|a, b| self.compare(&a.name, &b.name).then(a.id.cmp(&b.id)));
    }
}
