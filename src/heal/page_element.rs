use tracing::{debug, info};

use crate::driver::driver_model::{DriverError, ElementHandle, PageDriver};
use crate::element::element_model::Locator;
use crate::heal::engine::HealingEngine;

/// A page-object element that finds itself through a driver and falls back
/// to healing when its locator stops matching.
///
/// A healed locator replaces the original for the lifetime of this value only.
#[derive(Debug, Clone, PartialEq)]
pub struct PageElement {
    locator: Locator,
    original: Locator,
}

impl PageElement {
    pub fn new(locator: Locator) -> Self {
        Self {
            original: locator.clone(),
            locator,
        }
    }

    /// The locator currently in use, healed or not.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn original_locator(&self) -> &Locator {
        &self.original
    }

    pub fn was_healed(&self) -> bool {
        self.locator != self.original
    }

    /// Resolve the element, healing the locator when the driver reports it
    /// missing and healing is enabled.
    ///
    /// Every successful resolution is recorded in the corpus. When healing is
    /// disabled or finds nothing, the driver's original error is returned.
    pub fn find<D: PageDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        engine: &HealingEngine<'_>,
    ) -> Result<ElementHandle, DriverError> {
        let error = match driver.resolve_element(&self.locator) {
            Ok(handle) => {
                engine.record_success(driver, &self.locator, &handle);
                return Ok(handle);
            }
            Err(e) => e,
        };

        if !error.is_not_found() || !engine.settings().enabled {
            return Err(error);
        }

        let Some(healed) = engine.heal(driver, &self.locator) else {
            return Err(error);
        };

        match driver.resolve_element(&healed) {
            Ok(handle) => {
                info!(old = %self.locator, new = %healed, "using healed locator");
                self.locator = healed;
                engine.record_success(driver, &self.locator, &handle);
                Ok(handle)
            }
            Err(e) => {
                debug!(locator = %healed, error = %e, "healed locator did not resolve");
                Err(error)
            }
        }
    }
}
