// crates/canteen-api/src/services/dashboard.rs
// ============================================================================
// Module: Dashboard Service
// Description: Summary counts, monthly income, and best sellers.
// Purpose: Feed the admin dashboard from live store aggregates.
// Dependencies: canteen-core, serde
// ============================================================================

//! ## Overview
//! Income only counts DELIVERED orders and is bucketed by UTC calendar month
//! of order creation. Months without deliveries report zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use canteen_core::CanteenStore;
use canteen_core::Clock;
use canteen_core::MenuItem;
use canteen_core::Money;
use canteen_core::MonthWindow;
use canteen_core::OrderStatus;
use canteen_core::SharedCanteenStore;
use canteen_core::last_months;
use serde::Serialize;

use super::ServiceDeps;
use super::ServiceError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest accepted month range for income history.
pub const MAX_INCOME_MONTHS: u32 = 24;
/// Number of best sellers returned.
const TOP_ITEMS: usize = 5;
/// Tallies scanned while skipping deleted items.
const TOP_ITEMS_SCAN: u32 = 50;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Dashboard headline numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Customer accounts.
    pub users: u64,
    /// Menu items.
    pub menu_items: u64,
    /// Categories.
    pub categories: u64,
    /// Delivered orders.
    pub orders: u64,
    /// Delivered income this month.
    pub current_month_income: Money,
    /// Delivered income last month.
    pub previous_month_income: Money,
}

/// Delivered income for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyIncome {
    /// `YYYY-MM`.
    pub month: String,
    /// Income.
    pub income: Money,
}

/// Best-selling menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopItem {
    /// Current menu item.
    #[serde(flatten)]
    pub item: MenuItem,
    /// Quantity ordered across non-cancelled orders.
    pub total_count: u64,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Dashboard service.
#[derive(Clone)]
pub struct DashboardService {
    /// Persistence.
    store: SharedCanteenStore,
    /// Time source.
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    /// Builds the service.
    #[must_use]
    pub fn new(deps: &ServiceDeps) -> Self {
        Self {
            store: deps.store.clone(),
            clock: Arc::clone(&deps.clock),
        }
    }

    /// Returns headline counts and this and last month's income.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the store fails.
    pub fn summary(&self) -> Result<DashboardSummary, ServiceError> {
        let current = MonthWindow::containing(self.clock.now())?;
        let previous = current.previous()?;
        Ok(DashboardSummary {
            users: self.store.count_customers()?,
            menu_items: self.store.count_menu_items()?,
            categories: self.store.count_categories()?,
            orders: self.store.count_orders(Some(OrderStatus::Delivered))?,
            current_month_income: self.income(&current)?,
            previous_month_income: self.income(&previous)?,
        })
    }

    /// Returns income for the last `months` months, latest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] when `months` is outside
    /// `1..=24`.
    pub fn income_by_months(&self, months: u32) -> Result<Vec<MonthlyIncome>, ServiceError> {
        if !(1..=MAX_INCOME_MONTHS).contains(&months) {
            return Err(ServiceError::BadRequest(format!(
                "months must be between 1 and {MAX_INCOME_MONTHS}"
            )));
        }
        let count = usize::try_from(months)
            .map_err(|_| ServiceError::BadRequest("months out of range".to_string()))?;
        last_months(self.clock.now(), count)?
            .into_iter()
            .map(|window| {
                Ok(MonthlyIncome {
                    income: self.income(&window)?,
                    month: window.key,
                })
            })
            .collect()
    }

    /// Returns the best sellers that are still on the menu.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the store fails.
    pub fn top_items(&self) -> Result<Vec<TopItem>, ServiceError> {
        let mut top = Vec::with_capacity(TOP_ITEMS);
        for tally in self.store.top_ordered_items(TOP_ITEMS_SCAN)? {
            if top.len() == TOP_ITEMS {
                break;
            }
            if let Some(item) = self.store.menu_item_by_id(&tally.item_id)? {
                top.push(TopItem {
                    item,
                    total_count: tally.total_count,
                });
            }
        }
        Ok(top)
    }

    /// Delivered income inside a month.
    fn income(&self, window: &MonthWindow) -> Result<Money, ServiceError> {
        Ok(self.store.delivered_income_between(window.start, window.end)?)
    }
}
