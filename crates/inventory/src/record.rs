use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateRoot, DomainError, DomainResult, MovementId};

use crate::{Sku, StockStatus, classify};

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Goods received.
    Add,
    /// Goods sold, damaged or otherwise taken off the shelf.
    Remove,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Add => "add",
            Direction::Remove => "remove",
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Direction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Direction::Add),
            "remove" => Ok(Direction::Remove),
            other => Err(DomainError::validation(format!(
                "direction must be 'add' or 'remove', got '{other}'"
            ))),
        }
    }
}

/// Largest quantity or threshold a record may hold (fits a signed 64-bit column).
pub const MAX_QUANTITY: u64 = i64::MAX as u64;

fn ensure_in_range(field: &str, value: u64) -> DomainResult<()> {
    if value > MAX_QUANTITY {
        return Err(DomainError::validation(format!(
            "{field} must not exceed {MAX_QUANTITY}"
        )));
    }
    Ok(())
}

/// Compute the quantity on hand after moving `quantity` units in `direction`.
///
/// Rejects zero quantities, totals above [`MAX_QUANTITY`], and removals that
/// would take stock below zero.
pub fn apply_delta(on_hand: u64, quantity: u64, direction: Direction) -> DomainResult<u64> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be a positive integer"));
    }
    match direction {
        Direction::Add => on_hand
            .checked_add(quantity)
            .filter(|total| *total <= MAX_QUANTITY)
            .ok_or_else(|| DomainError::validation("quantity overflows stock counter")),
        Direction::Remove => on_hand
            .checked_sub(quantity)
            .ok_or(DomainError::InsufficientStock {
                requested: quantity,
                on_hand,
            }),
    }
}

/// Aggregate root: StockRecord (one per SKU).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRecord {
    sku: Sku,
    quantity_on_hand: u64,
    low_stock_threshold: u64,
    status: StockStatus,
    last_updated: DateTime<Utc>,
    version: u64,
    created: bool,
}

impl StockRecord {
    /// Create an empty, not-yet-created record (target of a `CreateRecord` command).
    pub fn empty(sku: Sku) -> Self {
        Self {
            sku,
            quantity_on_hand: 0,
            low_stock_threshold: 0,
            status: StockStatus::OutOfStock,
            last_updated: DateTime::<Utc>::UNIX_EPOCH,
            version: 0,
            created: false,
        }
    }

    /// Rebuild a record from persisted columns.
    ///
    /// Status is re-derived rather than trusted from storage.
    pub fn restore(
        sku: Sku,
        quantity_on_hand: u64,
        low_stock_threshold: u64,
        last_updated: DateTime<Utc>,
        version: u64,
    ) -> Self {
        Self {
            sku,
            quantity_on_hand,
            low_stock_threshold,
            status: classify(quantity_on_hand, low_stock_threshold),
            last_updated,
            version,
            created: true,
        }
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn quantity_on_hand(&self) -> u64 {
        self.quantity_on_hand
    }

    pub fn low_stock_threshold(&self) -> u64 {
        self.low_stock_threshold
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for StockRecord {
    type Id = Sku;

    fn id(&self) -> &Self::Id {
        &self.sku
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateRecord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRecord {
    pub sku: Sku,
    pub quantity: u64,
    pub low_stock_threshold: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub sku: Sku,
    pub movement_id: MovementId,
    pub quantity: u64,
    pub direction: Direction,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetThreshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetThreshold {
    pub sku: Sku,
    pub low_stock_threshold: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    CreateRecord(CreateRecord),
    AdjustStock(AdjustStock),
    SetThreshold(SetThreshold),
}

/// Event: RecordCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCreated {
    pub sku: Sku,
    pub quantity: u64,
    pub low_stock_threshold: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a stock movement, also the append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub movement_id: MovementId,
    pub sku: Sku,
    pub direction: Direction,
    pub quantity: u64,
    pub quantity_before: u64,
    pub quantity_after: u64,
    pub status_after: StockStatus,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Record version once this movement is applied.
    pub version: u64,
}

/// Event: ThresholdChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdChanged {
    pub sku: Sku,
    pub low_stock_threshold: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    RecordCreated(RecordCreated),
    StockAdjusted(StockMovement),
    ThresholdChanged(ThresholdChanged),
}

impl StockEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            StockEvent::RecordCreated(_) => "inventory.record.created",
            StockEvent::StockAdjusted(_) => "inventory.record.stock_adjusted",
            StockEvent::ThresholdChanged(_) => "inventory.record.threshold_changed",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::RecordCreated(e) => e.occurred_at,
            StockEvent::StockAdjusted(e) => e.occurred_at,
            StockEvent::ThresholdChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockRecord {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::RecordCreated(e) => {
                self.sku = e.sku.clone();
                self.quantity_on_hand = e.quantity;
                self.low_stock_threshold = e.low_stock_threshold;
                self.last_updated = e.occurred_at;
                self.created = true;
            }
            StockEvent::StockAdjusted(e) => {
                self.quantity_on_hand = e.quantity_after;
                self.last_updated = e.occurred_at;
            }
            StockEvent::ThresholdChanged(e) => {
                self.low_stock_threshold = e.low_stock_threshold;
                self.last_updated = e.occurred_at;
            }
        }

        self.status = classify(self.quantity_on_hand, self.low_stock_threshold);
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::CreateRecord(cmd) => self.handle_create(cmd),
            StockCommand::AdjustStock(cmd) => self.handle_adjust(cmd),
            StockCommand::SetThreshold(cmd) => self.handle_set_threshold(cmd),
        }
    }
}

impl StockRecord {
    fn ensure_sku(&self, sku: &Sku) -> Result<(), DomainError> {
        if &self.sku != sku {
            return Err(DomainError::validation("sku mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateRecord) -> Result<Vec<StockEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!("stock record {} already exists", cmd.sku)));
        }
        self.ensure_sku(&cmd.sku)?;
        ensure_in_range("quantity", cmd.quantity)?;
        ensure_in_range("low_stock_threshold", cmd.low_stock_threshold)?;
        Ok(vec![StockEvent::RecordCreated(RecordCreated {
            sku: cmd.sku.clone(),
            quantity: cmd.quantity,
            low_stock_threshold: cmd.low_stock_threshold,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<StockEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_sku(&cmd.sku)?;

        let quantity_after = apply_delta(self.quantity_on_hand, cmd.quantity, cmd.direction)?;
        let reason = cmd
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(vec![StockEvent::StockAdjusted(StockMovement {
            movement_id: cmd.movement_id,
            sku: cmd.sku.clone(),
            direction: cmd.direction,
            quantity: cmd.quantity,
            quantity_before: self.quantity_on_hand,
            quantity_after,
            status_after: classify(quantity_after, self.low_stock_threshold),
            reason,
            occurred_at: cmd.occurred_at,
            version: self.version + 1,
        })])
    }

    fn handle_set_threshold(&self, cmd: &SetThreshold) -> Result<Vec<StockEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_sku(&cmd.sku)?;
        ensure_in_range("low_stock_threshold", cmd.low_stock_threshold)?;

        Ok(vec![StockEvent::ThresholdChanged(ThresholdChanged {
            sku: cmd.sku.clone(),
            low_stock_threshold: cmd.low_stock_threshold,
            occurred_at: cmd.occurred_at,
        })])
    }
}
