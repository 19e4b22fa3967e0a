//! Order and item state machines.
//!
//! All legal transitions live in this one table, shared by the
//! order-level and item-level machines. Services never compare status
//! strings; they apply an action here and persist the result, so an
//! illegal transition fails before anything is mutated.

use crate::domain::orders::models::{ItemStatus, OrderStatus};

/// Order statuses an admin may select via the status-advance operation.
/// The machine itself allows skipping stages; this whitelist is what the
/// admin console offers.
pub const ADMIN_SELECTABLE: [OrderStatus; 3] = [
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

/// An action against the order-level machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    /// Successful gateway signature verification.
    ConfirmPayment,
    /// Lazy expiry of an unverified gateway intent.
    ExpireIntent,
    /// Admin status advance to one of [`ADMIN_SELECTABLE`].
    Advance(OrderStatus),
    /// Customer cancellation of the whole order.
    Cancel,
}

impl OrderAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfirmPayment => "confirm payment",
            Self::ExpireIntent => "expire intent",
            Self::Advance(_) => "advance status",
            Self::Cancel => "cancel",
        }
    }
}

/// An action against one order item's machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    /// The item follows its order through a fulfilment stage.
    Advance(ItemStatus),
    Cancel,
    RequestReturn,
    ApproveReturn,
    RejectReturn,
    ConfirmReturnReceived,
}

impl ItemAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Advance(_) => "advance status",
            Self::Cancel => "cancel",
            Self::RequestReturn => "request return",
            Self::ApproveReturn => "approve return",
            Self::RejectReturn => "reject return",
            Self::ConfirmReturnReceived => "confirm return received",
        }
    }
}

/// A rejected transition. Nothing was mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: &'static str,
    pub action: &'static str,
}

/// Position of a status along the fulfilment track, used for the
/// forward-only rule on admin advances. Statuses off the track have no
/// rank.
const fn fulfilment_rank(status: OrderStatus) -> Option<u8> {
    match status {
        OrderStatus::Pending => Some(0),
        OrderStatus::Processing => Some(1),
        OrderStatus::Shipped => Some(2),
        OrderStatus::Delivered => Some(3),
        _ => None,
    }
}

/// Apply an action to the order-level machine.
///
/// # Errors
///
/// Returns [`InvalidTransition`] when the action is not legal from the
/// current status.
pub fn order_transition(
    from: OrderStatus,
    action: OrderAction,
) -> Result<OrderStatus, InvalidTransition> {
    let next = match (from, action) {
        (OrderStatus::Initialized, OrderAction::ConfirmPayment) => Some(OrderStatus::Pending),
        (OrderStatus::Initialized, OrderAction::ExpireIntent) => Some(OrderStatus::Cancelled),

        (_, OrderAction::Advance(target)) => match (fulfilment_rank(from), fulfilment_rank(target))
        {
            (Some(current), Some(next_rank))
                if next_rank > current && ADMIN_SELECTABLE.contains(&target) =>
            {
                Some(target)
            }
            _ => None,
        },

        (OrderStatus::Pending | OrderStatus::Processing, OrderAction::Cancel) => {
            Some(OrderStatus::Cancelled)
        }

        _ => None,
    };

    next.ok_or(InvalidTransition {
        from: from.as_str(),
        action: action.as_str(),
    })
}

/// Apply an action to one item's machine.
///
/// # Errors
///
/// Returns [`InvalidTransition`] when the action is not legal from the
/// current status.
pub fn item_transition(
    from: ItemStatus,
    action: ItemAction,
) -> Result<ItemStatus, InvalidTransition> {
    let next = match (from, action) {
        // Items ride along with admin fulfilment advances; terminal and
        // return-flow items stay where they are (filtered by the caller).
        (
            ItemStatus::Pending | ItemStatus::Processing | ItemStatus::Shipped,
            ItemAction::Advance(target),
        ) if matches!(
            target,
            ItemStatus::Processing | ItemStatus::Shipped | ItemStatus::Delivered
        ) =>
        {
            Some(target)
        }

        (ItemStatus::Pending | ItemStatus::Processing, ItemAction::Cancel) => {
            Some(ItemStatus::Cancelled)
        }

        (ItemStatus::Delivered, ItemAction::RequestReturn) => Some(ItemStatus::ReturnRequested),
        (ItemStatus::ReturnRequested, ItemAction::ApproveReturn) => Some(ItemStatus::ReturnApproved),
        (ItemStatus::ReturnRequested, ItemAction::RejectReturn) => Some(ItemStatus::ReturnRejected),
        (ItemStatus::ReturnApproved, ItemAction::ConfirmReturnReceived) => {
            Some(ItemStatus::Returned)
        }

        _ => None,
    };

    next.ok_or(InvalidTransition {
        from: from.as_str(),
        action: action.as_str(),
    })
}

/// Derive the order's aggregate status from its items after an
/// item-level action: a pure reduction, with explicit order-level
/// actions handled by [`order_transition`].
#[must_use]
pub fn derive_order_status(current: OrderStatus, items: &[ItemStatus]) -> OrderStatus {
    if items.is_empty() {
        return current;
    }

    if items.iter().all(|status| *status == ItemStatus::Cancelled) {
        return OrderStatus::Cancelled;
    }

    let live: Vec<ItemStatus> = items
        .iter()
        .copied()
        .filter(|status| *status != ItemStatus::Cancelled)
        .collect();

    let all_live = |status: ItemStatus| live.iter().all(|s| *s == status);

    if all_live(ItemStatus::Returned) {
        return OrderStatus::Returned;
    }

    if all_live(ItemStatus::ReturnRequested) {
        return OrderStatus::ReturnRequested;
    }

    if all_live(ItemStatus::ReturnApproved) {
        return OrderStatus::ReturnApproved;
    }

    if all_live(ItemStatus::ReturnRejected) {
        return OrderStatus::ReturnRejected;
    }

    // Mixed return outcomes on a delivered order leave the order
    // delivered; partial cancellations leave the fulfilment status.
    current
}
