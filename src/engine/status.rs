use crate::models::delivery::DeliveryStatus;

/// The writable transition graph. `Open` is the sole initial state;
/// `Closed`, `Cancelled` and `Dispute` are terminal for the engine
/// (dispute resolution happens in an external support workflow). The
/// legacy `Returned` value is neither a source nor a target.
///
/// Dispute requires an assigned counterparty, so it is reachable only from
/// post-assignment states; a seller's exit from `Open` is cancellation.
pub fn transition_allowed(from: DeliveryStatus, to: DeliveryStatus) -> bool {
    use DeliveryStatus::*;

    matches!(
        (from, to),
        (Open, Assigned)
            | (Open, Cancelled)
            | (Assigned, OnRoute)
            | (OnRoute, Delivered)
            | (Delivered, Paid)
            | (Delivered, Closed)
            | (Paid, Closed)
            | (Assigned, Dispute)
            | (OnRoute, Dispute)
            | (Delivered, Dispute)
            | (Paid, Dispute)
    )
}
