//! MatchingEngine: walks the opposing side of the book against a freshly
//! admitted order and settles every fill.

use chrono::Utc;
use sqlx::PgConnection;

use crate::error::AppError;
use crate::models::{Direction, Order, OrderStatus, QUOTE_CURRENCY};
use crate::services::{ledger, store};

/// Advance a fresh `new_order` against resting orders of the opposite side,
/// emitting trades and settling balances until the order is fully filled or
/// the book runs dry. Must run inside the same transaction (and under the
/// same per-ticker lock) as admission.
pub async fn match_order(conn: &mut PgConnection, new_order: &mut Order) -> Result<(), AppError> {
    let resting_side = new_order.direction.opposite();
    let resting = store::scan_resting(conn, &new_order.ticker, resting_side, new_order.price).await?;

    for mut maker in resting {
        let remaining = new_order.remaining();
        if remaining <= 0 {
            break;
        }
        let trade_price = maker
            .price
            .ok_or_else(|| AppError::Internal("resting order has no price".into()))?;

        let fill = compute_fill(remaining, maker.remaining());
        if fill <= 0 {
            continue;
        }

        new_order.filled += fill;
        maker.filled += fill;
        new_order.status = OrderStatus::from_fill(new_order.filled, new_order.qty);
        maker.status = OrderStatus::from_fill(maker.filled, maker.qty);

        store::update_order(conn, &maker).await?;

        let now = Utc::now();
        store::insert_trade(conn, &new_order.ticker, fill, trade_price, now).await?;

        settle_fill(conn, new_order, &maker, trade_price, fill).await?;
    }

    store::update_order(conn, new_order).await?;

    if new_order.is_market() && new_order.remaining() > 0 {
        return Err(AppError::Internal(
            "market order left unfilled after matching despite passing the liquidity pre-check".into(),
        ));
    }

    Ok(())
}

async fn settle_fill(
    conn: &mut PgConnection,
    new_order: &Order,
    maker: &Order,
    trade_price: i64,
    fill: i64,
) -> Result<(), AppError> {
    match new_order.direction {
        Direction::Buy => {
            ledger::adjust(conn, new_order.user_id, &new_order.ticker, fill).await?;
            ledger::adjust(conn, maker.user_id, &new_order.ticker, -fill).await?;
            let proceeds = checked_cost(fill, trade_price)?;
            ledger::adjust(conn, maker.user_id, QUOTE_CURRENCY, proceeds).await?;

            let refund = buyer_overpayment_refund(new_order.price, trade_price, fill)?;
            if refund > 0 {
                ledger::adjust(conn, new_order.user_id, QUOTE_CURRENCY, refund).await?;
            }
        }
        Direction::Sell => {
            let proceeds = checked_cost(fill, trade_price)?;
            ledger::adjust(conn, new_order.user_id, QUOTE_CURRENCY, proceeds).await?;

            let resting_bid_price = maker
                .price
                .ok_or_else(|| AppError::Internal("resting bid has no price".into()))?;
            let refund = resting_buyer_refund(resting_bid_price, trade_price, fill)?;
            if refund > 0 {
                ledger::adjust(conn, maker.user_id, QUOTE_CURRENCY, refund).await?;
            }
            ledger::adjust(conn, maker.user_id, &new_order.ticker, fill).await?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Pure helpers (unit-tested without a database)
// ---------------------------------------------------------------------

/// `fill = min(remaining, available)`.
pub fn compute_fill(remaining: i64, available: i64) -> i64 {
    remaining.min(available)
}

fn checked_cost(fill: i64, price: i64) -> Result<i64, AppError> {
    fill.checked_mul(price)
        .ok_or_else(|| AppError::Internal("trade notional overflow".into()))
}

/// Refund owed to a limit buyer when the trade cleared below their limit
/// price. Market buyers reserved exactly `fill * trade_price` up front, so
/// `limit_price = None` always yields zero.
pub fn buyer_overpayment_refund(
    limit_price: Option<i64>,
    trade_price: i64,
    fill: i64,
) -> Result<i64, AppError> {
    match limit_price {
        Some(p) if trade_price < p => checked_cost(fill, p - trade_price),
        _ => Ok(0),
    }
}

/// Refund owed to a resting buyer when a seller crosses into their bid at a
/// lower trade price than the bid itself.
pub fn resting_buyer_refund(resting_bid_price: i64, trade_price: i64, fill: i64) -> Result<i64, AppError> {
    if resting_bid_price > trade_price {
        checked_cost(fill, resting_bid_price - trade_price)
    } else {
        Ok(0)
    }
}

/// Walks resting `(price, available_qty)` levels in the order the book
/// presents them (best price first), taking `min(remaining, available)` at
/// each, until `qty` is satisfied or the levels run out.
///
/// Returns the total notional cost if `qty` can be fully filled, `None`
/// otherwise, so the caller can reject before any state change.
pub fn walk_liquidity(levels: &[(i64, i64)], qty: i64) -> Option<i64> {
    let mut remaining = qty;
    let mut cost: i64 = 0;
    for &(price, available) in levels {
        if remaining <= 0 {
            break;
        }
        let take = remaining.min(available);
        cost = cost.checked_add(take.checked_mul(price)?)?;
        remaining -= take;
    }
    if remaining <= 0 {
        Some(cost)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_bounded_by_both_sides() {
        assert_eq!(compute_fill(5, 3), 3);
        assert_eq!(compute_fill(2, 10), 2);
        assert_eq!(compute_fill(0, 10), 0);
    }

    #[test]
    fn limit_buyer_refunded_when_trade_clears_below_limit() {
        // BUY 10 @ 100, fills 4 @ 70
        let refund = buyer_overpayment_refund(Some(100), 70, 4).unwrap();
        assert_eq!(refund, 120);
    }

    #[test]
    fn market_buyer_never_refunded() {
        let refund = buyer_overpayment_refund(None, 70, 4).unwrap();
        assert_eq!(refund, 0);
    }

    #[test]
    fn limit_buyer_not_refunded_when_trade_at_limit() {
        let refund = buyer_overpayment_refund(Some(100), 100, 4).unwrap();
        assert_eq!(refund, 0);
    }

    #[test]
    fn resting_buyer_refunded_when_seller_crosses_below_their_bid() {
        let refund = resting_buyer_refund(100, 80, 5).unwrap();
        assert_eq!(refund, 100);
    }

    #[test]
    fn resting_buyer_not_refunded_when_trade_at_bid() {
        let refund = resting_buyer_refund(100, 100, 5).unwrap();
        assert_eq!(refund, 0);
    }

    #[test]
    fn liquidity_walk_succeeds_when_book_covers_qty() {
        // asks: 2 @ 50, 2 @ 60, with enough qty to cover the order
        let levels = [(50, 2), (60, 2)];
        let cost = walk_liquidity(&levels, 4).unwrap();
        assert_eq!(cost, 2 * 50 + 2 * 60);
    }

    #[test]
    fn liquidity_walk_fails_when_book_is_thin() {
        // asks 2 @ 50, 2 @ 60, market BUY 5 exceeds total depth
        let levels = [(50, 2), (60, 2)];
        assert!(walk_liquidity(&levels, 5).is_none());
    }

    #[test]
    fn liquidity_walk_handles_partial_level_consumption() {
        let levels = [(10, 5), (11, 5)];
        let cost = walk_liquidity(&levels, 7).unwrap();
        assert_eq!(cost, 5 * 10 + 2 * 11);
    }

    #[test]
    fn liquidity_walk_empty_book_fails_for_any_positive_qty() {
        let levels: [(i64, i64); 0] = [];
        assert!(walk_liquidity(&levels, 1).is_none());
    }
}
