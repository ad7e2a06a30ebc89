//! End-to-end engine scenarios. Each test gets a freshly migrated database
//! from `#[sqlx::test]` (migrations under `./migrations` run automatically).

use sqlx::PgPool;
use uuid::Uuid;

use toy_exchange::db::Database;
use toy_exchange::error::AppError;
use toy_exchange::models::{Direction, LimitOrderBody, MarketOrderBody, OrderBody, OrderStatus, Role};
use toy_exchange::services::{admin, ledger, lifecycle, order_book, store};
use toy_exchange::state::AppState;

const TICKER: &str = "MEMCOIN";
const RUB: &str = "RUB";

async fn state_from(pool: PgPool) -> AppState {
    AppState::new(Database { pool })
}

async fn make_user(pool: &PgPool, name: &str) -> Uuid {
    let mut tx = pool.begin().await.unwrap();
    let user = store::insert_user(&mut tx, name, Role::User).await.unwrap();
    tx.commit().await.unwrap();
    user.id
}

async fn create_instrument(state: &AppState) {
    admin::add_instrument(state, TICKER, "Meme Coin").await.unwrap();
}

fn limit(direction: Direction, qty: i64, price: i64) -> OrderBody {
    OrderBody::Limit(LimitOrderBody {
        direction,
        ticker: TICKER.to_string(),
        qty,
        price,
    })
}

fn market(direction: Direction, qty: i64) -> OrderBody {
    OrderBody::Market(MarketOrderBody {
        direction,
        ticker: TICKER.to_string(),
        qty,
    })
}

#[sqlx::test]
async fn crossing_at_seller_price(pool: PgPool) {
    let state = state_from(pool.clone()).await;
    create_instrument(&state).await;

    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;
    admin::deposit(&state, alice, RUB, 1000).await.unwrap();
    admin::deposit(&state, bob, TICKER, 10).await.unwrap();

    let sell = lifecycle::submit(&state, bob, limit(Direction::Sell, 5, 80)).await.unwrap();
    let buy = lifecycle::submit(&state, alice, limit(Direction::Buy, 5, 100)).await.unwrap();

    assert_eq!(buy.status, OrderStatus::Executed);
    assert_eq!(sell.status, OrderStatus::Executed);

    let trades = order_book::recent_trades(&pool, TICKER, 10).await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].amount, 5);
    assert_eq!(trades[0].price, 80);

    let alice_bal = ledger::snapshot(&pool, alice).await.unwrap();
    assert_eq!(alice_bal[RUB], 1000 - 5 * 80);
    assert_eq!(alice_bal[TICKER], 5);

    let bob_bal = ledger::snapshot(&pool, bob).await.unwrap();
    assert_eq!(bob_bal[RUB], 400);
    assert_eq!(bob_bal[TICKER], 5);
}

#[sqlx::test]
async fn limit_buy_refund_on_partial_fill_below_limit(pool: PgPool) {
    let state = state_from(pool.clone()).await;
    create_instrument(&state).await;

    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;
    admin::deposit(&state, alice, RUB, 1000).await.unwrap();
    admin::deposit(&state, bob, TICKER, 10).await.unwrap();

    let buy = lifecycle::submit(&state, alice, limit(Direction::Buy, 10, 100)).await.unwrap();
    assert_eq!(buy.status, OrderStatus::New);

    let alice_bal = ledger::snapshot(&pool, alice).await.unwrap();
    assert_eq!(alice_bal[RUB], 0);

    lifecycle::submit(&state, bob, limit(Direction::Sell, 4, 70)).await.unwrap();

    let refreshed = lifecycle::get_order(&state, alice, buy.id, false).await.unwrap();
    assert_eq!(refreshed.status, OrderStatus::PartiallyExecuted);
    assert_eq!(refreshed.filled, 4);

    // 1000 deposited, 1000 reserved on submit, 120 refunded on the partial fill
    let alice_bal = ledger::snapshot(&pool, alice).await.unwrap();
    assert_eq!(alice_bal[RUB], 120);
    assert_eq!(alice_bal[TICKER], 4);

    let bob_bal = ledger::snapshot(&pool, bob).await.unwrap();
    assert_eq!(bob_bal[RUB], 280);
}

#[sqlx::test]
async fn market_buy_rejects_when_book_is_thin(pool: PgPool) {
    let state = state_from(pool.clone()).await;
    create_instrument(&state).await;

    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;
    admin::deposit(&state, alice, RUB, 1000).await.unwrap();
    admin::deposit(&state, bob, TICKER, 10).await.unwrap();

    lifecycle::submit(&state, bob, limit(Direction::Sell, 2, 50)).await.unwrap();
    lifecycle::submit(&state, bob, limit(Direction::Sell, 2, 60)).await.unwrap();

    let result = lifecycle::submit(&state, alice, market(Direction::Buy, 5)).await;
    assert!(matches!(result, Err(AppError::InsufficientLiquidity)));

    let trades = order_book::recent_trades(&pool, TICKER, 10).await.unwrap();
    assert!(trades.is_empty());

    let alice_bal = ledger::snapshot(&pool, alice).await.unwrap();
    assert_eq!(alice_bal[RUB], 1000);
}

#[sqlx::test]
async fn cancellation_refunds_in_full_and_leaves_the_book(pool: PgPool) {
    let state = state_from(pool.clone()).await;
    create_instrument(&state).await;

    let alice = make_user(&pool, "alice").await;
    admin::deposit(&state, alice, RUB, 1000).await.unwrap();

    let order = lifecycle::submit(&state, alice, limit(Direction::Buy, 3, 50)).await.unwrap();
    let alice_bal = ledger::snapshot(&pool, alice).await.unwrap();
    assert_eq!(alice_bal[RUB], 850);

    let cancelled = lifecycle::cancel(&state, alice, order.id, false).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let alice_bal = ledger::snapshot(&pool, alice).await.unwrap();
    assert_eq!(alice_bal[RUB], 1000);

    let book = order_book::l2(&pool, TICKER, 10).await.unwrap();
    assert!(book.bid_levels.is_empty());
}

#[sqlx::test]
async fn price_time_priority_consumes_earlier_order_first(pool: PgPool) {
    let state = state_from(pool.clone()).await;
    create_instrument(&state).await;

    let seller = make_user(&pool, "seller").await;
    let buyer = make_user(&pool, "buyer").await;
    admin::deposit(&state, seller, TICKER, 10).await.unwrap();
    admin::deposit(&state, buyer, RUB, 1000).await.unwrap();

    let first = lifecycle::submit(&state, seller, limit(Direction::Sell, 2, 10)).await.unwrap();
    let second = lifecycle::submit(&state, seller, limit(Direction::Sell, 3, 10)).await.unwrap();

    lifecycle::submit(&state, buyer, limit(Direction::Buy, 4, 10)).await.unwrap();

    let first = lifecycle::get_order(&state, seller, first.id, false).await.unwrap();
    let second = lifecycle::get_order(&state, seller, second.id, false).await.unwrap();

    assert_eq!(first.status, OrderStatus::Executed);
    assert_eq!(first.filled, 2);
    assert_eq!(second.status, OrderStatus::PartiallyExecuted);
    assert_eq!(second.filled, 2);
}

#[sqlx::test]
async fn market_orders_cannot_be_cancelled(pool: PgPool) {
    let state = state_from(pool.clone()).await;
    create_instrument(&state).await;

    let seller = make_user(&pool, "seller").await;
    let buyer = make_user(&pool, "buyer").await;
    admin::deposit(&state, seller, TICKER, 10).await.unwrap();
    admin::deposit(&state, buyer, RUB, 1000).await.unwrap();

    lifecycle::submit(&state, seller, limit(Direction::Sell, 5, 10)).await.unwrap();
    let order = lifecycle::submit(&state, buyer, market(Direction::Buy, 5)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Executed);

    let result = lifecycle::cancel(&state, buyer, order.id, false).await;
    assert!(matches!(result, Err(AppError::CannotCancelMarket)));
}

#[sqlx::test]
async fn partially_executed_orders_cannot_be_cancelled(pool: PgPool) {
    let state = state_from(pool.clone()).await;
    create_instrument(&state).await;

    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;
    admin::deposit(&state, alice, RUB, 1000).await.unwrap();
    admin::deposit(&state, bob, TICKER, 10).await.unwrap();

    let buy = lifecycle::submit(&state, alice, limit(Direction::Buy, 10, 100)).await.unwrap();
    lifecycle::submit(&state, bob, limit(Direction::Sell, 4, 70)).await.unwrap();

    let refreshed = lifecycle::get_order(&state, alice, buy.id, false).await.unwrap();
    assert_eq!(refreshed.status, OrderStatus::PartiallyExecuted);
    assert!(refreshed.filled > 0);

    let result = lifecycle::cancel(&state, alice, buy.id, false).await;
    assert!(matches!(result, Err(AppError::CannotCancelExecuted)));

    // the reservation for the still-unfilled remainder is untouched by the rejected cancel
    let alice_bal = ledger::snapshot(&pool, alice).await.unwrap();
    assert_eq!(alice_bal[RUB], 120);
}
