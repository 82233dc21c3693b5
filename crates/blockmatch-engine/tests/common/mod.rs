//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use blockmatch_engine::{Engine, ListedProducts};
use blockmatch_settlement::BalanceLedger;
use blockmatch_store::MemStore;
use blockmatch_types::{AccountId, Coin, NewOrder, OrderId, OrderSide, Params, Product};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

pub type TestEngine = Engine<MemStore, BalanceLedger, ListedProducts>;

pub const FEE_COLLECTOR: AccountId = AccountId::from_bytes([0xFE; 16]);

/// Route engine logs to the test harness. `RUST_LOG` overrides the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn btc_usdt() -> Product {
    Product::new("btc", "usdt").unwrap()
}

pub fn token_native() -> Product {
    Product::new("token", "native").unwrap()
}

pub fn params(max_deals_per_block: u32, order_expire_blocks: u64) -> Params {
    Params {
        max_deals_per_block,
        order_expire_blocks,
        ..Params::default()
    }
}

pub fn engine(products: &[Product]) -> TestEngine {
    init_tracing();
    Engine::open(
        MemStore::new(),
        BalanceLedger::new(FEE_COLLECTOR),
        ListedProducts::with(products.iter().cloned()),
    )
    .unwrap()
}

/// A fresh account holding `coins`.
pub fn account(engine: &mut TestEngine, coins: &[(&str, &str)]) -> AccountId {
    let account = AccountId::new();
    for (denom, amount) in coins {
        engine
            .ledger_mut()
            .deposit(&account, &Coin::new(*denom, dec(amount)))
            .unwrap();
    }
    account
}

pub fn place(
    engine: &mut TestEngine,
    sender: AccountId,
    product: &Product,
    side: OrderSide,
    price: &str,
    quantity: &str,
) -> OrderId {
    engine
        .place_order(NewOrder {
            sender,
            product: product.clone(),
            side,
            price: dec(price),
            quantity: dec(quantity),
        })
        .unwrap()
}

pub fn available(engine: &TestEngine, account: &AccountId, denom: &str) -> Decimal {
    engine.ledger().balance(account, denom).available
}

pub fn locked(engine: &TestEngine, account: &AccountId, denom: &str) -> Decimal {
    engine.ledger().balance(account, denom).locked
}

/// Run one empty block.
pub fn idle_block(engine: &mut TestEngine, height: u64, params: &Params) {
    engine.begin_block(height, params.clone()).unwrap();
    engine.end_block().unwrap();
}
