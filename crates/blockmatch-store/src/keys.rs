//! Key layout.
//!
//! Every key starts with a one-byte family prefix. Product symbols never
//! contain `0x00`, which separates them from the rest of a key.

use blockmatch_types::{BlockmatchError, OrderId, OrderSide, Product, Result};
use rust_decimal::Decimal;

pub const ORDER_PREFIX: u8 = 0x01;
pub const BLOCK_ORDER_NUM_PREFIX: u8 = 0x02;
pub const PRICE_LEVEL_PREFIX: u8 = 0x03;
pub const DEPTH_BOOK_PREFIX: u8 = 0x04;
pub const PRODUCT_LOCK_PREFIX: u8 = 0x05;
pub const LAST_CLOSED_ORDER_IDS_KEY: &[u8] = &[0x06];
pub const LAST_EXPIRED_HEIGHT_KEY: &[u8] = &[0x07];
pub const LAST_BLOCK_HEIGHT_KEY: &[u8] = &[0x08];
pub const LAST_BLOCK_SUMMARY_KEY: &[u8] = &[0x09];

const SEPARATOR: u8 = 0x00;

#[must_use]
pub fn order_key(id: &OrderId) -> Vec<u8> {
    prefixed(ORDER_PREFIX, id.to_string().as_bytes())
}

/// Prefix shared by every order placed at `height`.
#[must_use]
pub fn orders_at_height_prefix(height: u64) -> Vec<u8> {
    prefixed(ORDER_PREFIX, OrderId::height_prefix(height).as_bytes())
}

#[must_use]
pub fn block_order_num_key(height: u64) -> Vec<u8> {
    prefixed(BLOCK_ORDER_NUM_PREFIX, &height.to_be_bytes())
}

/// Canonical price text: `10.0` and `10` share a key.
#[must_use]
pub fn price_text(price: &Decimal) -> String {
    price.normalize().to_string()
}

#[must_use]
pub fn price_level_key(product: &Product, price: &Decimal, side: OrderSide) -> Vec<u8> {
    let mut key = product_scoped(PRICE_LEVEL_PREFIX, product);
    key.push(side_byte(side));
    key.extend_from_slice(price_text(price).as_bytes());
    key
}

#[must_use]
pub fn price_level_product_prefix(product: &Product) -> Vec<u8> {
    product_scoped(PRICE_LEVEL_PREFIX, product)
}

/// Split a price-level key back into its parts.
///
/// # Errors
/// Returns `CorruptState` if the key does not have the expected shape.
pub fn parse_price_level_key(key: &[u8]) -> Result<(Product, OrderSide, Decimal)> {
    let corrupt = |reason: &str| BlockmatchError::CorruptState {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: reason.to_string(),
    };
    let body = key
        .strip_prefix(&[PRICE_LEVEL_PREFIX])
        .ok_or_else(|| corrupt("not a price-level key"))?;
    let split = body
        .iter()
        .position(|b| *b == SEPARATOR)
        .ok_or_else(|| corrupt("missing separator"))?;
    let symbol = std::str::from_utf8(&body[..split]).map_err(|_| corrupt("symbol not utf-8"))?;
    let product: Product = symbol.parse().map_err(|_| corrupt("bad symbol"))?;
    let side = match body.get(split + 1) {
        Some(b'B') => OrderSide::Buy,
        Some(b'S') => OrderSide::Sell,
        _ => return Err(corrupt("bad side")),
    };
    let price = std::str::from_utf8(&body[split + 2..])
        .map_err(|_| corrupt("price not utf-8"))?
        .parse::<Decimal>()
        .map_err(|_| corrupt("bad price"))?;
    Ok((product, side, price))
}

#[must_use]
pub fn depth_book_key(product: &Product) -> Vec<u8> {
    prefixed(DEPTH_BOOK_PREFIX, product.symbol().as_bytes())
}

#[must_use]
pub fn product_lock_key(product: &Product) -> Vec<u8> {
    prefixed(PRODUCT_LOCK_PREFIX, product.symbol().as_bytes())
}

/// Product symbol stored after a one-byte family prefix.
///
/// # Errors
/// Returns `CorruptState` if the suffix is not a product symbol.
pub fn parse_product_suffix(key: &[u8]) -> Result<Product> {
    let corrupt = || BlockmatchError::CorruptState {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: "bad product suffix".to_string(),
    };
    let symbol = key
        .get(1..)
        .and_then(|s| std::str::from_utf8(s).ok())
        .ok_or_else(corrupt)?;
    symbol.parse().map_err(|_| corrupt())
}

fn side_byte(side: OrderSide) -> u8 {
    match side {
        OrderSide::Buy => b'B',
        OrderSide::Sell => b'S',
    }
}

fn prefixed(prefix: u8, body: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(body.len() + 1);
    key.push(prefix);
    key.extend_from_slice(body);
    key
}

fn product_scoped(prefix: u8, product: &Product) -> Vec<u8> {
    let mut key = prefixed(prefix, product.symbol().as_bytes());
    key.push(SEPARATOR);
    key
}
