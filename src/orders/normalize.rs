//! Order normalization and merge rules

use chrono::{SecondsFormat, Utc};
use rand::{rngs::OsRng, Rng, RngCore};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::OrderItem;
use crate::types::{Direction, OrderOrigin, OrderResult, OrderStatus, TradeType};

/// Numbers arrive as JSON numbers or decimal strings. Non-finite or
/// unparseable values are absent.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_float_prefix(s)?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Leading-numeric parse, so "12.5 USDT" reads as 12.5
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    if let Ok(n) = s.parse::<f64>() {
        return Some(n);
    }
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = s.as_bytes();
    while end < bytes.len() {
        let c = bytes[end] as char;
        match c {
            '0'..='9' => seen_digit = true,
            '+' | '-' if end == 0 => {}
            '+' | '-' if seen_exp && matches!(bytes[end - 1] as char, 'e' | 'E') => {}
            '.' if !seen_dot && !seen_exp => seen_dot = true,
            'e' | 'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    let mut candidate = &s[..end];
    while !candidate.is_empty() {
        if let Ok(n) = candidate.parse::<f64>() {
            return Some(n);
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    None
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// UUID v4 from the OS RNG, else `<millis>-<7 base36 chars>`
pub fn generate_order_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(e) => {
            debug!(error = %e, "OS RNG unavailable, using fallback order id");
            fallback_order_id()
        }
    }
}

fn fallback_order_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// null and missing behave the same
fn field<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|v| !v.is_null())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_empty_str<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    field(raw, key)?.as_str().filter(|s| !s.is_empty())
}

fn normalize_pair(raw: &Value) -> String {
    non_empty_str(raw, "pair")
        .or_else(|| non_empty_str(raw, "symbol"))
        .or_else(|| {
            field(raw, "predictionOption").and_then(|option| non_empty_str(option, "pair"))
        })
        .unwrap_or_default()
        .to_string()
}

fn normalize_duration(raw: &Value) -> Option<String> {
    if let Some(duration) = field(raw, "duration").and_then(stringify) {
        return Some(duration);
    }
    ["option", "predictionOption"].iter().find_map(|key| {
        let seconds = field(raw, key)?.get("seconds").filter(|s| truthy(s))?;
        stringify(seconds).map(|s| format!("{}s", s))
    })
}

fn explicit_result(raw: &Value) -> Option<OrderResult> {
    ["result", "outcome"]
        .iter()
        .find_map(|key| field(raw, key)?.as_str().and_then(OrderResult::from_exact))
}

/// A completed order with no explicit result but a non-zero settled loss
/// amount is read as a LOSS.
pub fn infer_loss_from_settlement(order: &OrderItem) -> Option<OrderResult> {
    if order.result.is_some() || order.status != OrderStatus::Completed {
        return order.result;
    }
    match order.settled_loss_amount {
        Some(loss) if loss != 0.0 => Some(OrderResult::Loss),
        _ => None,
    }
}

/// Map one raw backend record onto `OrderItem`
pub fn normalize_order(raw: &Value) -> OrderItem {
    let id = field(raw, "id")
        .or_else(|| field(raw, "_id"))
        .and_then(stringify)
        .unwrap_or_else(generate_order_id);

    let user_id = field(raw, "userId")
        .filter(|v| truthy(v))
        .and_then(stringify);

    let trade_type = ["type", "positionType", "direction"]
        .iter()
        .find_map(|key| field(raw, key))
        .and_then(Value::as_str)
        .map(TradeType::from_loose)
        .unwrap_or(TradeType::Buy);

    let number = |key: &str| field(raw, key).and_then(coerce_number);

    let mut order = OrderItem {
        id,
        user_id,
        pair: normalize_pair(raw),
        amount: number("amount").unwrap_or(0.0),
        currency: field(raw, "currency")
            .and_then(Value::as_str)
            .unwrap_or("USDT")
            .to_string(),
        trade_type,
        direction: field(raw, "direction")
            .and_then(Value::as_str)
            .and_then(Direction::from_exact),
        status: OrderStatus::from_loose(field(raw, "status").and_then(Value::as_str)),
        created_at: field(raw, "createdAt")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(now_rfc3339),
        updated_at: field(raw, "updatedAt")
            .and_then(Value::as_str)
            .map(str::to_string),
        price: number("price"),
        duration: normalize_duration(raw),
        forced_loss_expected: field(raw, "forcedLossExpected").map(truthy),
        loss_percent: number("lossPercent").or_else(|| number("returnRate")),
        expected_loss_amount: field(raw, "expectedLossAmount")
            .or_else(|| field(raw, "forcedLossAmount"))
            .and_then(coerce_number),
        result: explicit_result(raw),
        settled_payout: number("settledPayout"),
        settled_loss_amount: number("settledLossAmount"),
        origin: OrderOrigin::Server,
    };
    order.result = infer_loss_from_settlement(&order);
    order
}

fn keep_pair(server: &str, previous: &str) -> String {
    if server.is_empty() || server == "Unknown" {
        previous.to_string()
    } else {
        server.to_string()
    }
}

/// Merge a fresh server list into the previous collection.
///
/// Server records come first, in server order, with presentation fields
/// back-filled from their previous copy. Local orders the server has not
/// confirmed follow. Everything else from `previous` is dropped.
pub fn merge_orders(previous: &[OrderItem], server: Vec<OrderItem>) -> Vec<OrderItem> {
    let prev_by_id: HashMap<&str, &OrderItem> =
        previous.iter().map(|o| (o.id.as_str(), o)).collect();
    let server_ids: HashSet<String> = server.iter().map(|o| o.id.clone()).collect();

    let mut merged: Vec<OrderItem> = server
        .into_iter()
        .map(|order| match prev_by_id.get(order.id.as_str()) {
            None => order,
            Some(existing) => OrderItem {
                pair: keep_pair(&order.pair, &existing.pair),
                duration: order.duration.or_else(|| existing.duration.clone()),
                price: order.price.or(existing.price),
                forced_loss_expected: order
                    .forced_loss_expected
                    .or(existing.forced_loss_expected),
                loss_percent: order.loss_percent.or(existing.loss_percent),
                expected_loss_amount: order
                    .expected_loss_amount
                    .or(existing.expected_loss_amount),
                ..order
            },
        })
        .collect();

    merged.extend(
        previous
            .iter()
            .filter(|o| o.origin == OrderOrigin::Local && !server_ids.contains(&o.id))
            .cloned(),
    );
    merged
}
