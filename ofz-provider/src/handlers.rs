//! Route handlers for the signed-price HTTP surface (spec §4.7).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use ofz_oracle::scaling::scale_price;
use ofz_oracle::types::{BondDetails, PriceEntry, PriceSnapshot, Quote};

use crate::error::AppError;
use crate::state::AppState;

fn wants_signature(params: &HashMap<String, String>) -> bool {
    params.contains_key("sign")
}

fn wants_onchain(params: &HashMap<String, String>) -> bool {
    params
        .get("onchain")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

async fn price_entry(
    state: &AppState,
    secid: &str,
    quote: Quote,
    with_signature: bool,
) -> Result<PriceEntry, AppError> {
    let price_uint = scale_price(quote.price_percent, state.config.price_scaling_factor);

    let mut entry = PriceEntry {
        price: quote.price_percent,
        price_uint: price_uint.to_string(),
        is_current_market_data: quote.is_current(),
        data_source: quote.source_field.data_source_label().to_string(),
        signature: None,
        nonce: None,
        deadline: None,
    };

    if with_signature {
        let nonce = state.nonce_store.next().await?;
        let deadline = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + state.config.signature_expiry.as_secs();
        let attestation = state
            .signer
            .sign_price_update(secid, price_uint, nonce, deadline)
            .await?;
        entry.signature = Some(attestation.signature);
        entry.nonce = Some(nonce);
        entry.deadline = Some(deadline);
    }

    Ok(entry)
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": now(),
        "signer_address": state.signer.address().to_string(),
        "cache_ttl": state.config.cache_ttl.as_secs(),
        "price_scaling_factor": state.config.price_scaling_factor,
        "chain_id": state.config.chain_id,
    }))
}

pub async fn get_all_prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let with_signature = wants_signature(&params);

    if let Some(cached) = state.price_cache.get().await {
        return Ok(Json(project_snapshot(cached, with_signature)));
    }

    let _guard = state.price_cache.refresh_guard().await;
    if let Some(cached) = state.price_cache.get().await {
        return Ok(Json(project_snapshot(cached, with_signature)));
    }

    let instruments = state.exchange.fetch_ofz_list().await?;
    let mut prices = HashMap::new();
    for instrument in instruments {
        if let Some(quote) = state.resolver.resolve(&instrument.secid).await? {
            let entry = price_entry(&state, &instrument.secid, quote, true).await?;
            prices.insert(instrument.secid, entry);
        }
    }

    let snapshot = PriceSnapshot {
        timestamp: now(),
        prices,
    };
    state.price_cache.set(&snapshot).await?;
    Ok(Json(project_snapshot(snapshot, with_signature)))
}

fn project_snapshot(snapshot: PriceSnapshot, with_signature: bool) -> Value {
    let prices: HashMap<String, PriceEntry> = if with_signature {
        snapshot.prices
    } else {
        snapshot
            .prices
            .into_iter()
            .map(|(secid, entry)| (secid, entry.without_signature()))
            .collect()
    };
    json!({ "timestamp": snapshot.timestamp, "prices": prices })
}

pub async fn get_price_for_secid(
    State(state): State<Arc<AppState>>,
    Path(secid): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let with_signature = wants_signature(&params);

    if let Some(cached) = state.price_cache.get().await {
        if let Some(entry) = cached.prices.get(&secid) {
            let entry = if with_signature {
                entry.clone()
            } else {
                entry.without_signature()
            };
            return Ok(Json(json!({ "timestamp": cached.timestamp, "price": entry })));
        }
    }

    let quote = state
        .resolver
        .resolve(&secid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no price data available for {secid}")))?;
    let entry = price_entry(&state, &secid, quote, with_signature).await?;
    Ok(Json(json!({ "timestamp": now(), "price": entry })))
}

pub async fn get_all_bonds(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let onchain_only = wants_onchain(&params);
    let instruments = state.exchange.fetch_ofz_list().await?;

    let registered = if onchain_only {
        Some(registered_secids(&state).await?)
    } else {
        None
    };

    let bonds: Vec<Value> = instruments
        .into_iter()
        .filter(|i| registered.as_ref().map(|r| r.contains_key(&i.secid)).unwrap_or(true))
        .map(|i| json!({ "secid": i.secid, "shortname": i.shortname }))
        .collect();

    Ok(Json(json!({
        "timestamp": now(),
        "count": bonds.len(),
        "bonds": bonds,
        "filtered_by_onchain": onchain_only,
    })))
}

pub async fn get_all_details(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let onchain_only = wants_onchain(&params);
    let instruments = state.exchange.fetch_ofz_list().await?;

    let registered = if onchain_only {
        Some(registered_secids(&state).await?)
    } else {
        None
    };

    let mut bonds = HashMap::new();
    for instrument in instruments {
        if let Some(r) = &registered {
            if !r.contains_key(&instrument.secid) {
                continue;
            }
        }
        let details = state.exchange.bond_details(&instrument.secid).await?;
        let mut value = details_to_json(&details, state.config.price_scaling_factor);
        if let Some(quote) = state.resolver.resolve(&instrument.secid).await? {
            let price_uint = scale_price(quote.price_percent, state.config.price_scaling_factor);
            value["price"] = json!(quote.price_percent);
            value["price_uint"] = json!(price_uint.to_string());
            value["is_current_market_data"] = json!(quote.is_current());
            value["data_source"] = json!(quote.source_field.data_source_label());
        }
        bonds.insert(instrument.secid, value);
    }

    Ok(Json(json!({
        "timestamp": now(),
        "bonds": bonds,
        "filtered_by_onchain": onchain_only,
    })))
}

pub async fn get_details_for_secid(
    State(state): State<Arc<AppState>>,
    Path(secid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let details = state.exchange.bond_details(&secid).await?;
    if details.maturity_at.is_none() {
        return Err(AppError::not_found(format!(
            "bond {secid} not found or details not available"
        )));
    }

    let mut value = details_to_json(&details, state.config.price_scaling_factor);
    if let Some(quote) = state.resolver.resolve(&secid).await? {
        let price_uint = scale_price(quote.price_percent, state.config.price_scaling_factor);
        value["price"] = json!(quote.price_percent);
        value["price_uint"] = json!(price_uint.to_string());
        value["is_current_market_data"] = json!(quote.is_current());
        value["data_source"] = json!(quote.source_field.data_source_label());
    }

    Ok(Json(json!({ "timestamp": now(), "details": value })))
}

/// Price-denominated fields expressed both as a decimal and as the
/// contract's fixed-point representation, mirroring `/api/details`'s
/// `<field>_uint` companions in the original service.
fn details_to_json(details: &BondDetails, scaling_factor: u64) -> Value {
    let mut value = serde_json::to_value(details).expect("BondDetails always serializes");
    let uint_fields = [
        ("initial_price", &details.initial_price),
        ("maturity_price", &details.maturity_price),
        ("coupon_value", &details.coupon_value),
        ("accrued_int", &details.accrued_int),
    ];
    for (field, amount) in uint_fields {
        if let Some(amount) = amount {
            let scaled = scale_price(*amount, scaling_factor);
            value[format!("{field}_uint")] = json!(scaled.to_string());
        }
    }
    value
}

/// SECIDs registered on-chain, keyed for `O(1)` membership checks.
/// Backed by the Provider's own `RegisteredBondsCache`; on a miss it
/// queries `secidToBond` for every candidate the exchange currently
/// lists, exactly as the original service's `get_registered_bonds` did.
async fn registered_secids(
    state: &AppState,
) -> Result<HashMap<String, alloy::primitives::Address>, AppError> {
    if let Some(cached) = state.bond_cache.get().await {
        return Ok(cached.into_iter().collect());
    }

    let instruments = state.exchange.fetch_ofz_list().await?;
    let mut registered = Vec::new();
    for instrument in instruments {
        match state.chain.secid_to_bond(&instrument.secid).await {
            Ok(addr) if addr != alloy::primitives::Address::ZERO => {
                registered.push((instrument.secid, addr));
            }
            Ok(_) => {}
            Err(e) => log::warn!("error checking secid {}: {e}", instrument.secid),
        }
    }
    state.bond_cache.set(registered.clone()).await;
    Ok(registered.into_iter().collect())
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
