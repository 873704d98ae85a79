#![allow(dead_code)]

use std::str::FromStr;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use ledger_settlement::{
    models::credential::Credentials,
    services::{
        balance_store::BalanceStore,
        ledger::Ledger,
        lock_table::{LockTable, OwnershipPolicy},
    },
};

pub const BUSINESS_TOKEN: &str = "business-token";
pub const CLIENT_TOKEN: &str = "client-token";

pub fn ledger(policy: OwnershipPolicy) -> Ledger {
    Ledger::new(
        LockTable::new(Duration::from_millis(50), policy),
        BalanceStore::seeded(10, Decimal::from(1000)),
    )
}

pub fn credentials(identity: &str, token: &str) -> Credentials {
    let mut credentials = Credentials::default();
    credentials.register(identity, token);
    credentials
}

/// Send one request through the router and decode the JSON body.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Balances travel as decimal strings; compare them numerically.
pub fn balance_of(body: &Value) -> Decimal {
    match &body["balance"] {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}
