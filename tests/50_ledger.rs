mod common;

use anyhow::Result;
use common::spawn_server;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn summary_totals_credits_and_debits() -> Result<()> {
    let server = spawn_server().await?;
    for (ledger_type, amount, date) in [
        ("credit", "1500.00", "2024-05-01"),
        ("credit", "499.90", "2024-05-02"),
        ("debit", "250.50", "2024-05-02"),
    ] {
        server
            .create(
                "/api/financial/ledger/",
                json!({ "ledger_type": ledger_type, "amount": amount, "description": "Mensalidade", "date": date }),
            )
            .await?;
    }

    let res = server.get("/api/financial/ledger/summary/").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let summary: Value = res.json().await?;
    assert_eq!(summary["total_credit"], "1999.90");
    assert_eq!(summary["total_debit"], "250.50");
    assert_eq!(summary["balance"], "1749.40");
    assert_eq!(summary["count"], 3);

    let res = server.get("/api/financial/ledger/summary/?date=2024-05-02").await?;
    let summary: Value = res.json().await?;
    assert_eq!(summary["balance"], "249.40");
    assert_eq!(summary["count"], 2);
    Ok(())
}

#[tokio::test]
async fn empty_summary_is_zero() -> Result<()> {
    let server = spawn_server().await?;

    let res = server.get("/api/financial/ledger/summary").await?;
    let summary: Value = res.json().await?;
    assert_eq!(summary["total_credit"], "0.00");
    assert_eq!(summary["balance"], "0.00");
    assert_eq!(summary["count"], 0);
    Ok(())
}

#[tokio::test]
async fn summary_route_is_not_an_entry_id() -> Result<()> {
    let server = spawn_server().await?;

    // `summary` resolves to the aggregate, other words are plain missing ids
    assert_eq!(server.get("/api/financial/ledger/summary/").await?.status(), StatusCode::OK);
    assert_eq!(server.get("/api/financial/ledger/totals/").await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}
