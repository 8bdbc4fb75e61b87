mod common;

use anyhow::Result;
use common::spawn_server;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn titles(server: &common::TestServer, path: &str) -> Result<Vec<String>> {
    let res = server.get(path).await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "GET {} returned {}", path, res.status());
    let rows: Vec<Value> = res.json().await?;
    Ok(rows
        .iter()
        .filter_map(|r| r["title"].as_str().or_else(|| r["company_name"].as_str()))
        .map(String::from)
        .collect())
}

#[tokio::test]
async fn allow_listed_filters_narrow_the_list() -> Result<()> {
    let server = spawn_server().await?;
    for (title, status) in [("Planilha", "pending"), ("Relatório", "completed"), ("Reunião", "pending")] {
        server.create("/api/tasks/all/", json!({ "title": title, "status": status })).await?;
    }

    assert_eq!(titles(&server, "/api/tasks/all/?status=pending").await?, vec!["Planilha", "Reunião"]);
    assert_eq!(titles(&server, "/api/tasks/all/?status=completed").await?, vec!["Relatório"]);
    assert_eq!(titles(&server, "/api/tasks/all/").await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn unknown_and_empty_params_are_ignored() -> Result<()> {
    let server = spawn_server().await?;
    server.create("/api/tasks/all/", json!({ "title": "Única" })).await?;

    assert_eq!(titles(&server, "/api/tasks/all/?nada=1&status=").await?, vec!["Única"]);
    Ok(())
}

#[tokio::test]
async fn invalid_filter_value_is_a_field_error() -> Result<()> {
    let server = spawn_server().await?;

    let res = server.get("/api/support/tickets/?priority=Altíssima").await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert!(body["field_errors"]["priority"].is_string());
    Ok(())
}

#[tokio::test]
async fn every_search_term_must_match_case_insensitively() -> Result<()> {
    let server = spawn_server().await?;
    server.client_profile("Escritório Alfa", "10.000.000/0001-01").await?;
    server.client_profile("Contábil Beta", "20.000.000/0001-02").await?;
    server.client_profile("Gama Serviços", "30.000.000/0001-03").await?;

    assert_eq!(titles(&server, "/api/clients/profiles/?search=alfa").await?, vec!["Escritório Alfa"]);
    assert_eq!(titles(&server, "/api/clients/profiles/?search=cont%20BETA").await?, vec!["Contábil Beta"]);
    assert!(titles(&server, "/api/clients/profiles/?search=alfa%20beta").await?.is_empty());
    // responsible_name is searched too
    assert_eq!(titles(&server, "/api/clients/profiles/?search=marina").await?.len(), 3);
    assert_eq!(titles(&server, "/api/clients/profiles/?search=20.000").await?, vec!["Contábil Beta"]);
    assert!(titles(&server, "/api/clients/profiles/?search=delta").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn project_search_reaches_client_company_name() -> Result<()> {
    let server = spawn_server().await?;
    let alfa = server.client_profile("Escritório Alfa", "10.000.000/0001-01").await?;
    let beta = server.client_profile("Contábil Beta", "20.000.000/0001-02").await?;
    server.project("Implantação", &alfa).await?;
    server.project("Revisão", &beta).await?;

    assert_eq!(titles(&server, "/api/projects/projects/?search=alfa").await?, vec!["Implantação"]);
    assert_eq!(titles(&server, "/api/projects/projects/?search=revis").await?, vec!["Revisão"]);
    assert_eq!(
        titles(&server, &format!("/api/projects/projects/?client={}", beta["id"])).await?,
        vec!["Revisão"]
    );
    Ok(())
}

#[tokio::test]
async fn renamed_filter_param() -> Result<()> {
    let server = spawn_server().await?;
    let client = server.client_profile("Kappa", "40.000.000/0001-04").await?;
    let project = server.project("Docs", &client).await?;
    for (title, doc_type) in [("POP Folha", "POP"), ("Contrato 2024", "Contrato")] {
        server
            .create(
                "/api/projects/documents/",
                json!({ "project": project["id"], "title": title, "doc_type": doc_type, "url": "https://drive.example.com/x" }),
            )
            .await?;
    }

    assert_eq!(titles(&server, "/api/projects/documents/?type=Contrato").await?, vec!["Contrato 2024"]);
    Ok(())
}
