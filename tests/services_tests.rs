// HTTP client tests for the school directory and company registry

use lycee_match::services::{
    CachedRegistry, CompanyRegistryClient, DirectoryError, DirectorySource, EducationDirectoryClient,
    FallbackRegistry, RegistryError, RegistrySource, SchoolQuery, StaticRegistry,
};
use mockito::Matcher;
use std::sync::Arc;

const DATASET: &str = "fr-en-annuaire-education";

fn records_path() -> String {
    format!("/catalog/datasets/{}/records", DATASET)
}

#[tokio::test]
async fn test_directory_client_parses_records() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", records_path().as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "20".into()),
            Matcher::UrlEncoded("offset".into(), "0".into()),
            Matcher::Regex("Seine-et-Marne".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "total_count": 2,
                "results": [
                    {
                        "identifiant_de_l_etablissement": "0770940D",
                        "nom_etablissement": "Lycée professionnel Charles Baudelaire",
                        "type_etablissement": "Lycée",
                        "statut_public_prive": "Public",
                        "nom_commune": "Meaux",
                        "libelle_departement": "Seine-et-Marne",
                        "code_postal": "77100",
                        "latitude": 48.9519,
                        "longitude": 2.8912,
                        "mail": "ce.0770940d@ac-creteil.fr",
                        "voie_professionnelle": "1"
                    },
                    {
                        "identifiant_de_l_etablissement": "0771234X",
                        "nom_etablissement": "Lycée Sainte-Marie",
                        "statut_public_prive": "Privé",
                        "formations": ["Bac pro Commerce", "BTS NDRC"]
                    }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = EducationDirectoryClient::new(server.url(), DATASET.to_string(), 5).unwrap();
    let query = SchoolQuery {
        department: Some("Seine-et-Marne".to_string()),
        vocational_only: true,
        limit: 20,
        ..Default::default()
    };

    let schools = client.list_schools(&query).await.unwrap();

    mock.assert_async().await;
    assert_eq!(schools.len(), 2);
    assert!(schools[0].is_public);
    assert_eq!(schools[0].programs, vec!["Voie professionnelle"]);
    assert_eq!(schools[1].programs, vec!["Bac pro Commerce", "BTS NDRC"]);
    assert!(!schools[1].is_public);
}

#[tokio::test]
async fn test_directory_client_reports_api_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", records_path().as_str())
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let client = EducationDirectoryClient::new(server.url(), DATASET.to_string(), 5).unwrap();
    let result = client
        .list_schools(&SchoolQuery {
            limit: 10,
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(DirectoryError::ApiError(_))));
}

#[tokio::test]
async fn test_registry_client_resolves_siret() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "90000000000011".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "results": [{
                    "siren": "900000000",
                    "nom_complet": "ATELIER NUMERIQUE DE LA MARNE",
                    "activite_principale": "62.01Z",
                    "siege": {
                        "siret": "90000000000011",
                        "libelle_commune": "MEAUX",
                        "code_postal": "77100",
                        "latitude": "48.9601",
                        "longitude": "2.8788"
                    }
                }],
                "total_results": 1
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = CompanyRegistryClient::new(server.url(), 5).unwrap();
    let business = client.resolve_business("90000000000011").await.unwrap().unwrap();

    mock.assert_async().await;
    assert_eq!(business.identity.legal_name, "ATELIER NUMERIQUE DE LA MARNE");
    assert_eq!(business.identity.activity_code.as_deref(), Some("62.01Z"));
    assert_eq!(business.sector.as_deref(), Some("informatique"));
    let location = business.location.unwrap();
    assert_eq!(location.postal_code(), Some("77100"));
    assert_eq!(location.coordinates(), Some((48.9601, 2.8788)));
}

#[tokio::test]
async fn test_registry_client_unknown_business() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": [], "total_results": 0}"#)
        .create_async()
        .await;

    let client = CompanyRegistryClient::new(server.url(), 5).unwrap();
    assert!(client.resolve_business("11111111111111").await.unwrap().is_none());
}

#[tokio::test]
async fn test_directory_client_filters_by_postal_prefix_and_keeps_lenient_records() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", records_path().as_str())
        .match_query(Matcher::Regex("startswith".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "results": [
                    {
                        "identifiant_de_l_etablissement": "0770940D",
                        "nom_etablissement": "Lycée professionnel Charles Baudelaire",
                        "code_postal": "77100",
                        "latitude": "48.9519",
                        "longitude": "2.8912"
                    },
                    { "nom_etablissement": "Record without identifier" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = EducationDirectoryClient::new(server.url(), DATASET.to_string(), 5).unwrap();
    let query = SchoolQuery {
        postal_prefix: Some("77".to_string()),
        limit: 20,
        ..Default::default()
    };

    let schools = client.list_schools(&query).await.unwrap();

    mock.assert_async().await;
    assert_eq!(schools.len(), 1);
    assert_eq!(schools[0].coordinates(), Some((48.9519, 2.8912)));
}

#[tokio::test]
async fn test_registry_outage_falls_back_without_caching() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let live = CompanyRegistryClient::new(server.url(), 5).unwrap();
    let cached = Arc::new(CachedRegistry::new(Arc::new(live), 100, 60));
    let chain = FallbackRegistry::new(cached.clone(), Arc::new(StaticRegistry::builtin()));

    let business = chain.resolve_business("90000000000011").await.unwrap().unwrap();
    assert_eq!(business.identity.legal_name, "ATELIER NUMERIQUE DE LA MARNE");

    // the live registry is asked again: fallback answers are not cached
    let again = chain.resolve_business("90000000000011").await.unwrap();
    assert!(again.is_some());

    // unknown to the fallback: the outage is reported, not "not found"
    let unknown = chain.resolve_business("12345678900012").await;
    assert!(matches!(unknown, Err(RegistryError::ApiError(_))));

    mock.assert_async().await;
    let stats = cached.stats();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.hit_count, 0);
    assert_eq!(stats.miss_count, 3);
}
