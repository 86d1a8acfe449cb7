// Import job tests: Naver geocoding is mocked with mockito, storage is the
// Postgres instance at DATABASE_URL

mod common;

use std::time::Duration;

use common::{clear_flood_damages, seed_flood_damages, test_credentials, test_pool};
use drain_watch_service::db::FloodDamageRepository;
use drain_watch_service::geocode_error::GeocodeError;
use drain_watch_service::geocoder::NaverMapsClient;
use drain_watch_service::services::flood_import_service::{
    parse_records, FloodDamageRecord, ImportError, ImportMode,
};
use drain_watch_service::services::FloodImportService;
use mockito::{Matcher, Mock, ServerGuard};
use serial_test::serial;
use sqlx::PgPool;

const GEOCODE_PATH: &str = "/map-geocode/v2/geocode";

async fn mock_address(server: &mut ServerGuard, address: &str, lat: &str, lng: &str) -> Mock {
    server
        .mock("GET", GEOCODE_PATH)
        .match_query(Matcher::UrlEncoded("query".into(), address.into()))
        .match_header("X-NCP-APIGW-API-KEY-ID", "test-client-id")
        .match_header("X-NCP-APIGW-API-KEY", "test-client-secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"status":"OK","addresses":[{{"roadAddress":"{address}","x":"{lng}","y":"{lat}"}}]}}"#
        ))
        .create_async()
        .await
}

async fn mock_no_match(server: &mut ServerGuard, address: &str) -> Mock {
    server
        .mock("GET", GEOCODE_PATH)
        .match_query(Matcher::UrlEncoded("query".into(), address.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"OK","meta":{"totalCount":0},"addresses":[]}"#)
        .create_async()
        .await
}

fn import_service(pool: &PgPool, server: &ServerGuard) -> FloodImportService {
    FloodImportService::new(
        FloodDamageRepository::new(pool.clone()),
        NaverMapsClient::with_base_url(server.url(), Some(test_credentials())),
    )
    .with_delay(Duration::ZERO)
}

fn records(json: &str) -> Vec<FloodDamageRecord> {
    parse_records(json).expect("fixture should parse")
}

#[tokio::test]
#[serial]
async fn test_import_skips_failed_address_and_keeps_the_rest() {
    let pool = test_pool().await;
    clear_flood_damages(pool).await;
    seed_flood_damages(pool, &[(900, 35.0, 126.0)]).await;

    let mut server = mockito::Server::new_async().await;
    let good = mock_address(&mut server, "광주광역시 북구 용봉동 1", "35.1768", "126.9057").await;
    let bad = mock_no_match(&mut server, "존재하지 않는 주소").await;

    let input = records(
        r#"[
            { "연번": 1, "주소": "광주광역시 북구 용봉동 1", "피해발생일자": "2020-08-08" },
            { "연번": 2, "주소": "존재하지 않는 주소", "피해발생일자": "2020-08-09" }
        ]"#,
    );

    let mut progress = Vec::new();
    let stats = import_service(pool, &server)
        .run(&input, ImportMode::Replace, |position, record| {
            progress.push((position, record.sequence))
        })
        .await
        .expect("a failed row must not abort the job");

    assert_eq!(stats.total, 2);
    assert_eq!(stats.imported, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(progress, vec![(1, 1), (2, 2)]);
    good.assert_async().await;
    bad.assert_async().await;

    // Replace mode dropped the pre-existing row
    let stored = FloodDamageRepository::new(pool.clone()).find_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sequence, 1);
    assert_eq!(stored[0].address, "광주광역시 북구 용봉동 1");
    assert_eq!(stored[0].damage_date, "2020-08-08");
    assert_eq!(stored[0].latitude, 35.1768);
    assert_eq!(stored[0].longitude, 126.9057);
}

#[tokio::test]
#[serial]
async fn test_import_survives_provider_errors() {
    let pool = test_pool().await;
    clear_flood_damages(pool).await;

    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("GET", GEOCODE_PATH)
        .match_query(Matcher::UrlEncoded("query".into(), "서버 오류 주소".into()))
        .with_status(500)
        .create_async()
        .await;
    let good = mock_address(&mut server, "광주광역시 남구 봉선동 2", "35.1333", "126.9111").await;

    let input = records(
        r#"[
            { "연번": 1, "주소": "서버 오류 주소", "피해발생일자": "2020-08-08" },
            { "연번": 2, "주소": "광주광역시 남구 봉선동 2", "피해발생일자": "2020-08-08" }
        ]"#,
    );

    let stats = import_service(pool, &server)
        .run(&input, ImportMode::Replace, |_, _| {})
        .await
        .unwrap();

    assert_eq!((stats.imported, stats.skipped), (1, 1));
    failing.assert_async().await;
    good.assert_async().await;

    let stored = FloodDamageRepository::new(pool.clone()).find_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sequence, 2);
}

#[tokio::test]
#[serial]
async fn test_sync_mode_upserts_and_prunes() {
    let pool = test_pool().await;
    clear_flood_damages(pool).await;
    seed_flood_damages(pool, &[(1, 35.0, 126.0), (2, 35.0, 126.0)]).await;
    let repo = FloodDamageRepository::new(pool.clone());
    let before = repo.find_all().await.unwrap();
    let original_one = before.iter().find(|r| r.sequence == 1).unwrap().clone();

    let mut server = mockito::Server::new_async().await;
    let _one = mock_address(&mut server, "광주광역시 서구 치평동 1", "35.1520", "126.8500").await;
    let _three = mock_address(&mut server, "광주광역시 광산구 수완동 3", "35.1900", "126.8200").await;

    let input = records(
        r#"[
            { "연번": 1, "주소": "광주광역시 서구 치평동 1", "피해발생일자": "2020-08-08" },
            { "연번": 3, "주소": "광주광역시 광산구 수완동 3", "피해발생일자": "2020-08-10" }
        ]"#,
    );

    let stats = import_service(pool, &server)
        .run(&input, ImportMode::Sync, |_, _| {})
        .await
        .unwrap();

    assert_eq!(stats.imported, 2);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.removed, 1);

    let mut stored = repo.find_all().await.unwrap();
    stored.sort_by_key(|r| r.sequence);
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].sequence, 1);
    assert_eq!(stored[0].id, original_one.id);
    assert_eq!(stored[0].created_at, original_one.created_at);
    assert_eq!(stored[0].address, "광주광역시 서구 치평동 1");
    assert_eq!(stored[0].latitude, 35.1520);
    assert_eq!(stored[1].sequence, 3);
}

#[tokio::test]
#[serial]
async fn test_import_without_credentials_leaves_table_untouched() {
    let pool = test_pool().await;
    clear_flood_damages(pool).await;
    seed_flood_damages(pool, &[(1, 35.1, 126.8)]).await;

    let service = FloodImportService::new(
        FloodDamageRepository::new(pool.clone()),
        NaverMapsClient::with_base_url("http://127.0.0.1:1".to_string(), None),
    );
    let input = records(
        r#"[{ "연번": 5, "주소": "광주광역시 동구 충장로 5", "피해발생일자": "2020-08-08" }]"#,
    );

    let result = service.run(&input, ImportMode::Replace, |_, _| {}).await;
    assert!(matches!(
        result,
        Err(ImportError::Geocode(GeocodeError::MissingCredentials))
    ));

    let repo = FloodDamageRepository::new(pool.clone());
    assert_eq!(repo.count().await.unwrap(), 1);
}
