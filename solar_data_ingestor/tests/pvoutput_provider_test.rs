use chrono::NaiveDate;
use mockito::{Matcher, Server};
use solar_data_ingestor::{
    config::PvCredentials,
    models::{CoordinatePrecision, DateSpan, LocationId},
    providers::{ProviderError, PvProvider, pvoutput::PvOutputProvider},
};

const SYSTEM: &str = "Rooftop,6600,4350,22,300,LG,1,5000,Fronius,N,20,No,20190410,-27.4698,153.0251,5;1;0,0,0";

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn provider(server: &Server) -> PvOutputProvider {
    let credentials = PvCredentials::new("1234", "secret-key");
    PvOutputProvider::with_base_url(&credentials, server.url()).unwrap()
}

#[tokio::test]
async fn system_request_is_authenticated_and_decoded() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/getsystem.jsp")
        .match_header("x-pvoutput-apikey", "secret-key")
        .match_header("x-pvoutput-systemid", "1234")
        .match_query(Matcher::UrlEncoded("sid1".into(), "66991".into()))
        .with_status(200)
        .with_body(SYSTEM)
        .create_async()
        .await;

    let location = provider(&server).system(&LocationId::from(66991u64)).await.unwrap();

    assert_eq!(location.latitude, -27.4698);
    assert_eq!(location.longitude, 153.0251);
    assert_eq!(location.precision, Some(CoordinatePrecision::Exact));
    assert_eq!(location.power_rating_w, Some(6600.0));
    mock.assert_async().await;
}

#[tokio::test]
async fn output_request_carries_the_window() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/getoutput.jsp")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sid1".into(), "66991".into()),
            Matcher::UrlEncoded("df".into(), "20230101".into()),
            Matcher::UrlEncoded("dt".into(), "20230102".into()),
            Matcher::UrlEncoded("limit".into(), "150".into()),
            Matcher::UrlEncoded("insolation".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(
            "20230102,12400,1.879,NaN,NaN,4120,11:05AM,Fine,12.0,28.5,NaN,NaN,NaN,NaN,25310;\
             20230101,9800,1.485,NaN,NaN,3900,12:10PM,Showers,NaN,NaN,NaN,NaN,NaN,NaN,24000",
        )
        .create_async()
        .await;

    let span = DateSpan::new(d(2023, 1, 1), d(2023, 1, 2)).unwrap();
    let rows = provider(&server)
        .output(&LocationId::from(66991u64), span)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, d(2023, 1, 1));
    assert_eq!(rows[0].efficiency_kwh_per_kw, Some(1.485));
    assert_eq!(rows[1].max_temp_c, Some(28.5));
    mock.assert_async().await;
}

#[tokio::test]
async fn bad_request_marker_wins_over_the_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/getstatistic.jsp")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body("Bad request 400: No statuses found")
        .create_async()
        .await;

    let err = provider(&server)
        .statistic(&LocationId::from(66991u64))
        .await
        .unwrap_err();
    assert!(err.is_bad_request(), "{err}");
}

#[tokio::test]
async fn server_errors_keep_their_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/getstatistic.jsp")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("Service Unavailable")
        .create_async()
        .await;

    let err = provider(&server)
        .statistic(&LocationId::from(66991u64))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 503, .. }));
}

#[tokio::test]
async fn statistic_reads_the_output_extent() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/getstatistic.jsp")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("24600,2400,8200,7100,9800,1.23,150,20230101,20230530,95.5,20230301")
        .create_async()
        .await;

    let span = provider(&server)
        .statistic(&LocationId::from(66991u64))
        .await
        .unwrap();
    assert_eq!(span, DateSpan::new(d(2023, 1, 1), d(2023, 5, 30)).unwrap());
}

#[test]
fn api_key_with_newline_is_rejected() {
    let credentials = PvCredentials::new("1234", "bad\nkey");
    assert!(PvOutputProvider::with_base_url(&credentials, "http://localhost").is_err());
}
