use base64::prelude::*;
use chrono::NaiveDate;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

use linky::api::consumption::{ConsumptionClient, Granularity};
use linky::api::DateRange;
use linky::{Credentials, Linky, LinkyError, Session};

const DATA_PATH: &str = "/group/espace-particuliers/suivi-de-consommation";
const PORTLET_ID: &str = "lincspartdisplaycdc_WAR_lincspartcdcportlet";

fn portal(server: &ServerGuard) -> Linky {
    Linky::new().with_base_urls(server.url(), api_base(server))
}

fn api_base(server: &ServerGuard) -> String {
    format!("{}/group/espace-particuliers", server.url())
}

fn accepting_login(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/auth/UI/Login")
        .with_status(302)
        .with_header("location", "/group/espace-particuliers/accueil")
        .with_header("set-cookie", "iPlanetDirectoryPro=tok123; Path=/")
        .with_header("set-cookie", "affinity=node7; Path=/")
        .create()
}

fn logged_in(server: &mut ServerGuard) -> Session {
    let _login = accepting_login(server);
    portal(server)
        .login(&Credentials::new("jane@example.org", "hunter2"))
        .unwrap()
}

fn graphe_payload() -> String {
    json!({
        "etat": {"valeur": "termine"},
        "graphe": {
            "data": [{"ordre": 0, "valeur": -5}, {"ordre": 1, "valeur": 12}],
            "periode": {"dateDebut": "01/01/2020", "dateFin": "01/02/2020"},
            "decalage": 2,
            "puissanceSouscrite": 9
        }
    })
    .to_string()
}

fn october() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2016, 10, 27).unwrap(),
        NaiveDate::from_ymd_opt(2016, 10, 30).unwrap(),
    )
}

#[test]
fn login_posts_the_portal_form() {
    let mut server = Server::new();
    let goto = BASE64_STANDARD.encode(format!("{}/accueil", api_base(&server)));

    let login = server
        .mock("POST", "/auth/UI/Login")
        .match_header("user-agent", "Linkindle/1.0.0")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("IDToken1".into(), "jane@example.org".into()),
            Matcher::UrlEncoded("IDToken2".into(), "hunter2".into()),
            Matcher::UrlEncoded("goto".into(), goto),
            Matcher::UrlEncoded("gotoOnFail".into(), "".into()),
            Matcher::UrlEncoded("SunQueryParamsString".into(), "cmVhbG09cGFydGljdWxpZXJz".into()),
            Matcher::UrlEncoded("encoded".into(), "true".into()),
            Matcher::UrlEncoded("gx_charset".into(), "UTF-8".into()),
        ]))
        .with_status(302)
        .with_header("location", "/group/espace-particuliers/accueil")
        .with_header("set-cookie", "iPlanetDirectoryPro=tok123; Path=/")
        .create();

    let session = portal(&server)
        .login(&Credentials::new("jane@example.org", "hunter2"))
        .unwrap();

    assert_eq!(session.token(), "tok123");
    login.assert();
}

#[test]
fn login_does_not_follow_the_redirect() {
    let mut server = Server::new();
    let _login = accepting_login(&mut server);
    let home = server
        .mock("GET", "/group/espace-particuliers/accueil")
        .expect(0)
        .create();

    portal(&server)
        .login(&Credentials::new("jane@example.org", "hunter2"))
        .unwrap();

    home.assert();
}

#[test]
fn login_keeps_every_cookie() {
    let mut server = Server::new();
    let session = logged_in(&mut server);

    let cookies = session
        .cookie_header(&format!("{}{}", server.url(), DATA_PATH))
        .unwrap();
    assert!(cookies.contains("iPlanetDirectoryPro=tok123"));
    assert!(cookies.contains("affinity=node7"));
}

#[test]
fn login_without_session_cookie_fails() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/auth/UI/Login")
        .with_status(200)
        .with_header("set-cookie", "affinity=node7; Path=/")
        .with_body("<html>Identifiant ou mot de passe incorrect</html>")
        .create();

    let result = portal(&server).login(&Credentials::new("jane@example.org", "wrong"));

    assert!(matches!(result, Err(LinkyError::Authentication(_))));
}

#[test]
fn server_errors_on_login_look_like_bad_credentials() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/auth/UI/Login")
        .with_status(500)
        .create();

    let result = portal(&server).login(&Credentials::new("jane@example.org", "hunter2"));

    assert!(matches!(result, Err(LinkyError::Authentication(_))));
}

#[test]
fn unreachable_portal_is_a_transport_error() {
    let linky = Linky::new().with_base_urls(
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1/group/espace-particuliers".to_string(),
    );

    let result = linky.login(&Credentials::new("jane@example.org", "hunter2"));

    assert!(matches!(result, Err(LinkyError::Transport(_))));
}

#[test]
fn fetch_sends_session_query_and_dates() {
    let mut server = Server::new();
    let session = logged_in(&mut server);

    let data = server
        .mock("POST", DATA_PATH)
        .match_header("user-agent", "Linkindle/1.0.0")
        .match_header(
            "cookie",
            Matcher::AllOf(vec![
                Matcher::Regex("iPlanetDirectoryPro=tok123".into()),
                Matcher::Regex("affinity=node7".into()),
            ]),
        )
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("p_p_id".into(), PORTLET_ID.into()),
            Matcher::UrlEncoded("p_p_lifecycle".into(), "2".into()),
            Matcher::UrlEncoded("p_p_state".into(), "normal".into()),
            Matcher::UrlEncoded("p_p_mode".into(), "view".into()),
            Matcher::UrlEncoded("p_p_resource_id".into(), "urlCdcJour".into()),
            Matcher::UrlEncoded("p_p_cacheability".into(), "cacheLevelPage".into()),
            Matcher::UrlEncoded("p_p_col_id".into(), "column-1".into()),
            Matcher::UrlEncoded("p_p_col_pos".into(), "1".into()),
            Matcher::UrlEncoded("p_p_col_count".into(), "3".into()),
        ]))
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded(format!("_{}_dateDebut", PORTLET_ID), "27/10/2016".into()),
            Matcher::UrlEncoded(format!("_{}_dateFin", PORTLET_ID), "30/10/2016".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(graphe_payload())
        .create();

    let series = ConsumptionClient::new(&session).per_day(october()).unwrap();

    assert_eq!(series.granularity, Granularity::Day);
    assert_eq!(series.values(), vec![0.0, 12.0]);
    assert_eq!(series.period_start, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    assert_eq!(series.offset, 2);
    assert_eq!(series.subscribed_power_limit, 9.0);
    data.assert();
}

#[test]
fn yearly_fetch_uses_its_own_resource() {
    let mut server = Server::new();
    let session = logged_in(&mut server);

    let data = server
        .mock("POST", DATA_PATH)
        .match_query(Matcher::UrlEncoded("p_p_resource_id".into(), "urlCdcAn".into()))
        .with_status(200)
        .with_body(graphe_payload())
        .create();

    let series = ConsumptionClient::new(&session).per_year().unwrap();

    assert_eq!(series.granularity, Granularity::Year);
    data.assert();
}

#[test]
fn redirect_is_replayed_exactly_once() {
    let mut server = Server::new();
    let session = logged_in(&mut server);

    let redirect = server
        .mock("POST", DATA_PATH)
        .match_query(Matcher::Any)
        .with_status(302)
        .with_header("location", "/group/espace-particuliers/accueil")
        .expect(1)
        .create();
    let data = server
        .mock("POST", DATA_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(graphe_payload())
        .expect(1)
        .create();

    let series = ConsumptionClient::new(&session).per_month(october()).unwrap();

    assert_eq!(series.values(), vec![0.0, 12.0]);
    redirect.assert();
    data.assert();
}

#[test]
fn terms_of_use_page_requires_new_login() {
    let mut server = Server::new();
    let session = logged_in(&mut server);

    let _mock = server
        .mock("POST", DATA_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html><body><h2>Conditions d'utilisation</h2></body></html>")
        .create();

    let result = ConsumptionClient::new(&session).per_hour(october());

    assert!(matches!(result, Err(LinkyError::Authentication(_))));
}

#[test]
fn portal_error_payload_becomes_service_error() {
    let mut server = Server::new();
    let session = logged_in(&mut server);

    let _mock = server
        .mock("POST", DATA_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({"etat": {"valeur": "erreur", "erreurText": "Erreur&nbsp;serveur"}}).to_string(),
        )
        .create();

    match ConsumptionClient::new(&session).per_day(october()) {
        Err(LinkyError::Service(message)) => assert_eq!(message, "Erreur serveur"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn html_error_page_is_malformed() {
    let mut server = Server::new();
    let session = logged_in(&mut server);

    let _mock = server
        .mock("POST", DATA_PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("<html>Internal error</html>")
        .create();

    let result = ConsumptionClient::new(&session).per_day(october());

    assert!(matches!(result, Err(LinkyError::MalformedResponse(_))));
}
