//! Integration tests for sign-in
//!
//! Cookie login, form login and cookie verification against a mock site.

use douban_backup::auth::{
    load_cookie_file, load_user_info, save_cookie_file, save_user_info, verify_cookies,
    AuthError, CookieMap, SessionProvider, UserInfo,
};
use douban_backup::config::{Config, CrawlerConfig, OutputConfig, SiteConfig};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROFILE_PAGE: &str = r#"<html><body>
    <div id="db-usr-profile"><div class="info"><h1>Alice</h1></div></div>
</body></html>"#;

fn config_for(server: &MockServer, data_dir: &TempDir) -> Config {
    Config {
        site: SiteConfig {
            www_url: server.uri(),
            movie_url: server.uri(),
            book_url: server.uri(),
            music_url: server.uri(),
            ..SiteConfig::default()
        },
        crawler: CrawlerConfig {
            request_timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        output: OutputConfig {
            data_dir: data_dir.path().display().to_string(),
        },
        ..Config::default()
    }
}

fn redirect(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("location", location)
}

/// `/mine/` redirects to Alice's profile, which renders her name
async fn mount_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/mine/"))
        .respond_with(redirect("/people/alice/"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/alice/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PROFILE_PAGE))
        .mount(server)
        .await;
}

fn saved_cookies() -> CookieMap {
    let mut cookies = CookieMap::new();
    cookies.insert("bid".to_string(), "abc".to_string());
    cookies.insert("dbcl2".to_string(), "1234:xyz".to_string());
    cookies
}

#[tokio::test]
async fn test_cookie_login() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    let config = config_for(&server, &data_dir);

    save_cookie_file(&config.output.cookies_path(), &saved_cookies()).unwrap();

    Mock::given(method("GET"))
        .and(path("/people/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;
    mount_profile(&server).await;

    let provider = SessionProvider::new(&config).unwrap();
    let user = provider
        .login_with_cookies()
        .await
        .unwrap()
        .expect("cookies should sign in");

    assert_eq!(user.id, "alice");
    assert_eq!(user.name.as_deref(), Some("Alice"));
    assert_eq!(
        load_user_info(&config.output.user_info_path()).unwrap(),
        Some(user)
    );
}

#[tokio::test]
async fn test_expired_cookies() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    let config = config_for(&server, &data_dir);

    save_cookie_file(&config.output.cookies_path(), &saved_cookies()).unwrap();

    Mock::given(method("GET"))
        .and(path("/people/"))
        .respond_with(redirect("/accounts/login?source=main"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/accounts/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .mount(&server)
        .await;

    let provider = SessionProvider::new(&config).unwrap();
    assert_eq!(provider.login_with_cookies().await.unwrap(), None);
}

#[tokio::test]
async fn test_no_cookie_file() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    let config = config_for(&server, &data_dir);

    let provider = SessionProvider::new(&config).unwrap();
    assert_eq!(provider.login_with_cookies().await.unwrap(), None);
}

#[tokio::test]
async fn test_form_login() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    let config = config_for(&server, &data_dir);

    Mock::given(method("GET"))
        .and(path("/people/"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "bid=primed; Path=/"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/misc/id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "cap-1" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/accounts/login"))
        .and(body_string_contains("form_email=alice%40example.com"))
        .and(body_string_contains("remember=on"))
        .and(body_string_contains("captcha_id=cap-1"))
        .respond_with(
            redirect("/people/alice/").insert_header("set-cookie", "dbcl2=1234abc; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_profile(&server).await;

    let provider = SessionProvider::new(&config).unwrap();
    let user = provider
        .login("alice@example.com", "secret")
        .await
        .expect("login should succeed");
    assert_eq!(user.id, "alice");

    let cookies = load_cookie_file(&config.output.cookies_path())
        .unwrap()
        .expect("cookies should be saved");
    assert_eq!(cookies.get("dbcl2").map(String::as_str), Some("1234abc"));
    assert_eq!(cookies.get("bid").map(String::as_str), Some("primed"));
    assert!(config.output.user_info_path().exists());
}

#[tokio::test]
async fn test_form_login_rejected() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    let config = config_for(&server, &data_dir);

    Mock::given(method("GET"))
        .and(path("/people/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // Captcha id lookup failing is not fatal
    Mock::given(method("GET"))
        .and(path("/misc/id"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/accounts/login"))
        .respond_with(redirect("/accounts/login?error=1011"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/accounts/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .mount(&server)
        .await;

    let provider = SessionProvider::new(&config).unwrap();
    let result = provider.login("alice@example.com", "wrong").await;
    assert!(matches!(result, Err(AuthError::LoginRejected { .. })));
    assert!(!config.output.cookies_path().exists());
}

#[tokio::test]
async fn test_user_info_falls_back_to_saved_file() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    let config = config_for(&server, &data_dir);

    Mock::given(method("GET"))
        .and(path("/mine/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let provider = SessionProvider::new(&config).unwrap();
    assert!(matches!(
        provider.refresh_user_info().await,
        Err(AuthError::NoUserId)
    ));

    let saved = UserInfo {
        id: "12345".to_string(),
        name: Some("Bob".to_string()),
    };
    save_user_info(&config.output.user_info_path(), &saved).unwrap();
    assert_eq!(provider.refresh_user_info().await.unwrap(), saved);
}

#[tokio::test]
async fn test_verify_cookies() {
    let cases = [
        (redirect("/people/alice/"), true),
        (ResponseTemplate::new(200), true),
        (redirect("https://accounts.douban.com/accounts/login?redir=mine"), false),
        (ResponseTemplate::new(403), false),
    ];

    for (response, expected) in cases {
        let server = MockServer::start().await;
        let data_dir = TempDir::new().unwrap();
        let config = config_for(&server, &data_dir);

        Mock::given(method("GET"))
            .and(path("/mine/"))
            .respond_with(response)
            .expect(1)
            .mount(&server)
            .await;

        let valid = verify_cookies(&config.site, &config.crawler, &saved_cookies()).await;
        assert_eq!(valid, expected);
    }
}
