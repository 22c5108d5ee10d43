// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::cookie::CookieStore;

use super::*;

#[test]
fn seeds_each_cookie_pair() -> anyhow::Result<()> {
    let jar = Jar::default();
    let origin = Url::parse("http://localhost:8000")?;
    let seeded = seed_cookies(&jar, "access_token=abc; refresh_token=def;", &origin);
    assert_eq!(seeded, 2);

    let header = jar.cookies(&origin).ok_or_else(|| anyhow::anyhow!("no cookies"))?;
    let header = header.to_str()?;
    assert!(header.contains("access_token=abc"));
    assert!(header.contains("refresh_token=def"));
    Ok(())
}

#[test]
fn empty_cookie_string_seeds_nothing() -> anyhow::Result<()> {
    let jar = Jar::default();
    let origin = Url::parse("http://localhost:8000")?;
    assert_eq!(seed_cookies(&jar, " ; ", &origin), 0);
    assert!(jar.cookies(&origin).is_none());
    Ok(())
}

#[tokio::test]
async fn client_derives_endpoints_from_config() -> anyhow::Result<()> {
    let config = ClientConfig::with_api_url("https://chat.example.com/");
    let client = ChatClient::new(config)?;
    assert_eq!(client.api().base_url(), "https://chat.example.com");
    assert_eq!(client.transport().url(), "wss://chat.example.com/ws/messages");
    assert!(!client.auth().is_logged_in());
    Ok(())
}

#[tokio::test]
async fn resume_requires_a_logged_in_user() -> anyhow::Result<()> {
    let client = ChatClient::new(ClientConfig::with_api_url("http://127.0.0.1:9"))?;
    assert!(!client.resume());
    assert_eq!(client.transport().state().state, ConnectionState::Disconnected);
    Ok(())
}

#[test]
fn rejects_unparseable_api_url() {
    assert!(ChatClient::new(ClientConfig::with_api_url("not a url")).is_err());
}
