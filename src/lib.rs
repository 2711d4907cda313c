use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::prelude::*;
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::redirect::Policy;
use tracing::{debug, info, warn};

pub mod api;
mod error;
pub mod render;

pub use error::LinkyError;

const LOGIN_BASE_URL: &str = "https://espace-client-connexion.enedis.fr";
const API_BASE_URL: &str = "https://espace-client-particuliers.enedis.fr/group/espace-particuliers";

const LOGIN_PATH: &str = "/auth/UI/Login";
const HOME_PATH: &str = "/accueil";

/// Cookie carrying the portal session once the login form has been accepted
pub const SESSION_COOKIE: &str = "iPlanetDirectoryPro";

/// The portal expects this exact client identification.
pub const CLIENT_USER_AGENT: &str = "Linkindle/1.0.0";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reads `LINKY_USERNAME` and `LINKY_PASSWORD`.
    pub fn from_env() -> anyhow::Result<Self> {
        let username = std::env::var("LINKY_USERNAME")
            .map_err(|_| anyhow::anyhow!("LINKY_USERNAME must be set"))?;
        let password = std::env::var("LINKY_PASSWORD")
            .map_err(|_| anyhow::anyhow!("LINKY_PASSWORD must be set"))?;

        Ok(Self::new(username, password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Raw answer of the portal: the status is kept because redirects and
/// HTML pages carry meaning of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalResponse {
    pub status: u16,
    pub body: String,
}

impl PortalResponse {
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

pub trait PortalClient {
    /// POSTs `form` to `path` (relative to the API base) with `query` appended.
    /// Redirects are never followed.
    fn http_post(
        &self,
        path: &str,
        query: &[(String, String)],
        form: &[(String, String)],
    ) -> Result<PortalResponse, LinkyError>;
}

#[derive(Debug, Clone)]
pub struct Linky {
    login_base_url: String,
    api_base_url: String,
    timeout: Duration,
}

impl Default for Linky {
    fn default() -> Self {
        Self::new()
    }
}

impl Linky {
    pub fn new() -> Self {
        Linky {
            login_base_url: LOGIN_BASE_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_urls(mut self, login_base_url: String, api_base_url: String) -> Self {
        self.login_base_url = login_base_url.trim_end_matches('/').to_string();
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Submits the login form and keeps every cookie the portal hands out.
    ///
    /// A response without the session cookie is a failed login, whatever the
    /// reason: the portal does not tell a wrong password apart from anything else.
    pub fn login(&self, credentials: &Credentials) -> Result<Session, LinkyError> {
        let jar = Arc::new(Jar::default());
        let http_client = self.http_client(jar.clone())?;

        let goto = format!("{}{}", self.api_base_url, HOME_PATH);
        let form = [
            ("IDToken1", credentials.username.clone()),
            ("IDToken2", credentials.password.clone()),
            ("goto", BASE64_STANDARD.encode(goto)),
            ("gotoOnFail", String::new()),
            ("SunQueryParamsString", BASE64_STANDARD.encode("realm=particuliers")),
            ("encoded", "true".to_string()),
            ("gx_charset", "UTF-8".to_string()),
        ];

        let url = format!("{}{}", self.login_base_url, LOGIN_PATH);
        info!(username = %credentials.username, "logging in");

        let response = http_client.post(&url).form(&form).send()?;
        debug!(status = response.status().as_u16(), "login response");

        let token = response
            .cookies()
            .find(|cookie| cookie.name() == SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string());

        match token {
            Some(token) => {
                info!("logged in successfully");
                Ok(Session {
                    http_client,
                    jar,
                    api_base_url: self.api_base_url.clone(),
                    token,
                })
            }
            None => {
                warn!("login response did not carry the session cookie");
                Err(LinkyError::Authentication(
                    "Login unsuccessful. Check your credentials.".to_string(),
                ))
            }
        }
    }

    fn http_client(&self, jar: Arc<Jar>) -> Result<Client, LinkyError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .cookie_provider(jar)
            .redirect(Policy::none())
            .timeout(self.timeout)
            .build()?;

        Ok(client)
    }
}

/// An authenticated portal session.
///
/// Holds the whole login cookie jar: besides the session token the portal
/// sets affinity cookies that later requests must send back. The session is
/// meant to be used by one caller at a time.
pub struct Session {
    http_client: Client,
    jar: Arc<Jar>,
    api_base_url: String,
    token: String,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// The `Cookie` header value this session sends to `url`, if any.
    pub fn cookie_header(&self, url: &str) -> Option<String> {
        use reqwest::cookie::CookieStore;

        let url = reqwest::Url::parse(url).ok()?;
        let value = self.jar.cookies(&url)?;
        value.to_str().ok().map(str::to_string)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_base_url", &self.api_base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl PortalClient for Session {
    fn http_post(
        &self,
        path: &str,
        query: &[(String, String)],
        form: &[(String, String)],
    ) -> Result<PortalResponse, LinkyError> {
        let url = format!("{}{}", self.api_base_url, path);
        debug!(url = %url, "posting portal request");

        let response = self
            .http_client
            .post(&url)
            .query(query)
            .form(form)
            .send()?;

        let status = response.status().as_u16();
        let body = response.text()?;

        Ok(PortalResponse { status, body })
    }
}
