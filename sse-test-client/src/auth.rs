use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

impl UserCredentials {
    /// Parses `username:password`. Only the first `:` separates the two, so
    /// passwords may contain colons.
    pub fn parse(input: &str) -> Result<Self> {
        match input.split_once(':') {
            Some((username, password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Self {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            _ => anyhow::bail!("Invalid credentials format. Expected username:password"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub session_cookie: String,
}

#[derive(Debug, Serialize)]
struct LoginForm<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: LoginData,
}

pub async fn login(
    client: &Client,
    base_url: &str,
    credentials: &UserCredentials,
) -> Result<AuthenticatedUser> {
    let url = format!("{}/login", base_url);

    let response = client
        .post(&url)
        .form(&LoginForm {
            username: &credentials.username,
            password: &credentials.password,
        })
        .send()
        .await
        .context("Failed to send login request")?;

    if !response.status().is_success() {
        anyhow::bail!("Login failed: {}", response.status());
    }

    // Extract session cookie
    let session_cookie = response
        .cookies()
        .find(|cookie| cookie.name() == "id")
        .context("No session cookie in response")?
        .value()
        .to_string();

    let login_response: LoginResponse = response
        .json()
        .await
        .context("Failed to parse login response")?;

    Ok(AuthenticatedUser {
        user_id: login_response.data.id,
        session_cookie,
    })
}
