mod queue;
mod request;
mod response;

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::error::AppError;
use crate::ir::ItemId;

pub use queue::{PendingQueue, SaveReport};
pub use request::{Action, Request};
pub use response::{value_as_i64, Response};

/// Transport for builder requests.
pub trait Backend {
    fn send(&mut self, request: &Request) -> Result<Response, AppError>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn send(&mut self, request: &Request) -> Result<Response, AppError> {
        (**self).send(request)
    }
}

/// Endpoint URL relative to the console page. Metaconsole pages live two
/// directories deeper.
pub fn ajax_url(base: &str, metaconsole: bool) -> String {
    let base = base.trim_end_matches('/');
    if metaconsole {
        format!("{}/../../ajax.php", base)
    } else {
        format!("{}/ajax.php", base)
    }
}

/// Blocking HTTP transport posting form-encoded requests.
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, config: &BackendConfig) -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("vconsole/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: ajax_url(base_url, config.metaconsole),
        })
    }
}

impl Backend for HttpBackend {
    fn send(&mut self, request: &Request) -> Result<Response, AppError> {
        debug!(action = request.action.as_str(), element = ?request.element, url = %self.url, "POST");

        let resp = self
            .client
            .post(&self.url)
            .form(&request.to_form())
            .send()
            .map_err(|e| AppError::Transport(format!("Failed to reach {}: {}", self.url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Transport(format!("{} answered {}", self.url, status)));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::Transport(format!("Failed to read reply: {}", e)))?;
        Response::parse(&body)
    }
}

/// Offline transport: accepts every request and hands out fresh ids, so a
/// console state file can be edited without a server.
#[derive(Debug)]
pub struct LocalBackend {
    next_id: i64,
}

impl LocalBackend {
    pub fn new(next_id: ItemId) -> Self {
        Self { next_id: next_id.0 }
    }
}

impl Backend for LocalBackend {
    fn send(&mut self, request: &Request) -> Result<Response, AppError> {
        debug!(action = request.action.as_str(), element = ?request.element, "offline");

        let resp = match request.action {
            Action::Insert | Action::Copy => {
                let id = self.next_id;
                self.next_id += 1;
                Response::ok().with("id_data", id).with("text", format!("Item {}", id))
            }
            Action::GetFont => Response::ok().with("font", "lato"),
            Action::GetColorLine => {
                warn!("no status source offline, using default line color");
                Response::ok()
            }
            _ => Response::ok(),
        };
        Ok(resp)
    }
}
