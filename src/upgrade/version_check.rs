use quick_xml::Reader;
use quick_xml::events::Event;
use quick_xml::name::QName;
use tracing::{debug, info};

use crate::cli::SHA256_HEX_LEN;
use crate::constants::{TOOL_VERSION, USER_AGENT_TAG, VERSION_CHECK_TIMEOUT};
use crate::core::UpdaterError;
use crate::transport::{HttpRequest, Transport};

/// Answer of the version endpoint.
///
/// The endpoint replies with a small XML document:
///
/// ```xml
/// <GUP>
///   <NeedToBeUpdated>yes</NeedToBeUpdated>
///   <Version>8.6.3</Version>
///   <Location>https://example.org/npp.8.6.3.Installer.exe</Location>
///   <Hash>0f1e...64 hex characters...</Hash>
/// </GUP>
/// ```
///
/// `Version` and `Hash` are optional; `Location` is required when an update
/// is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDecision {
    pub needs_update: bool,
    /// Announced version, possibly empty.
    pub version: String,
    /// Installer URL; non-empty whenever `needs_update` is true.
    pub download_location: String,
    /// SHA-256 of the installer, when the endpoint publishes one.
    pub expected_hash: Option<String>,
}

/// Client identifier sent with every request.
///
/// `Upkeep/<tool version>`, or `<software>/<version> (Upkeep/<tool version>)`
/// when the host application's name is configured.
#[must_use]
pub fn user_agent(software_name: Option<&str>, version: &str) -> String {
    let tool = format!("{USER_AGENT_TAG}/{TOOL_VERSION}");
    match software_name.filter(|name| !name.is_empty()) {
        Some(name) => format!("{name}/{version} ({tool})"),
        None => tool,
    }
}

/// Queries the version endpoint.
pub struct VersionChecker<'a, T: Transport> {
    transport: &'a T,
    user_agent: String,
}

impl<'a, T: Transport> VersionChecker<'a, T> {
    #[must_use]
    pub fn new(transport: &'a T, user_agent: impl Into<String>) -> Self {
        Self {
            transport,
            user_agent: user_agent.into(),
        }
    }

    /// `GET <info_url>?version=<version>[&param=<param>]` and parse the answer.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::NetworkError`] when the request fails
    /// - [`UpdaterError::MalformedResponse`] when the body is not an update decision
    /// - [`UpdaterError::InvalidFlagValue`] when an update is announced without a location
    pub async fn check(
        &self,
        info_url: &str,
        version: &str,
        param: Option<&str>,
    ) -> Result<UpdateDecision, UpdaterError> {
        let mut request = HttpRequest::get(info_url)
            .query("version", version)
            .user_agent(self.user_agent.clone())
            .timeout(VERSION_CHECK_TIMEOUT);
        if let Some(param) = param.filter(|p| !p.is_empty()) {
            request = request.query("param", param);
        }

        info!("Checking for updates at {} (version {})", info_url, version);
        let body = self.transport.get_text(&request).await.map_err(|e| {
            UpdaterError::NetworkError {
                detail: e.to_string(),
            }
        })?;
        debug!("Version endpoint answered: {}", body);

        parse_update_decision(&body)
    }
}

fn malformed(reason: impl Into<String>) -> UpdaterError {
    UpdaterError::MalformedResponse {
        reason: reason.into(),
    }
}

/// Parse the `<GUP>` document returned by the version endpoint.
pub fn parse_update_decision(xml: &str) -> Result<UpdateDecision, UpdaterError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_root = false;
    let mut need_to_update: Option<String> = None;
    let mut version = String::new();
    let mut location = String::new();
    let mut hash: Option<String> = None;

    loop {
        match reader.read_event().map_err(|e| malformed(e.to_string()))? {
            Event::Start(e) if !in_root => {
                if e.name().as_ref() != b"GUP" {
                    return Err(malformed("root element is not <GUP>"));
                }
                in_root = true;
            }
            Event::Empty(e) if !in_root => {
                if e.name().as_ref() != b"GUP" {
                    return Err(malformed("root element is not <GUP>"));
                }
                break;
            }
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                let raw = reader
                    .read_text(QName(&name))
                    .map_err(|e| malformed(e.to_string()))?;
                let text = quick_xml::escape::unescape(&raw)
                    .map_err(|e| malformed(e.to_string()))?
                    .trim()
                    .to_string();
                match name.as_slice() {
                    b"NeedToBeUpdated" => need_to_update = Some(text),
                    b"Version" => version = text,
                    b"Location" => location = text,
                    b"Hash" => hash = Some(text).filter(|h| !h.is_empty()),
                    _ => debug!("Ignoring element <{}>", String::from_utf8_lossy(&name)),
                }
            }
            Event::Empty(e) => {
                if e.name().as_ref() == b"NeedToBeUpdated" {
                    need_to_update = Some(String::new());
                }
            }
            Event::End(_) => break,
            Event::Eof => {
                if !in_root {
                    return Err(malformed("empty response"));
                }
                break;
            }
            _ => {}
        }
    }

    let needs_update = match need_to_update.as_deref() {
        Some(value) if value.eq_ignore_ascii_case("yes") => true,
        Some(value) if value.eq_ignore_ascii_case("no") => false,
        Some(value) => return Err(malformed(format!("NeedToBeUpdated must be yes or no, got '{value}'"))),
        None => return Err(malformed("missing <NeedToBeUpdated>")),
    };

    if needs_update && location.is_empty() {
        return Err(UpdaterError::InvalidFlagValue {
            field: "Location".to_string(),
            value: String::new(),
        });
    }

    if let Some(digest) = &hash
        && (digest.len() != SHA256_HEX_LEN || !digest.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(malformed(format!("<Hash> is not a SHA-256 digest: {digest}")));
    }

    Ok(UpdateDecision {
        needs_update,
        version,
        download_location: location,
        expected_hash: hash,
    })
}
