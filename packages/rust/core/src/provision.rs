//! Remote project naming and creation.

use std::sync::LazyLock;

use chrono::{DateTime, Local, TimeZone};
use regex::Regex;
use tracing::{info, instrument};
use url::Url;

use sitesync_customgpt::{KnowledgeBase, Reply};
use sitesync_shared::{Project, Result, SiteSyncError};

/// Second-resolution timestamp appended to project names.
pub const PROJECT_TIMESTAMP_FORMAT: &str = "%Y%m%d:%H%M%S";

static LEADING_WWW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^www\.").expect("static regex"));

/// `<domain> - <timestamp>` for the site at `url`, stamped with the current local time.
pub fn generate_project_name(url: &str) -> Result<String> {
    project_name_at(url, Local::now())
}

/// Same as [`generate_project_name`] with an explicit clock reading.
pub fn project_name_at<Tz>(url: &str, now: DateTime<Tz>) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let parsed =
        Url::parse(url).map_err(|e| SiteSyncError::validation(format!("invalid URL '{url}': {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| SiteSyncError::validation(format!("URL has no host: {url}")))?;

    let mut domain = LEADING_WWW.replace(host, "").into_owned();
    if let Some(port) = parsed.port() {
        domain = format!("{domain}:{port}");
    }

    Ok(format!(
        "{domain} - {}",
        now.format(PROJECT_TIMESTAMP_FORMAT)
    ))
}

/// Create the project every later call hangs off. No retry: a rejection aborts the run.
#[instrument(skip_all, fields(name = %name))]
pub async fn create_project(kb: &dyn KnowledgeBase, name: &str) -> Result<Project> {
    match kb.create_project(name).await? {
        Reply::Success(created) => {
            info!(project_id = %created.id, "project created");
            Ok(Project {
                id: created.id,
                name: name.to_string(),
                created_at: created.created_at,
            })
        }
        Reply::Rejected { status } => Err(SiteSyncError::Provision { status }),
    }
}
