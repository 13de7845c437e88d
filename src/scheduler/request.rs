//! Inbound display requests and their normalisation into [`Job`]s.
//!
//! The wire shape mirrors what publishers send: free text in `message` and
//! everything else in `userMetadata`. Normalisation is a pure function; a
//! request that fails it is dropped by the caller.

use serde::Deserialize;

use crate::error::{PanelError, Result};
use crate::scheduler::job::{AssetCategory, Job, JobKind, Origin, Rgb};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRequest {
    /// Correlation token; generated when absent
    pub id: Option<String>,
    /// Text content for text requests
    pub message: Option<String>,
    #[serde(default)]
    pub user_metadata: RequestMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    pub duration: Option<u32>,
    pub speed: Option<u32>,
    pub red: Option<u8>,
    pub green: Option<u8>,
    pub blue: Option<u8>,
    pub picture_file: Option<String>,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub priority: bool,
}

fn missing(kind: &str, field: &str) -> PanelError {
    PanelError::MalformedRequest(format!("{} request is missing `{}`", kind, field))
}

/// Asset names become local paths, so anything that could escape the asset
/// directory is refused.
fn asset_file(kind: &str, file: Option<&String>) -> Result<String> {
    let file = file
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| missing(kind, "pictureFile"))?;
    if file.contains('/') || file.contains('\\') || file.contains("..") {
        return Err(PanelError::MalformedRequest(format!(
            "invalid asset file name `{}`",
            file
        )));
    }
    Ok(file.to_string())
}

fn color(meta: &RequestMetadata) -> Result<Rgb> {
    match (meta.red, meta.green, meta.blue) {
        (None, None, None) => Ok(Rgb::WHITE),
        (Some(r), Some(g), Some(b)) => Ok(Rgb::new(r, g, b)),
        _ => Err(PanelError::MalformedRequest(
            "text color needs all of red, green and blue".to_string(),
        )),
    }
}

impl DisplayRequest {
    /// Validate the request and shape it into a job.
    pub fn normalize(&self) -> Result<Job> {
        let meta = &self.user_metadata;
        let name = meta
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| PanelError::MalformedRequest("request has no `name`".to_string()))?;

        let kind = match name {
            "text" => {
                let content = self
                    .message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .ok_or_else(|| missing(name, "message"))?;
                JobKind::Text {
                    content: content.to_string(),
                    speed: meta.speed.ok_or_else(|| missing(name, "speed"))?,
                    color: color(meta)?,
                    duration: meta.duration.ok_or_else(|| missing(name, "duration"))?,
                }
            }
            "picture" => JobKind::Picture {
                file: asset_file(name, meta.picture_file.as_ref())?,
                duration: meta.duration.ok_or_else(|| missing(name, "duration"))?,
            },
            "animation" => JobKind::Animation {
                file: asset_file(name, meta.picture_file.as_ref())?,
                duration: meta.duration.ok_or_else(|| missing(name, "duration"))?,
            },
            "sync" => {
                let category = match meta.asset_type.as_deref() {
                    Some("picture") => AssetCategory::Picture,
                    Some("animation") => AssetCategory::Animation,
                    Some(other) => {
                        return Err(PanelError::MalformedRequest(format!(
                            "unknown sync type `{}`",
                            other
                        )))
                    }
                    None => return Err(missing(name, "type")),
                };
                JobKind::Sync {
                    category,
                    file: asset_file(name, meta.picture_file.as_ref())?,
                }
            }
            other => {
                return Err(PanelError::MalformedRequest(format!(
                    "unknown request name `{}`",
                    other
                )))
            }
        };

        let origin = match self.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => Origin::new(id),
            None => Origin::generate(),
        };

        Ok(Job::new(kind)
            .with_origin(origin)
            .with_priority(meta.priority)
            .with_repeat(meta.repeat))
    }
}
