use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque correlation token handed back to observers when a job finishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Picture,
    Animation,
}

impl AssetCategory {
    /// Directory name used both remotely and under the local asset root.
    pub fn dir(&self) -> &'static str {
        match self {
            AssetCategory::Picture => "pictures",
            AssetCategory::Animation => "animations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        red: 255,
        green: 255,
        blue: 255,
    };

    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.red, self.green, self.blue)
    }
}

/// What a job draws, with the fields each kind needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum JobKind {
    Text {
        content: String,
        speed: u32,
        color: Rgb,
        duration: u32,
    },
    Picture {
        file: String,
        duration: u32,
    },
    Animation {
        file: String,
        duration: u32,
    },
    Sync {
        category: AssetCategory,
        file: String,
    },
    Splash {
        logo: PathBuf,
    },
    Clock,
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Text { .. } => "text",
            JobKind::Picture { .. } => "picture",
            JobKind::Animation { .. } => "animation",
            JobKind::Sync {
                category: AssetCategory::Picture,
                ..
            } => "sync-picture",
            JobKind::Sync {
                category: AssetCategory::Animation,
                ..
            } => "sync-animation",
            JobKind::Splash { .. } => "splash",
            JobKind::Clock => "clock",
        }
    }

    /// Sync jobs only touch the asset store, never the panel.
    pub fn uses_panel(&self) -> bool {
        !matches!(self, JobKind::Sync { .. })
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A unit of scheduled display work. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub origin: Origin,
    #[serde(flatten)]
    pub kind: JobKind,
    pub priority: bool,
    pub repeatable: bool,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        Self {
            origin: Origin::generate(),
            kind,
            priority: false,
            repeatable: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_repeat(mut self, repeatable: bool) -> Self {
        self.repeatable = repeatable;
        self
    }

    pub fn splash(logo: impl Into<PathBuf>) -> Self {
        Self::new(JobKind::Splash { logo: logo.into() })
    }

    pub fn idle_clock() -> Self {
        Self::new(JobKind::Clock)
    }
}
