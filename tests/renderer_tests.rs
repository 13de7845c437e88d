//! Renderer adapter tests against stand-in matrix tools.
//!
//! Each test writes small shell scripts in place of the matrix binaries and
//! points a [`PanelRenderer`] at them.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use panel_queue::config::{MatrixConfig, PanelGeometry};
use panel_queue::error::RenderError;
use panel_queue::renderer::{AssetFetcher, CommandBuilder, PanelRenderer, RenderOutcome, Renderer};
use panel_queue::scheduler::{AssetCategory, Job, JobKind, Rgb};

const OK_SCRIPT: &str = "#!/bin/sh\nexit 0\n";
const CLOCK_SCRIPT: &str = "#!/bin/sh\nexec sleep 30\n";

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).expect("tool dir");
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("set perms");
}

/// Script that records its arguments one per line, then exits with `code`.
fn recording_script(args_file: &Path, code: i32) -> String {
    format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"{}\"\necho rendered\nexit {}\n",
        args_file.display(),
        code
    )
}

struct Tools {
    dir: TempDir,
}

impl Tools {
    fn new() -> Self {
        let tools = Self {
            dir: TempDir::new().expect("temp dir"),
        };
        let defaults = MatrixConfig::default();
        tools.install(&defaults.image_viewer, OK_SCRIPT);
        tools.install(&defaults.text_scroller, OK_SCRIPT);
        tools.install(&defaults.clock, CLOCK_SCRIPT);
        tools
    }

    fn install(&self, relative: &Path, body: &str) {
        write_script(&self.dir.path().join(relative), body);
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn commands(&self) -> CommandBuilder {
        let matrix = MatrixConfig {
            path: self.dir.path().to_path_buf(),
            sudo: false,
            ..Default::default()
        };
        CommandBuilder::new(matrix, &PanelGeometry::default(), self.path("assets"))
    }

    fn renderer(&self, fetcher: Arc<dyn AssetFetcher>, timeout: Option<Duration>) -> PanelRenderer {
        PanelRenderer::new(self.commands(), fetcher, timeout)
    }
}

#[derive(Default)]
struct FakeFetcher {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(&self, category: AssetCategory, file: &str) -> Result<PathBuf, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(RenderError::AssetFetch(format!("{} not found", file)))
        } else {
            Ok(PathBuf::from(category.dir()).join(file))
        }
    }
}

fn picture(file: &str, duration: u32) -> Arc<Job> {
    Arc::new(Job::new(JobKind::Picture {
        file: file.to_string(),
        duration,
    }))
}

#[tokio::test]
async fn test_picture_completes_on_zero_exit() {
    let tools = Tools::new();
    let args_file = tools.path("args.log");
    tools.install(
        &MatrixConfig::default().image_viewer,
        &recording_script(&args_file, 0),
    );
    let renderer = tools.renderer(Arc::new(FakeFetcher::default()), None);

    let job = picture("cat.png", 5);
    match renderer.render(job.clone()).await {
        RenderOutcome::Completed(done) => assert!(Arc::ptr_eq(&done, &job)),
        RenderOutcome::Failed(e) => panic!("render failed: {}", e),
    }

    let args = fs::read_to_string(&args_file).expect("read args");
    let lines: Vec<&str> = args.lines().collect();
    assert_eq!(lines[0], "-w5");
    assert!(lines[1].ends_with("assets/pictures/cat.png"));
    assert!(lines.contains(&"--led-chain=4"));
}

#[tokio::test]
async fn test_text_is_passed_as_one_argument() {
    let tools = Tools::new();
    let args_file = tools.path("args.log");
    tools.install(
        &MatrixConfig::default().text_scroller,
        &recording_script(&args_file, 0),
    );
    let renderer = tools.renderer(Arc::new(FakeFetcher::default()), None);

    let job = Arc::new(Job::new(JobKind::Text {
        content: "Hello $USER; exit 1".to_string(),
        speed: 3,
        color: Rgb::new(0, 128, 255),
        duration: 2,
    }));
    assert!(renderer.render(job).await.is_completed());

    let args = fs::read_to_string(&args_file).expect("read args");
    assert!(args.lines().any(|l| l == "Hello $USER; exit 1"), "args: {}", args);
    assert!(args.lines().any(|l| l == "0,128,255"), "args: {}", args);
}

#[tokio::test]
async fn test_nonzero_exit_is_failure() {
    let tools = Tools::new();
    tools.install(
        &MatrixConfig::default().image_viewer,
        &recording_script(&tools.path("args.log"), 3),
    );
    let renderer = tools.renderer(Arc::new(FakeFetcher::default()), None);

    match renderer.render(picture("cat.png", 1)).await {
        RenderOutcome::Failed(RenderError::ExitStatus(code)) => assert_eq!(code, Some(3)),
        other => panic!("expected exit status failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_tool_is_spawn_failure() {
    let tools = Tools::new();
    fs::remove_file(tools.dir.path().join(&MatrixConfig::default().image_viewer)).unwrap();
    let renderer = tools.renderer(Arc::new(FakeFetcher::default()), None);

    assert!(matches!(
        renderer.render(picture("cat.png", 1)).await,
        RenderOutcome::Failed(RenderError::Spawn(_))
    ));
}

#[tokio::test]
async fn test_render_timeout_kills_process() {
    let tools = Tools::new();
    tools.install(
        &MatrixConfig::default().image_viewer,
        "#!/bin/sh\nexec sleep 30\n",
    );
    let renderer = tools.renderer(
        Arc::new(FakeFetcher::default()),
        Some(Duration::from_millis(200)),
    );

    let started = tokio::time::Instant::now();
    let outcome = renderer.render(picture("cat.png", 1)).await;
    assert!(matches!(
        outcome,
        RenderOutcome::Failed(RenderError::TimedOut(_))
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_render_timeout_signals_term_before_returning() {
    let tools = Tools::new();
    let marker = tools.path("terminated");
    tools.install(
        &MatrixConfig::default().image_viewer,
        &format!(
            "#!/bin/sh\ntrap 'echo term > \"{}\"; kill $pid; exit 0' TERM\nsleep 30 &\npid=$!\nwait $pid\n",
            marker.display()
        ),
    );
    let renderer = tools.renderer(
        Arc::new(FakeFetcher::default()),
        Some(Duration::from_millis(300)),
    );

    let outcome = renderer.render(picture("cat.png", 1)).await;
    assert!(matches!(
        outcome,
        RenderOutcome::Failed(RenderError::TimedOut(_))
    ));
    // Written by the TERM handler, so the tool was asked to stop and had exited
    assert_eq!(fs::read_to_string(&marker).expect("TERM handler ran"), "term\n");
}

#[tokio::test]
async fn test_panel_render_stops_idle_clock() {
    let tools = Tools::new();
    let renderer = tools.renderer(Arc::new(FakeFetcher::default()), None);

    renderer.show_idle().await.expect("clock starts");
    assert!(renderer.idle_running().await);

    assert!(renderer.render(picture("cat.png", 1)).await.is_completed());
    assert!(!renderer.idle_running().await);
}

#[tokio::test]
async fn test_show_idle_replaces_previous_clock() {
    let tools = Tools::new();
    let renderer = tools.renderer(Arc::new(FakeFetcher::default()), None);

    renderer.show_idle().await.unwrap();
    renderer.show_idle().await.unwrap();
    assert!(renderer.idle_running().await);

    renderer.stop_idle().await;
    assert!(!renderer.idle_running().await);
}

#[tokio::test]
async fn test_sync_uses_fetcher_and_keeps_clock() {
    let tools = Tools::new();
    let fetcher = Arc::new(FakeFetcher::default());
    let renderer = tools.renderer(fetcher.clone(), None);
    renderer.show_idle().await.unwrap();

    let job = Arc::new(Job::new(JobKind::Sync {
        category: AssetCategory::Animation,
        file: "fire.gif".to_string(),
    }));
    assert!(renderer.render(job).await.is_completed());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(renderer.idle_running().await, "sync must not stop the clock");

    renderer.stop_idle().await;
}

#[tokio::test]
async fn test_sync_fetch_failure() {
    let tools = Tools::new();
    let fetcher = Arc::new(FakeFetcher {
        fail: true,
        ..Default::default()
    });
    let renderer = tools.renderer(fetcher, None);

    let job = Arc::new(Job::new(JobKind::Sync {
        category: AssetCategory::Picture,
        file: "missing.png".to_string(),
    }));
    assert!(matches!(
        renderer.render(job).await,
        RenderOutcome::Failed(RenderError::AssetFetch(_))
    ));
}
