use std::path::{Path, PathBuf};

use crate::config::{MatrixConfig, PanelGeometry};
use crate::scheduler::job::{AssetCategory, JobKind};

/// Seconds each frame of the splash logo stays up.
const SPLASH_WAIT_SECS: u32 = 2;
const TEXT_BASELINE: u32 = 22;
const CLOCK_BASELINE: u32 = 25;
const CLOCK_FORMAT: &str = "%H:%M:%S";

/// A fully specified renderer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl RenderCommand {
    /// Program and arguments joined for logging.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Translates jobs into renderer invocations.
///
/// The `--led-*` flags are computed once from the panel geometry and appended
/// unchanged to every command.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    matrix: MatrixConfig,
    led_flags: Vec<String>,
    assets_dir: PathBuf,
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl CommandBuilder {
    pub fn new(matrix: MatrixConfig, geometry: &PanelGeometry, assets_dir: PathBuf) -> Self {
        Self {
            matrix,
            led_flags: geometry.led_flags(),
            assets_dir,
        }
    }

    pub fn uses_sudo(&self) -> bool {
        self.matrix.sudo
    }

    pub fn asset_path(&self, category: AssetCategory, file: &str) -> PathBuf {
        self.assets_dir.join(category.dir()).join(file)
    }

    fn invoke(&self, tool: &Path, mut args: Vec<String>) -> RenderCommand {
        args.extend(self.led_flags.iter().cloned());
        let tool = self.matrix.resolve(tool);
        if self.matrix.sudo {
            let mut sudo_args = vec![path_arg(&tool)];
            sudo_args.extend(args);
            RenderCommand {
                program: PathBuf::from("sudo"),
                args: sudo_args,
            }
        } else {
            RenderCommand {
                program: tool,
                args,
            }
        }
    }

    /// Build the invocation for a panel job. Sync jobs never reach the panel and yield `None`.
    pub fn build(&self, kind: &JobKind) -> Option<RenderCommand> {
        let command = match kind {
            JobKind::Text {
                content,
                speed,
                color,
                duration,
            } => self.invoke(
                &self.matrix.text_scroller,
                vec![
                    "-f".to_string(),
                    path_arg(&self.matrix.resolve(&self.matrix.text_font)),
                    "-s".to_string(),
                    speed.to_string(),
                    "-l".to_string(),
                    duration.to_string(),
                    "-y".to_string(),
                    TEXT_BASELINE.to_string(),
                    "-C".to_string(),
                    color.to_string(),
                    content.clone(),
                ],
            ),
            JobKind::Picture { file, duration } => {
                let path = path_arg(&self.asset_path(AssetCategory::Picture, file));
                self.invoke(
                    &self.matrix.image_viewer,
                    vec![
                        format!("-w{}", duration),
                        path.clone(),
                        format!("-w{}", duration),
                        path,
                        "-C".to_string(),
                    ],
                )
            }
            JobKind::Animation { file, duration } => self.invoke(
                &self.matrix.image_viewer,
                vec![
                    format!("-t{}", duration),
                    path_arg(&self.asset_path(AssetCategory::Animation, file)),
                    "-C".to_string(),
                ],
            ),
            JobKind::Splash { logo } => {
                let logo = path_arg(logo);
                self.invoke(
                    &self.matrix.image_viewer,
                    vec![
                        format!("-w{}", SPLASH_WAIT_SECS),
                        logo.clone(),
                        format!("-w{}", SPLASH_WAIT_SECS),
                        logo,
                        "-C".to_string(),
                    ],
                )
            }
            JobKind::Clock => self.invoke(
                &self.matrix.clock,
                vec![
                    "-f".to_string(),
                    path_arg(&self.matrix.resolve(&self.matrix.clock_font)),
                    "-d".to_string(),
                    CLOCK_FORMAT.to_string(),
                    "-y".to_string(),
                    CLOCK_BASELINE.to_string(),
                    "-C".to_string(),
                    "255,255,255".to_string(),
                ],
            ),
            JobKind::Sync { .. } => return None,
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::Rgb;

    fn builder(sudo: bool) -> CommandBuilder {
        let matrix = MatrixConfig {
            path: PathBuf::from("/opt/matrix"),
            sudo,
            ..Default::default()
        };
        CommandBuilder::new(matrix, &PanelGeometry::default(), PathBuf::from("assets"))
    }

    #[test]
    fn picture_without_sudo() {
        let cmd = builder(false)
            .build(&JobKind::Picture {
                file: "cat.png".to_string(),
                duration: 5,
            })
            .unwrap();
        assert_eq!(cmd.program, PathBuf::from("/opt/matrix/utils/led-image-viewer"));
        assert_eq!(
            &cmd.args[..5],
            &["-w5", "assets/pictures/cat.png", "-w5", "assets/pictures/cat.png", "-C"]
        );
        assert_eq!(cmd.args.last().unwrap(), "--led-brightness=84");
    }

    #[test]
    fn sudo_prefixes_tool() {
        let cmd = builder(true)
            .build(&JobKind::Animation {
                file: "fire.gif".to_string(),
                duration: 9,
            })
            .unwrap();
        assert_eq!(cmd.program, PathBuf::from("sudo"));
        assert_eq!(cmd.args[0], "/opt/matrix/utils/led-image-viewer");
        assert_eq!(cmd.args[1], "-t9");
        assert_eq!(cmd.args[2], "assets/animations/fire.gif");
    }

    #[test]
    fn text_keeps_content_as_single_argument() {
        let cmd = builder(false)
            .build(&JobKind::Text {
                content: "hello there; rm -rf /".to_string(),
                speed: 4,
                color: Rgb::new(10, 20, 30),
                duration: 2,
            })
            .unwrap();
        assert_eq!(cmd.program, PathBuf::from("/opt/matrix/utils/text-scroller"));
        assert!(cmd.args.contains(&"hello there; rm -rf /".to_string()));
        let color_at = cmd.args.iter().position(|a| a == "-C").unwrap();
        assert_eq!(cmd.args[color_at + 1], "10,20,30");
        assert_eq!(cmd.args[1], "/opt/matrix/fonts/10x20.bdf");
    }

    #[test]
    fn clock_and_splash() {
        let b = builder(false);
        let clock = b.build(&JobKind::Clock).unwrap();
        assert_eq!(clock.program, PathBuf::from("/opt/matrix/examples-api-use/clock"));
        assert!(clock.args.contains(&"%H:%M:%S".to_string()));

        let splash = b
            .build(&JobKind::Splash {
                logo: PathBuf::from("logo.png"),
            })
            .unwrap();
        assert_eq!(&splash.args[..4], &["-w2", "logo.png", "-w2", "logo.png"]);
    }

    #[test]
    fn sync_has_no_command() {
        assert!(builder(false)
            .build(&JobKind::Sync {
                category: AssetCategory::Picture,
                file: "cat.png".to_string(),
            })
            .is_none());
    }

    #[test]
    fn display_joins_arguments() {
        let cmd = RenderCommand {
            program: PathBuf::from("viewer"),
            args: vec!["-w1".to_string(), "a.png".to_string()],
        };
        assert_eq!(cmd.display(), "viewer -w1 a.png");
    }
}
