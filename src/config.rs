/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    /// `None` plays the embedded level.
    pub level_file: Option<PathBuf>,
    pub log_file: PathBuf,
    pub log_filter: String,
}

/// Gameplay constants the simulation reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RulesConfig {
    pub tick_rate_ms: u64,
    pub hearts: u32,
    pub bomb_fuse_ticks: u32,
    pub riddle_points: u32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub action: Vec<String>,
    pub stay: Vec<String>,
    pub camera: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            tick_rate_ms: default_tick_rate(),
            hearts: default_hearts(),
            bomb_fuse_ticks: default_bomb_fuse(),
            riddle_points: default_riddle_points(),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_hearts")]
    hearts: u32,
    #[serde(default = "default_bomb_fuse")]
    bomb_fuse_ticks: u32,
    #[serde(default = "default_riddle_points")]
    riddle_points: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_action")]
    action: Vec<String>,
    #[serde(default = "default_stay")]
    stay: Vec<String>,
    #[serde(default = "default_camera")]
    camera: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    level_file: Option<String>,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_filter")]
    log_filter: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 80 }
fn default_hearts() -> u32 { 3 }
fn default_bomb_fuse() -> u32 { 5 }
fn default_riddle_points() -> u32 { 10 }

fn default_action() -> Vec<String> { vec!["A".into(), "X".into()] }
fn default_stay() -> Vec<String> { vec!["B".into(), "Y".into()] }
fn default_camera() -> Vec<String> { vec!["Select".into()] }
fn default_log_file() -> String { "duskrooms.log".into() }
fn default_log_filter() -> String { "info".into() }

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            tick_rate_ms: default_tick_rate(),
            hearts: default_hearts(),
            bomb_fuse_ticks: default_bomb_fuse(),
            riddle_points: default_riddle_points(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            action: default_action(),
            stay: default_stay(),
            camera: default_camera(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            level_file: None,
            log_file: default_log_file(),
            log_filter: default_log_filter(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, current working directory, data dirs.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text directly (no file search).
    pub fn from_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;
        Ok(Self::from_toml(toml_cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Relative level paths are looked up in the candidate dirs
        let level_file = toml_cfg.general.level_file.map(|name| {
            let p = PathBuf::from(&name);
            if p.is_absolute() {
                p
            } else {
                search_dirs.iter()
                    .map(|d| d.join(&name))
                    .find(|c| c.is_file())
                    .unwrap_or(p)
            }
        });

        GameConfig {
            rules: RulesConfig {
                tick_rate_ms: toml_cfg.rules.tick_rate_ms.max(10),
                hearts: toml_cfg.rules.hearts.max(1),
                bomb_fuse_ticks: toml_cfg.rules.bomb_fuse_ticks.max(1),
                riddle_points: toml_cfg.rules.riddle_points,
            },
            gamepad: GamepadConfig {
                action: toml_cfg.gamepad.action,
                stay: toml_cfg.gamepad.stay,
                camera: toml_cfg.gamepad.camera,
            },
            level_file,
            log_file: PathBuf::from(toml_cfg.general.log_file),
            log_filter: toml_cfg.general.log_filter,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), &[])
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so an installed link still finds data next to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/duskrooms");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share/duskrooms");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(path = %path.display(), "config.toml parse error, using defaults: {e}");
                    return TomlConfig::default();
                }
            },
            Err(e) => warn!(path = %path.display(), "could not read config: {e}"),
        }
    }
    TomlConfig::default()
}
