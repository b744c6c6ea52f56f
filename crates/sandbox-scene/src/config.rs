//! Scene description, loadable from TOML.
//!
//! ```toml
//! [surface]
//! background = "#000000"   # or "transparent"
//! antialias = true
//!
//! [assets]
//! base_dir = "assets"
//! identifiers = ["racetrack.webp", "horse_white.gif", "horse_black.gif",
//!                "horse_brown.gif", "horse_gray.gif"]
//!
//! [layout]
//! minimum = 3              # omit to require every asset
//!
//! [[buttons]]
//! label = "Spin"
//! x = 60
//! y = 60
//!
//! [text]
//! font = "fonts/DejaVuSans.ttf"   # omit to use a system font
//! ```

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use sandbox_engine::coords::Vec2;
use sandbox_engine::device::{BackgroundMode, SurfaceConfig};
use sandbox_engine::logging::LoggingConfig;
use sandbox_engine::paint::{Color, ParseColorError};
use sandbox_engine::text::load_system_font;

use crate::assets::ResourceId;
use crate::builder::{ButtonSpec, LayoutSpec, SceneBuilder};
use crate::lifecycle::MountSpec;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub surface: SurfaceSettings,
    pub assets: AssetSettings,
    pub layout: LayoutSpec,
    pub buttons: Vec<ButtonSettings>,
    pub text: TextSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    pub background: Background,
    pub antialias: bool,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            background: Background(BackgroundMode::Opaque(Color::from_rgb_hex(0x000000))),
            antialias: true,
        }
    }
}

/// `"transparent"` or a `#rrggbb` / `#rrggbbaa` color.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Background(pub BackgroundMode);

impl TryFrom<String> for Background {
    type Error = ParseColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.eq_ignore_ascii_case("transparent") {
            return Ok(Background(BackgroundMode::Transparent));
        }
        s.parse().map(|c| Background(BackgroundMode::Opaque(c)))
    }
}

/// A `#rrggbb` / `#rrggbbaa` color.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct ColorSetting(pub Color);

impl TryFrom<String> for ColorSetting {
    type Error = ParseColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse().map(ColorSetting)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Identifiers resolve relative to this directory.
    pub base_dir: PathBuf,
    /// Background first, then one per sprite slot.
    pub identifiers: Vec<ResourceId>,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("assets"),
            identifiers: [
                "racetrack.webp",
                "horse_white.gif",
                "horse_black.gif",
                "horse_brown.gif",
                "horse_gray.gif",
            ]
            .into_iter()
            .map(ResourceId::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ButtonSettings {
    pub label: String,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_button_width")]
    pub width: f32,
    #[serde(default = "default_button_height")]
    pub height: f32,
    #[serde(default)]
    pub fill: Option<ColorSetting>,
}

fn default_button_width() -> f32 {
    ButtonSpec::DEFAULT_SIZE.x
}

fn default_button_height() -> f32 {
    ButtonSpec::DEFAULT_SIZE.y
}

impl ButtonSettings {
    fn at(label: &str, x: f32, y: f32) -> Self {
        Self {
            label: label.to_owned(),
            x,
            y,
            width: default_button_width(),
            height: default_button_height(),
            fill: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// TrueType/OpenType file for button labels.
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `env_logger` filter; `RUST_LOG` applies when unset.
    pub filter: Option<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::horse_race()
    }
}

impl SceneConfig {
    /// Race track plus four horses, with "Spin" and "Autoplay" controls.
    pub fn horse_race() -> Self {
        Self {
            surface: SurfaceSettings::default(),
            assets: AssetSettings::default(),
            layout: LayoutSpec::default(),
            buttons: vec![ButtonSettings::at("Spin", 60.0, 60.0), ButtonSettings::at("Autoplay", 60.0, 120.0)],
            text: TextSettings::default(),
            logging: LoggingSettings::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SceneConfig = toml::from_str(text).context("invalid scene config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file. Relative `assets.base_dir` and `text.font`
    /// paths resolve against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scene config {}", path.display()))?;
        let mut config =
            Self::from_toml_str(&text).with_context(|| format!("loading {}", path.display()))?;
        if let Some(dir) = path.parent() {
            if config.assets.base_dir.is_relative() {
                config.assets.base_dir = dir.join(&config.assets.base_dir);
            }
            if let Some(font) = config.text.font.as_mut().filter(|f| f.is_relative()) {
                *font = dir.join(&*font);
            }
        }
        Ok(config)
    }

    /// Label font bytes: the configured file, else the first system font
    /// found. `Ok(None)` when neither exists.
    pub fn font_bytes(&self) -> Result<Option<Vec<u8>>> {
        match &self.text.font {
            Some(path) => std::fs::read(path)
                .map(Some)
                .with_context(|| format!("reading font {}", path.display())),
            None => Ok(load_system_font()),
        }
    }

    /// Rejects configurations that could never build a scene.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.assets.identifiers.is_empty(), "assets.identifiers is empty");
        ensure!(
            self.assets.identifiers.len() >= self.layout.required_assets(),
            "layout requires {} assets but only {} identifiers are listed",
            self.layout.required_assets(),
            self.assets.identifiers.len(),
        );
        ensure!(
            self.layout.sprite_scale.is_finite() && self.layout.sprite_scale > 0.0,
            "layout.sprite_scale must be positive, got {}",
            self.layout.sprite_scale,
        );
        ensure!(
            self.layout.anchor_offset.is_finite() && self.layout.spacing.is_finite(),
            "layout offsets must be finite",
        );
        for b in &self.buttons {
            ensure!(b.width > 0.0 && b.height > 0.0, "button `{}` has an empty size", b.label);
        }
        Ok(())
    }

    pub fn surface_config(&self) -> SurfaceConfig {
        SurfaceConfig {
            background: self.surface.background.0,
            antialias: self.surface.antialias,
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            env_filter: self.logging.filter.clone(),
            ..LoggingConfig::default()
        }
    }

    /// Button descriptors whose handlers call `on_activate` with the label.
    pub fn button_specs(&self, on_activate: impl Fn(&str) + 'static) -> Vec<ButtonSpec> {
        let on_activate: Rc<dyn Fn(&str)> = Rc::new(on_activate);
        self.buttons
            .iter()
            .map(|b| {
                let handler = on_activate.clone();
                let label = b.label.clone();
                let mut spec = ButtonSpec::new(b.label.clone(), Vec2::new(b.x, b.y), move || handler(&label))
                    .with_size(Vec2::new(b.width, b.height));
                if let Some(fill) = b.fill {
                    spec = spec.with_fill(fill.0);
                }
                spec
            })
            .collect()
    }

    /// Everything a [`LifecycleController`](crate::lifecycle::LifecycleController)
    /// needs to mount this scene.
    pub fn mount_spec(&self, on_activate: impl Fn(&str) + 'static) -> MountSpec {
        MountSpec {
            identifiers: self.assets.identifiers.clone(),
            surface: self.surface_config(),
            builder: SceneBuilder::new(self.layout.clone()).with_buttons(self.button_specs(on_activate)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn empty_document_is_the_horse_race() {
        let config = SceneConfig::from_toml_str("").expect("defaults");
        assert_eq!(config, SceneConfig::horse_race());
        assert_eq!(config.assets.identifiers.len(), 5);
        assert_eq!(config.layout.required_assets(), 5);
    }

    #[test]
    fn parses_a_full_document() {
        let text = r##"
            [surface]
            background = "transparent"
            antialias = false

            [assets]
            base_dir = "/srv/art"
            identifiers = ["bg.png", "a.png", "b.png"]

            [layout]
            foreground_count = 2
            minimum = 2
            spacing = 25.0

            [[buttons]]
            label = "Go"
            x = 10
            y = 20
            fill = "#ff0000"

            [text]
            font = "/usr/share/fonts/custom.ttf"

            [logging]
            filter = "sandbox_scene=debug"
        "##;
        let config = SceneConfig::from_toml_str(text).expect("parses");

        assert_eq!(config.surface_config().background, BackgroundMode::Transparent);
        assert!(!config.surface.antialias);
        assert_eq!(config.assets.base_dir, PathBuf::from("/srv/art"));
        assert_eq!(config.layout.required_assets(), 2);
        assert_eq!(config.layout.spacing, 25.0);
        assert_eq!(config.layout.sprite_scale, 0.6);
        assert_eq!(config.buttons.len(), 1);
        assert_eq!(config.buttons[0].width, 120.0);
        assert_eq!(config.buttons[0].fill, Some(ColorSetting(Color::from_rgb_hex(0xff0000))));
        assert_eq!(config.logging_config().env_filter.as_deref(), Some("sandbox_scene=debug"));
        assert_eq!(config.text.font, Some(PathBuf::from("/usr/share/fonts/custom.ttf")));
    }

    #[test]
    fn load_resolves_relative_paths_against_the_file() {
        let dir = std::env::temp_dir().join(format!("sandbox-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("scene.toml");
        std::fs::write(&path, "[assets]\nbase_dir = \"art\"\n\n[text]\nfont = \"fonts/label.ttf\"\n")
            .expect("write config");

        let config = SceneConfig::load(&path).expect("loads");
        assert_eq!(config.assets.base_dir, dir.join("art"));
        assert_eq!(config.text.font, Some(dir.join("fonts/label.ttf")));

        let err = config.font_bytes().expect_err("font file is missing");
        assert!(format!("{err:#}").contains("label.ttf"), "{err:#}");
    }

    #[test]
    fn rejects_bad_colors() {
        let err = SceneConfig::from_toml_str("[surface]\nbackground = \"red\"\n").expect_err("bad color");
        assert!(format!("{err:#}").contains("red"), "{err:#}");
    }

    #[test]
    fn rejects_minimum_beyond_identifiers() {
        let text = "[assets]\nidentifiers = [\"bg.png\", \"a.png\"]\n";
        let err = SceneConfig::from_toml_str(text).expect_err("too few identifiers");
        assert!(err.to_string().contains("requires 5 assets"), "{err}");
    }

    #[test]
    fn button_specs_report_their_label() {
        let clicked = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = clicked.clone();
        let specs = SceneConfig::horse_race().button_specs(move |label| sink.borrow_mut().push(label.to_owned()));

        for spec in &specs {
            (spec.on_activate)();
        }
        assert_eq!(*clicked.borrow(), ["Spin", "Autoplay"]);
    }
}
