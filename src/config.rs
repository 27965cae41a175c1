use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum WavePattern {
    /// Rows start in depth order; every column of a row moves together.
    Straight,
    /// Edge columns start later, so the motion closes in on the center.
    OutsideIn,
    /// Center columns start later, so the motion spreads to the edges.
    InsideOut,
}

/// Full description of one wave field. Immutable once a field is built;
/// changing anything means rebuilding the field wholesale.
///
/// An absent key in the settings file takes the default below; an explicit
/// `0` or `false` is honored as written.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct WaveConfig {
    /// Grid columns on each side of the centerline. 0 is a legal
    /// degenerate grid (centerline only).
    pub(crate) x_dots: u32,
    /// Grid rows between the near baseline and the horizon. 0 is legal;
    /// the compression curve is always computed from at least one row.
    pub(crate) y_dots: u32,
    /// Subpixel distance between adjacent columns at full depth.
    pub(crate) spacing: f32,
    /// Rows/columns skipped between drawn ones (stride = hollow_dots + 1).
    pub(crate) hollow_dots: u32,
    /// Horizontal center of the grid as a fraction of surface width.
    pub(crate) center_position: f32,
    /// Peak vertical displacement for the nearest row, in subpixels.
    pub(crate) wave_max_height: f32,
    /// Tilt applied to column fan-out; 0 keeps the vanishing point level.
    pub(crate) horizon_angle: f32,
    pub(crate) color: Rgb,
    /// Radius multiplier applied to the depth-scaled dot size.
    pub(crate) dot_size: f32,
    /// Stagger unit in hold ticks; 0 starts every dot in lockstep.
    pub(crate) wave_delay: u32,
    pub(crate) wave_pattern: WavePattern,
    /// Keep requesting frames after each pass; false draws a single pass.
    pub(crate) repeat: bool,
    /// Start every dot at the deep end of its curve, moving back up.
    pub(crate) backwards: bool,
    /// Frames per half oscillation (top-to-bottom or back). Minimum 1.
    pub(crate) frame_qtd: usize,
    /// Frame-rate cap in frames per second. Minimum 1.
    pub(crate) frame_cap: u32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            x_dots: 10,
            y_dots: 30,
            spacing: 60.0,
            hollow_dots: 2,
            center_position: 0.5,
            wave_max_height: 100.0,
            horizon_angle: 0.0,
            color: Rgb {
                r: 230,
                g: 230,
                b: 230,
            },
            dot_size: 0.3,
            wave_delay: 0,
            wave_pattern: WavePattern::Straight,
            repeat: true,
            backwards: false,
            frame_qtd: 100,
            frame_cap: 30,
        }
    }
}

impl WaveConfig {
    /// Defaults scaled to a concrete braille canvas, used when no settings
    /// file exists. Grid counts and spacing fill the surface instead of
    /// assuming the fixed web-scale defaults.
    pub(crate) fn for_canvas(width: f32, height: f32) -> Self {
        let spacing = (width / 26.0).max(3.0);
        Self {
            x_dots: 12,
            y_dots: 28,
            spacing,
            wave_max_height: (height * 0.2).max(8.0),
            dot_size: 0.25,
            wave_delay: 2,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.frame_qtd == 0 {
            bail!("frame_qtd must be at least 1");
        }
        if self.frame_cap == 0 {
            bail!("frame_cap must be at least 1");
        }
        Ok(())
    }

    /// Stride of drawn rows/columns; every index divisible by it is kept.
    pub(crate) fn stride(&self) -> u32 {
        self.hollow_dots + 1
    }
}

pub(crate) struct Paths {
    pub(crate) config_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "dotwave", "Dotwave")
        .context("could not resolve project directories")?;
    let dir = proj.config_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths {
        config_path: dir.join("config.json"),
    })
}

/// Loads the settings file. Returns None when the file is missing or
/// unparsable, leaving the choice of fallback to the caller.
pub(crate) fn load_config(path: &Path) -> Option<WaveConfig> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<WaveConfig>(&raw).ok()
}

pub(crate) fn save_config_atomic(path: &Path, config: &WaveConfig) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(config)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // Best-effort atomic replace on same filesystem.
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let c = WaveConfig::default();
        assert_eq!(c.hollow_dots, 2);
        assert_eq!(c.stride(), 3);
        assert_eq!(c.center_position, 0.5);
        assert_eq!(c.wave_max_height, 100.0);
        assert_eq!(c.horizon_angle, 0.0);
        assert_eq!(c.dot_size, 0.3);
        assert_eq!(c.wave_delay, 0);
        assert_eq!(c.wave_pattern, WavePattern::Straight);
        assert!(c.repeat);
        assert!(!c.backwards);
        assert_eq!(c.frame_qtd, 100);
        assert_eq!(c.frame_cap, 30);
    }

    #[test]
    fn absent_keys_take_defaults() {
        let c: WaveConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c.frame_qtd, 100);
        assert!(c.repeat);
        assert_eq!(c.hollow_dots, 2);
    }

    #[test]
    fn explicit_zero_and_false_are_overrides() {
        let c: WaveConfig =
            serde_json::from_str(r#"{"hollow_dots": 0, "repeat": false}"#).unwrap();
        assert_eq!(c.hollow_dots, 0);
        assert_eq!(c.stride(), 1);
        assert!(!c.repeat);
    }

    #[test]
    fn pattern_names_use_kebab_case() {
        let p: WavePattern = serde_json::from_str(r#""outside-in""#).unwrap();
        assert_eq!(p, WavePattern::OutsideIn);
        let s = serde_json::to_string(&WavePattern::InsideOut).unwrap();
        assert_eq!(s, r#""inside-out""#);
    }

    #[test]
    fn validation_rejects_zero_counts() {
        let mut c = WaveConfig::default();
        c.frame_qtd = 0;
        assert!(c.validate().is_err());

        let mut c = WaveConfig::default();
        c.frame_cap = 0;
        assert!(c.validate().is_err());

        assert!(WaveConfig::default().validate().is_ok());
    }
}
