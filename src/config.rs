//! 红框通过计数配置 - 通过JSON文件调整参数
//!
//! 所有选项都有默认值,任意子集可在运行时用 `key=value` 覆盖。

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::detection::types::{ColorThresholds, GeometryThresholds, HUE_MAX};
use crate::error::ConfigError;
use crate::tracking::DEFAULT_EVENT_CAPACITY;

/// 可识别的选项名
pub const OPTION_KEYS: [&str; 17] = [
    "h1_low",
    "h1_high",
    "h2_low",
    "h2_high",
    "s_low",
    "s_high",
    "v_low",
    "v_high",
    "min_outer_area",
    "min_inner_area",
    "hole_ratio_min",
    "hole_ratio_max",
    "aspect_ratio_min",
    "aspect_ratio_max",
    "inside_margin_fraction",
    "crossing_tolerance",
    "event_capacity",
];

/// 全部参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossingConfig {
    // === 颜色阈值 ===
    pub color: ColorThresholds,

    // === 几何阈值 ===
    pub geometry: GeometryThresholds,

    // === 事件通道 ===
    pub event_capacity: usize, // 通道满时丢弃新事件
}

impl Default for CrossingConfig {
    fn default() -> Self {
        Self {
            color: ColorThresholds::default(),
            geometry: GeometryThresholds::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl CrossingConfig {
    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写出默认配置; 读取、解析或校验失败时使用默认值,不改动原文件。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("❌ 保存配置失败: {}", e);
                }
                config
            }
            Err(e) => {
                warn!("⚠️  无法读取配置文件 {}: {}, 使用默认值", path.display(), e);
                Self::default()
            }
        }
    }

    /// 解析并校验JSON,颜色阈值随即归一化
    ///
    /// 缺省的字段 (包括嵌套的颜色/几何阈值) 取默认值。
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate()?;
        config.color = config.color.normalized();
        Ok(config)
    }

    /// 检查取值范围与上下限关系
    ///
    /// 与 `key=value` 覆盖共用同一组规则; 颜色 low/high 颠倒不算错误,由归一化交换。
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &str, value: impl ToString) -> ConfigError {
            ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            }
        }

        let c = &self.color;
        for (key, h) in [
            ("h1_low", c.h1_low),
            ("h1_high", c.h1_high),
            ("h2_low", c.h2_low),
            ("h2_high", c.h2_high),
        ] {
            if h > HUE_MAX {
                return Err(invalid(key, h));
            }
        }

        let g = &self.geometry;
        for (key, v) in [
            ("min_outer_area", g.min_outer_area),
            ("min_inner_area", g.min_inner_area),
            ("hole_ratio_min", g.hole_ratio_min),
            ("hole_ratio_max", g.hole_ratio_max),
            ("aspect_ratio_min", g.aspect_ratio_min),
            ("aspect_ratio_max", g.aspect_ratio_max),
            ("inside_margin_fraction", g.inside_margin_fraction as f64),
            ("crossing_tolerance", g.crossing_tolerance as f64),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(key, v));
            }
        }

        // 收缩比例 ≥ 0.5 时收缩框左右颠倒,任何物体都不可能在框内
        if g.inside_margin_fraction >= 0.5 {
            return Err(invalid("inside_margin_fraction", g.inside_margin_fraction));
        }
        if g.hole_ratio_min > g.hole_ratio_max {
            return Err(invalid("hole_ratio_min", g.hole_ratio_min));
        }
        if g.aspect_ratio_min > g.aspect_ratio_max {
            return Err(invalid("aspect_ratio_min", g.aspect_ratio_min));
        }
        if self.event_capacity == 0 {
            return Err(invalid("event_capacity", self.event_capacity));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    /// 覆盖单个选项 (只检查该值本身; 上下限关系由 [`Self::apply_overrides`] 统一检查)
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let hue = || -> Result<u8, ConfigError> {
            value
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|h| *h <= HUE_MAX)
                .ok_or_else(invalid)
        };
        let channel = || value.trim().parse::<u8>().map_err(|_| invalid());
        let non_negative = || -> Result<f64, ConfigError> {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(invalid)
        };

        let c = &mut self.color;
        let g = &mut self.geometry;
        match key {
            "h1_low" => c.h1_low = hue()?,
            "h1_high" => c.h1_high = hue()?,
            "h2_low" => c.h2_low = hue()?,
            "h2_high" => c.h2_high = hue()?,
            "s_low" => c.s_low = channel()?,
            "s_high" => c.s_high = channel()?,
            "v_low" => c.v_low = channel()?,
            "v_high" => c.v_high = channel()?,
            "min_outer_area" => g.min_outer_area = non_negative()?,
            "min_inner_area" => g.min_inner_area = non_negative()?,
            "hole_ratio_min" => g.hole_ratio_min = non_negative()?,
            "hole_ratio_max" => g.hole_ratio_max = non_negative()?,
            "aspect_ratio_min" => g.aspect_ratio_min = non_negative()?,
            "aspect_ratio_max" => g.aspect_ratio_max = non_negative()?,
            "inside_margin_fraction" => {
                let m = non_negative()?;
                if m >= 0.5 {
                    return Err(invalid());
                }
                g.inside_margin_fraction = m as f32;
            }
            "crossing_tolerance" => g.crossing_tolerance = non_negative()? as f32,
            "event_capacity" => {
                self.event_capacity = value
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(invalid)?;
            }
            _ => return Err(ConfigError::UnknownOption(key.to_string())),
        }

        self.color = self.color.normalized();
        Ok(())
    }

    /// 依次应用 `key=value` 形式的覆盖
    ///
    /// 全部应用后整体校验,任一失败时配置保持不变。
    pub fn apply_overrides<I, S>(&mut self, overrides: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.clone();
        for item in overrides {
            let item = item.as_ref();
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedOverride(item.to_string()))?;
            next.apply_override(key.trim(), value)?;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// 打印当前配置
    pub fn log_summary(&self) {
        let c = &self.color;
        let g = &self.geometry;
        info!("🎛️  当前配置:");
        info!(
            "  H1: {}-{}  H2: {}-{}  S: {}-{}  V: {}-{}",
            c.h1_low, c.h1_high, c.h2_low, c.h2_high, c.s_low, c.s_high, c.v_low, c.v_high
        );
        info!(
            "  外框最小面积: {:.0}  内孔最小面积: {:.0}  内外比: {:.2}-{:.2}",
            g.min_outer_area, g.min_inner_area, g.hole_ratio_min, g.hole_ratio_max
        );
        info!(
            "  宽高比: {:.2}-{:.2}  边缘收缩: {:.2}  开口容差: {:.0}px  事件通道: {}",
            g.aspect_ratio_min,
            g.aspect_ratio_max,
            g.inside_margin_fraction,
            g.crossing_tolerance,
            self.event_capacity
        );
    }
}
