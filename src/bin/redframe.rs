/// 红框通过计数 (Red Frame Crossing Counter)
///
/// 离线运行: 帧图片目录 + 外部跟踪器输出的目标观测 → 通过事件 (JSON Lines)
///
/// 主程序入口 - 直接运行: cargo run --bin redframe --release -- run -f frames -o objects.jsonl
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use redframe_rs::detection::types::{DetectionKind, Point2, Rect};
use redframe_rs::input::{sequence, ImageSequence, ObservationLog};
use redframe_rs::tracking::{event_channel, CrossingEvent, EventDispatcher};
use redframe_rs::{CrossingConfig, FramePipeline};

/// 红框通过计数程序
#[derive(Parser, Debug)]
#[command(author, version, about = "红框通过计数", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 处理帧序列并输出通过事件
    Run {
        /// 帧图片目录 (按文件名排序)
        #[arg(short, long)]
        frames: PathBuf,

        /// 目标观测 JSONL
        #[arg(short, long)]
        objects: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        /// 逻辑帧率,事件时间戳 = 帧号 / fps
        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// 使用系统时间作为事件时间戳
        #[arg(long)]
        wall_clock: bool,

        /// 事件输出文件 (默认标准输出)
        #[arg(short, long)]
        events: Option<PathBuf>,
    },

    /// 检测单张图片中的红框 (调参用)
    Detect {
        /// 输入图片
        image: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        /// 保存红色掩膜
        #[arg(long)]
        mask_out: Option<PathBuf>,
    },

    /// 写出默认配置文件
    InitConfig {
        #[arg(default_value = "redframe.json")]
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct ParamArgs {
    /// 配置文件 (JSON),不存在时自动创建
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆盖单个参数,如 --set h1_high=12 (可重复)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

impl ParamArgs {
    fn resolve(&self) -> Result<CrossingConfig> {
        let mut config = match &self.config {
            Some(path) => CrossingConfig::load(path),
            None => CrossingConfig::default(),
        };
        config
            .apply_overrides(&self.overrides)
            .context("参数覆盖失败")?;
        Ok(config)
    }
}

/// `detect` 子命令的输出
#[derive(Serialize)]
struct DetectionSummary {
    kind: DetectionKind,
    outer_bbox: Rect,
    center: Point2,
    inner_points: usize,
    outer_points: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("redframe_rs=info,redframe=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run {
            frames,
            objects,
            params,
            fps,
            wall_clock,
            events,
        } => run(frames, objects, &params, fps, wall_clock, events),
        Command::Detect {
            image,
            params,
            mask_out,
        } => detect(image, &params, mask_out),
        Command::InitConfig { path } => {
            CrossingConfig::default().save(&path)?;
            Ok(())
        }
    }
}

fn run(
    frames_dir: PathBuf,
    objects: PathBuf,
    params: &ParamArgs,
    fps: f64,
    wall_clock: bool,
    events_out: Option<PathBuf>,
) -> Result<()> {
    let config = params.resolve()?;
    config.log_summary();

    let sequence = ImageSequence::open(&frames_dir)?;
    let log = ObservationLog::load(&objects)?;
    info!(
        "🚀 红框通过计数启动: {} 帧, {} 帧有观测",
        sequence.len(),
        log.frame_count()
    );

    // 事件线程: 取出事件写成JSON Lines
    let mut out: Box<dyn Write + Send> = match &events_out {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("无法创建 {}", path.display()))?,
        )),
        None => Box::new(io::stdout()),
    };
    let (sink, rx) = event_channel(config.event_capacity);
    let dispatcher = EventDispatcher::spawn(rx, move |event: CrossingEvent| {
        match event.to_json() {
            Ok(line) => {
                if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
                    warn!("❌ 事件写出失败: {}", e);
                }
            }
            Err(e) => warn!("❌ 事件序列化失败: {}", e),
        }
    })
    .context("无法启动事件线程")?;

    let mut pipeline = FramePipeline::new(&config).with_sink(sink);
    let fps = if fps > 0.0 { fps } else { 30.0 };
    let mut skipped = 0usize;

    for (index, path, frame) in sequence.frames() {
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                warn!("⚠️  跳过帧 {}: {:#}", path.display(), e);
                skipped += 1;
                continue;
            }
        };

        let timestamp = if wall_clock {
            chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
        } else {
            index as f64 / fps
        };

        if let Err(e) = pipeline.process(&frame, log.frame(index as u64), timestamp) {
            warn!("⚠️  跳过帧 {}: {}", path.display(), e);
            skipped += 1;
        }
    }

    // 关闭发送端,等待事件线程写完
    let dropped = pipeline.close_sink().map_or(0, |s| s.dropped());
    let delivered = dispatcher
        .join()
        .map_err(|_| anyhow::anyhow!("事件线程异常退出"))?;

    // 最终统计
    let tracker = pipeline.tracker();
    info!("==================================================");
    info!("📊 最终统计");
    info!("  总通过次数: {}", tracker.total());
    let mut ids: Vec<u32> = tracker.tracked_ids().collect();
    ids.sort_unstable();
    for id in ids.into_iter().filter(|id| tracker.count(*id) > 0) {
        info!("  ID={}: {}次", id, tracker.count(id));
    }
    info!(
        "  处理帧: {}  跳过帧: {}  事件投递: {}  事件丢弃: {}",
        pipeline.frame_count(),
        skipped,
        delivered,
        dropped
    );
    info!("==================================================");
    Ok(())
}

fn detect(image: PathBuf, params: &ParamArgs, mask_out: Option<PathBuf>) -> Result<()> {
    let config = params.resolve()?;
    let pipeline = FramePipeline::new(&config);

    let frame = sequence::load_frame(&image)?;
    let mask = pipeline.mask(&frame)?;
    if let Some(path) = &mask_out {
        mask.save(path)
            .with_context(|| format!("无法保存掩膜 {}", path.display()))?;
        info!("💾 掩膜已保存到 {}", path.display());
    }

    let detections = pipeline.detector().detect(&mask);
    info!("🟥 检测到 {} 个红框", detections.len());

    let summary: Vec<DetectionSummary> = detections
        .iter()
        .map(|d| DetectionSummary {
            kind: d.kind,
            outer_bbox: d.outer_bbox,
            center: d.center,
            inner_points: d.inner_contour.as_ref().map_or(0, Vec::len),
            outer_points: d.outer_contour.len(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
