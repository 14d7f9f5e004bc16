//! # Skill FX Host
//!
//! 技能动画预览工具：在虚拟时间（或实时）里回放一个场景，
//! 打印每个动作的阶段切换与权威提交时间线。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p skill-fx-host
//! cargo run -p skill-fx-host -- --scenario scenarios/demo.json --mirrored
//! cargo run -p skill-fx-host -- --realtime -v
//! cargo run -p skill-fx-host -- --list
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use skill_fx::{ActionConfig, BoardPos, EffectDuration, RendererRegistry};
use skill_fx_host::{AppConfig, BoardView, Orchestrator, Preview, Scenario, TimelineEvent};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "skill-fx-host")]
#[command(about = "技能动画预览工具")]
#[command(version)]
struct Cli {
    /// 配置文件（默认：config.json）
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 场景文件（不指定时使用内置演示场景）
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// 以第二视角（镜像坐标）观看
    #[arg(short, long)]
    mirrored: bool,

    /// 按真实时间播放
    #[arg(short, long)]
    realtime: bool,

    /// 每一步推进的毫秒数（覆盖配置文件）
    #[arg(long)]
    tick_ms: Option<u32>,

    /// 列出已注册的渲染器后退出
    #[arg(short, long)]
    list: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("skill-fx-host error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 日志级别来自配置文件，加载期间的警告先用临时订阅者输出
    let loader = FmtSubscriber::builder().with_max_level(Level::WARN).finish();
    let mut config = tracing::subscriber::with_default(loader, || AppConfig::load(&cli.config));
    if cli.mirrored {
        config.mirrored = true;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    config.validate().context("配置无效")?;

    let level: Level = config
        .log_level
        .parse()
        .with_context(|| format!("未知的日志级别: {}", config.log_level))?;
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("日志初始化失败")?;

    let registry = RendererRegistry::with_builtin();
    if cli.list {
        list_renderers(&registry);
        return Ok(());
    }

    let scenario = match &cli.scenario {
        Some(path) => Scenario::load(path, &registry).with_context(|| format!("场景加载失败: {}", path.display()))?,
        None => Scenario::demo(),
    };

    let mut board = BoardView::new(config.grid).with_size(config.board.to_box());
    scenario.populate(&mut board).context("场景实体放置失败")?;
    let orchestrator = Orchestrator::new(registry, board).with_mirrored(config.mirrored);
    let mut preview = Preview::new(orchestrator, &scenario, config.tick_ms);

    println!(
        "场景 {:?}: {} 个实体, {} 个动作{}",
        scenario.name,
        scenario.entities.len(),
        scenario.actions.len(),
        if config.mirrored { "（镜像视角）" } else { "" }
    );

    if cli.realtime {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("tokio 运行时创建失败")?;
        runtime.block_on(preview.run_realtime());
    } else {
        preview.run_virtual();
        for event in preview.timeline() {
            println!("{event}");
        }
    }

    let end = preview.timeline().iter().map(TimelineEvent::at).max().unwrap_or(0);
    println!("完成，共 {end}ms");
    Ok(())
}

/// 打印注册表内容
fn list_renderers(registry: &RendererRegistry) {
    // 动态时长需要具体配置，这里只标注类型
    let probe = ActionConfig::new("", "probe", BoardPos::new(0, 0));
    let describe = |duration: EffectDuration| match duration {
        EffectDuration::Fixed(ms) => format!("{ms}ms"),
        EffectDuration::Dynamic(f) => format!("动态（空配置 {}ms）", f(&probe)),
    };

    for name in registry.names() {
        let renderer = registry.lookup(name);
        println!("{name:<12} {}", describe(renderer.duration()));
    }
    println!("{:<12} {}（兜底）", registry.fallback().name(), describe(registry.fallback().duration()));
}
