// ============================================
// Terrain Stream - Headless прогон стриминга
// ============================================
// Ведёт наблюдателя по миру, ставит метки, уходит
// и возвращается, чтобы чанки прошли архив и восстановление.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ultraviolet::Vec3;

use terrain_stream::blocks::{block_by_name, block_name, is_light_emitting};
use terrain_stream::core::ConfigError;
use terrain_stream::{BlockPos, HeadlessMeshSink, StreamError, StreamingConfig, StreamingController, WorldGenerator};

#[derive(Parser)]
#[command(name = "terrain-stream", about = "Headless voxel chunk streaming walk")]
pub struct Args {
    /// JSON конфиг стриминга
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Генератор: "hills" или "flat"
    #[arg(short, long, default_value = "hills")]
    pub generator: String,

    /// Сид мира (для hills)
    #[arg(short, long, default_value = "0")]
    pub seed: i64,

    /// Папка архива (по умолчанию архив в памяти)
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,

    /// Сколько шагов идти в одну сторону
    #[arg(long, default_value = "40")]
    pub steps: u32,

    /// Длина шага в блоках
    #[arg(long, default_value = "16.0")]
    pub step_size: f32,

    /// Какой блок ставить у старта
    #[arg(long, default_value = "gold")]
    pub marker: String,

    /// Экспортировать мир в папку после прогона
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Открыть мир из бандла вместо нового
    #[arg(long)]
    pub import: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        log::error!("[STREAM] {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), StreamError> {
    let marker = block_by_name(&args.marker)
        .ok_or_else(|| ConfigError::Invalid(format!("unknown block \"{}\"", args.marker)))?;

    let mut config = match &args.config {
        Some(path) => StreamingConfig::load(path)?,
        None => StreamingConfig::default(),
    };
    if args.archive_dir.is_some() {
        config.archive_dir = args.archive_dir.clone();
    }
    if args.config.is_none() {
        config.generator = match args.generator.as_str() {
            "flat" => WorldGenerator::flat(),
            _ => WorldGenerator::hills(args.seed),
        };
    }
    let poll = Duration::from_millis(config.prime_poll_ms);

    let (mut controller, home) = match &args.import {
        Some(dir) => StreamingController::import_bundle(config, HeadlessMeshSink::new(), dir)?,
        None => {
            let context = terrain_stream::StreamingContext::new(config)?;
            (StreamingController::new(context, HeadlessMeshSink::new()), Vec3::zero())
        }
    };

    let primed = controller.prime(home)?;
    log::info!("[STREAM] Start area ready: {} chunks, {}", primed, controller.stats());

    // Метки над поверхностью около старта
    let mut placed = 0;
    for i in 0..8 {
        let x = home.x as i32 + i * 6 - 24;
        let z = home.z as i32;
        let top = (0..terrain_stream::terrain::CHUNK_HEIGHT)
            .rev()
            .find(|y| controller.block_at(BlockPos::new(x, *y, z)).is_some())
            .unwrap_or(0);
        if controller.set_block(BlockPos::new(x, top + 1, z), marker)? {
            placed += 1;
        }
    }
    log::info!(
        "[STREAM] Placed {} {} blocks (emits light: {}), {} lights visible",
        placed,
        block_name(marker),
        is_light_emitting(marker),
        controller.visible_lights(home).len()
    );

    // Туда и обратно: изменённые чанки уходят в архив и возвращаются
    let mut observer = home;
    for step in 0..args.steps * 2 {
        let direction = if step < args.steps { 1.0 } else { -1.0 };
        observer.x += direction * args.step_size;
        let dispatched = controller.tick(observer);
        log::debug!("[STREAM] Step {} at x = {}: dispatched {}", step, observer.x, dispatched);
        std::thread::sleep(poll);
    }
    controller.prime(observer)?;
    log::info!("[STREAM] Back home: {}", controller.stats());
    log::info!("[STREAM] Meshes: {} uploaded, {} released", controller.sink().uploads(), controller.sink().releases());

    if let Some(dir) = &args.export {
        let count = controller.export_bundle(dir, observer)?;
        println!("[SAVE] Exported {} chunks to {}", count, dir.display());
    }
    Ok(())
}
