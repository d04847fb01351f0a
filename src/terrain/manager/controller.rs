// ============================================
// Streaming Controller - Какие чанки держать в памяти
// ============================================
// Вызывается раз в кадр из потока рендера:
// 1. выгрузить далёкие чанки (изменённые - в архив)
// 2. поставить загрузку недостающих (архив или генерация)
// 3. забрать готовые, сшить грани, загрузить меши
//
// Ключ проходит Unloaded -> Pending -> Resident -> Unloaded.
// Меш-sink живёт здесь и не обязан быть Send, так что
// контроллер привязан к потоку рендера.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ultraviolet::Vec3;

use crate::core::{StreamError, StreamingConfig, StreamingContext};
use crate::save::ColdStorageArchiver;
use crate::terrain::cache::ChunkKey;
use crate::terrain::mesh::MeshSink;
use crate::terrain::voxel::{fix_shared_faces, lock_pair, Chunk, ChunkHandle, Face, PointLight, CHUNK_WIDTH};

use super::scheduler::GenerationScheduler;
use super::types::{ChunkState, StreamingStats};

pub struct StreamingController<S: MeshSink> {
    pub(super) context: StreamingContext,
    pub(super) scheduler: GenerationScheduler,
    pub(super) archiver: ColdStorageArchiver,
    /// Чанки в памяти. Только главный поток.
    pub(super) resident: HashMap<ChunkKey, ChunkHandle>,
    pub(super) sink: S,
}

impl<S: MeshSink> StreamingController<S> {
    pub fn new(context: StreamingContext, sink: S) -> Self {
        Self {
            scheduler: GenerationScheduler::new(context.pool.clone(), context.generator.clone()),
            archiver: ColdStorageArchiver::new(context.pool.clone(), context.store.clone()),
            resident: HashMap::new(),
            context,
            sink,
        }
    }

    /// Один шаг стриминга. Возвращает сколько ключей ушло в работу.
    pub fn tick(&mut self, observer: Vec3) -> usize {
        self.step(observer).len()
    }

    fn step(&mut self, observer: Vec3) -> Vec<ChunkKey> {
        let evicted = self.evict(observer);
        let dispatched = self.load(observer);
        let merged = self.merge();
        if evicted > 0 || !dispatched.is_empty() || merged > 0 {
            log::debug!(
                "[STREAM] Tick: evicted {}, dispatched {}, merged {}",
                evicted,
                dispatched.len(),
                merged
            );
        }
        dispatched
    }

    /// Выгрузить чанки дальше радиуса выгрузки
    fn evict(&mut self, observer: Vec3) -> usize {
        let unload_radius = self.context.config.unload_radius();
        let far: Vec<ChunkKey> = self
            .resident
            .keys()
            .filter(|key| key.horizontal_distance(observer) > unload_radius)
            .copied()
            .collect();

        for key in &far {
            let Some(handle) = self.resident.remove(key) else { continue };
            let modified = {
                let mut chunk = handle.lock();
                chunk.release_mesh(&mut self.sink);
                chunk.is_modified()
            };
            if modified {
                log::debug!("[STREAM] Archiving modified chunk {}", key);
                self.archiver.archive(handle);
            } else {
                log::trace!("[STREAM] Dropping pristine chunk {}", key);
            }
        }
        far.len()
    }

    /// Ключи в радиусе загрузки, ближние первыми
    fn candidates(&self, observer: Vec3) -> Vec<ChunkKey> {
        let radius = self.context.config.load_radius;
        let width = CHUNK_WIDTH as f32;
        let min_x = ((observer.x - radius) / width).floor() as i32;
        let max_x = ((observer.x + radius) / width).floor() as i32;
        let min_z = ((observer.z - radius) / width).floor() as i32;
        let max_z = ((observer.z + radius) / width).floor() as i32;

        let mut keys: Vec<(f32, ChunkKey)> = (min_x..=max_x)
            .flat_map(|x| (min_z..=max_z).map(move |z| ChunkKey::new(x, 0, z)))
            .map(|key| (key.horizontal_distance(observer), key))
            .filter(|(distance, _)| *distance <= radius)
            .collect();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        keys.into_iter().map(|(_, key)| key).collect()
    }

    /// Поставить загрузку недостающих чанков
    fn load(&mut self, observer: Vec3) -> Vec<ChunkKey> {
        let mut dispatched = Vec::new();
        for key in self.candidates(observer) {
            if self.state(key) != ChunkState::Unloaded {
                continue;
            }
            if self.archiver.contains(key) && self.archiver.restore(key) {
                log::debug!("[STREAM] Restoring chunk {} from archive", key);
            } else {
                self.scheduler.dispatch(self.resident_neighbours(key), Chunk::new(key));
            }
            dispatched.push(key);
        }
        dispatched
    }

    /// Забрать готовые чанки и загрузить их меши
    fn merge(&mut self) -> usize {
        let mut arrived = self.archiver.drain();
        arrived.extend(self.scheduler.drain());
        let merged = arrived.len();

        for handle in arrived {
            let key = handle.key();
            assert!(!self.resident.contains_key(&key), "chunk {} merged while resident", key);

            // Соседи могли появиться уже после постановки задачи
            for neighbour in self.resident_neighbours(key) {
                let (mut chunk, mut neighbour) = lock_pair(&handle, &neighbour);
                fix_shared_faces(&mut chunk, &mut neighbour);
            }
            handle.lock().realize(&mut self.sink);
            self.resident.insert(key, handle);
        }

        if merged > 0 {
            self.remesh_stale();
        }
        merged
    }

    /// Перестроить меши, у которых соседи поменяли грани
    pub(super) fn remesh_stale(&mut self) {
        for handle in self.resident.values() {
            let mut chunk = handle.lock();
            if chunk.is_mesh_stale() {
                chunk.realize(&mut self.sink);
            }
        }
    }

    pub(super) fn resident_neighbours(&self, key: ChunkKey) -> Vec<ChunkHandle> {
        Face::SIDES
            .iter()
            .filter_map(|face| {
                let (dx, _, dz) = face.offset();
                self.resident.get(&key.offset(dx, dz)).cloned()
            })
            .collect()
    }

    /// Стартовый барьер: ждать, пока чанки первого тика не окажутся в памяти
    pub fn prime(&mut self, observer: Vec3) -> Result<usize, StreamError> {
        let keys = self.step(observer);
        let timeout = Duration::from_millis(self.context.config.prime_timeout_ms);
        let poll = Duration::from_millis(self.context.config.prime_poll_ms);
        let start = Instant::now();

        loop {
            let pending = keys.iter().filter(|key| !self.resident.contains_key(key)).count();
            if pending == 0 {
                log::info!("[STREAM] Primed {} chunks in {:?}", keys.len(), start.elapsed());
                return Ok(keys.len());
            }
            if start.elapsed() >= timeout {
                return Err(StreamError::Timeout {
                    waited_ms: start.elapsed().as_millis() as u64,
                    pending,
                });
            }
            std::thread::sleep(poll);
            self.tick(observer);
        }
    }

    /// Дождаться, пока архив допишет и дочитает все блобы
    pub fn flush_archive(&mut self) -> Result<(), StreamError> {
        let timeout = Duration::from_millis(self.context.config.prime_timeout_ms);
        let poll = Duration::from_millis(self.context.config.prime_poll_ms);
        let start = Instant::now();
        loop {
            self.merge();
            let pending = self.archiver.storing_count() + self.archiver.restoring_count();
            if pending == 0 {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(StreamError::Timeout {
                    waited_ms: start.elapsed().as_millis() as u64,
                    pending,
                });
            }
            std::thread::sleep(poll);
        }
    }

    // --- Запросы ---

    pub fn state(&self, key: ChunkKey) -> ChunkState {
        if self.resident.contains_key(&key) {
            ChunkState::Resident
        } else if self.scheduler.is_pending(key) || self.archiver.is_busy(key) {
            ChunkState::Pending
        } else {
            ChunkState::Unloaded
        }
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&ChunkHandle> {
        self.resident.get(&key)
    }

    pub fn resident_keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.resident.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Изменённые чанки в памяти (для сохранения мира)
    pub fn resident_modified(&self) -> Vec<ChunkHandle> {
        let mut chunks: Vec<ChunkHandle> = self
            .resident
            .values()
            .filter(|handle| handle.lock().is_modified())
            .cloned()
            .collect();
        chunks.sort_by_key(|handle| handle.key());
        chunks
    }

    /// Источники света в горизонтальном радиусе от наблюдателя
    pub fn lights_near(&self, observer: Vec3, radius: f32) -> Vec<PointLight> {
        // Угол чанка может быть дальше его блоков на диагональ
        let reach = radius + CHUNK_WIDTH as f32 * std::f32::consts::SQRT_2;
        let mut lights = Vec::new();
        for handle in self.resident.values() {
            if handle.key().horizontal_distance(observer) > reach {
                continue;
            }
            let chunk = handle.lock();
            lights.extend(chunk.lights().filter(|light| {
                let dx = light.position.x - observer.x;
                let dz = light.position.z - observer.z;
                (dx * dx + dz * dz).sqrt() <= radius
            }));
        }
        lights
    }

    /// Свет в радиусе из конфига
    pub fn visible_lights(&self, observer: Vec3) -> Vec<PointLight> {
        self.lights_near(observer, self.context.config.light_radius)
    }

    pub fn stats(&self) -> StreamingStats {
        StreamingStats {
            resident: self.resident.len(),
            ready: self.resident.values().filter(|h| h.lock().is_ready()).count(),
            generating: self.scheduler.pending_count(),
            restoring: self.archiver.restoring_count(),
            storing: self.archiver.storing_count(),
            archived: self.archiver.archived_count(),
        }
    }

    pub fn archiver(&self) -> &ColdStorageArchiver {
        &self.archiver
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.context.config
    }

    pub fn context(&self) -> &StreamingContext {
        &self.context
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::blocks::{GOLD, STONE};
    use crate::save::{FailingStore, MemoryBlobStore};
    use crate::terrain::block_pos::BlockPos;
    use crate::terrain::generation::WorldGenerator;
    use crate::terrain::mesh::HeadlessMeshSink;
    use std::sync::Arc;

    pub fn config(load_radius: f32) -> StreamingConfig {
        StreamingConfig {
            load_radius,
            unload_margin: 64.0,
            worker_threads: 2,
            generator: WorldGenerator::flat(),
            prime_timeout_ms: 10_000,
            prime_poll_ms: 2,
            ..Default::default()
        }
    }

    pub fn controller(load_radius: f32) -> StreamingController<HeadlessMeshSink> {
        let store = Arc::new(MemoryBlobStore::new());
        let context = StreamingContext::with_store(config(load_radius), store).unwrap();
        StreamingController::new(context, HeadlessMeshSink::new())
    }

    /// Тикать, пока два тика подряд ничего не ставят и задач нет
    pub fn settle(controller: &mut StreamingController<HeadlessMeshSink>, observer: Vec3) {
        let start = Instant::now();
        let mut quiet = 0;
        loop {
            let dispatched = controller.tick(observer);
            let stats = controller.stats();
            if dispatched == 0 && stats.generating == 0 && stats.restoring == 0 && stats.storing == 0 {
                quiet += 1;
                if quiet == 2 {
                    return;
                }
            } else {
                quiet = 0;
            }
            assert!(start.elapsed() < Duration::from_secs(10), "streaming did not settle: {}", stats);
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn origin() -> Vec3 {
        Vec3::new(0.0, 40.0, 0.0)
    }

    fn far() -> Vec3 {
        Vec3::new(500.0, 40.0, 0.0)
    }

    #[test]
    fn test_first_tick_makes_origin_pending() {
        let mut c = controller(32.0);
        let key = ChunkKey::new(0, 0, 0);
        let dispatched = c.tick(origin());
        // (0,0) и четыре соседа на расстоянии ровно 32
        assert_eq!(dispatched, 5);
        assert_ne!(c.state(key), ChunkState::Unloaded);

        settle(&mut c, origin());
        assert_eq!(c.state(key), ChunkState::Resident);
        assert!(c.chunk(key).unwrap().lock().is_ready());
        assert_eq!(c.sink().live_meshes(), 5);
    }

    #[test]
    fn test_no_double_dispatch() {
        let mut c = controller(64.0);
        let first = c.tick(origin());
        assert!(first > 0);
        // Пока ключи в работе, повторный тик их не ставит
        let mut total = first;
        let start = Instant::now();
        while c.stats().resident < first {
            total += c.tick(origin());
            assert!(start.elapsed() < Duration::from_secs(10));
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(total, first);
        assert_eq!(c.stats().resident, first);
        assert_eq!(c.sink().uploads() - c.sink().releases(), first);
    }

    #[test]
    fn test_pristine_chunk_dropped_on_evict() {
        let mut c = controller(32.0);
        c.prime(origin()).unwrap();
        c.tick(far());

        let key = ChunkKey::new(0, 0, 0);
        assert_eq!(c.state(key), ChunkState::Unloaded);
        assert!(!c.archiver().contains(key));
        assert_eq!(c.stats().storing, 0);
        assert!(!c.sink().has_mesh_for(key));
    }

    #[test]
    fn test_modified_chunk_archived_and_restored() {
        let mut c = controller(32.0);
        c.prime(origin()).unwrap();
        let key = ChunkKey::new(0, 0, 0);

        c.set_block(BlockPos::new(5, 20, 5), GOLD).unwrap();
        c.set_block(BlockPos::new(6, 20, 5), STONE).unwrap();
        let before = c.chunk(key).unwrap().lock().block_ids();

        settle(&mut c, far());
        assert_eq!(c.state(key), ChunkState::Unloaded);
        assert!(c.archiver().contains(key));

        // Возврат: восстановление, не генерация
        c.tick(origin());
        assert!(c.archiver().is_restoring(key) || c.state(key) == ChunkState::Resident);
        assert!(!c.scheduler.is_pending(key));
        assert!(!c.archiver().contains(key));

        settle(&mut c, origin());
        let chunk = c.chunk(key).unwrap().lock();
        assert_eq!(chunk.block_ids(), before);
        assert!(chunk.is_modified());
        assert!(chunk.is_ready());
        assert!(chunk.light_at(5, 20, 5).is_some());
    }

    #[test]
    fn test_hysteresis_band() {
        let mut c = controller(64.0);
        let key = ChunkKey::new(0, 0, 0);
        c.prime(origin()).unwrap();

        // Колебания вокруг радиуса загрузки не выгружают чанк
        for i in 0..10 {
            let x = if i % 2 == 0 { 63.0 } else { 65.0 };
            c.tick(Vec3::new(x, 0.0, 0.0));
            assert_eq!(c.state(key), ChunkState::Resident, "evicted at x = {}", x);
        }
        // Граница выгрузки включительно
        c.tick(Vec3::new(128.0, 0.0, 0.0));
        assert_eq!(c.state(key), ChunkState::Resident);
        c.tick(Vec3::new(129.0, 0.0, 0.0));
        assert_eq!(c.state(key), ChunkState::Unloaded);
    }

    #[test]
    fn test_boundary_faces_hidden_between_resident_chunks() {
        let mut c = controller(64.0);
        c.prime(origin()).unwrap();
        settle(&mut c, origin());

        let last = CHUNK_WIDTH as usize - 1;
        let a = c.chunk(ChunkKey::new(0, 0, 0)).unwrap().lock();
        let b = c.chunk(ChunkKey::new(1, 0, 0)).unwrap().lock();
        for y in 0..8 {
            assert!(!a.get(last, y, 9).unwrap().faces.is_visible(Face::PosX));
            assert!(!b.get(0, y, 9).unwrap().faces.is_visible(Face::NegX));
        }
        assert!(!a.is_mesh_stale() && !b.is_mesh_stale());
    }

    #[test]
    fn test_edit_before_merge_exposes_neighbour_face() {
        let mut c = controller(32.0);
        c.prime(origin()).unwrap();
        let resident = ChunkKey::new(1, 0, 0);
        let incoming = ChunkKey::new(2, 0, 0);
        let last = CHUNK_WIDTH as usize - 1;

        let observer = Vec3::new(32.0, 40.0, 0.0);
        assert!(c.load(observer).contains(&incoming));

        // Воркер сшил новый чанк с соседом, но в память он ещё не попал
        let start = Instant::now();
        while c.chunk(resident).unwrap().lock().get(last, 7, 4).unwrap().faces.is_visible(Face::PosX) {
            assert!(start.elapsed() < Duration::from_secs(10), "fix-up did not run");
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(c.state(incoming), ChunkState::Pending);

        assert_eq!(c.remove_block(BlockPos::new(63, 7, 4)).unwrap(), Some(crate::blocks::GRASS));
        settle(&mut c, observer);

        let chunk = c.chunk(incoming).unwrap().lock();
        assert!(chunk.get(0, 7, 4).unwrap().faces.is_visible(Face::NegX));
        assert!(!chunk.get(0, 6, 4).unwrap().faces.is_visible(Face::NegX));
        assert!(!chunk.is_mesh_stale());
        assert!(chunk.is_ready());
    }

    #[test]
    fn test_panicked_generation_is_redispatched() {
        let mut c = controller(32.0);
        let key = ChunkKey::new(0, 0, 0);
        // Непустой чанк: генератор паникует на нём
        let mut broken = Chunk::new(key);
        broken.set(0, 100, 0, STONE);
        c.scheduler.dispatch(Vec::new(), broken);

        let start = Instant::now();
        while c.scheduler.is_pending(key) {
            assert_eq!(c.merge(), 0);
            assert!(start.elapsed() < Duration::from_secs(10), "panicked job never finished");
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(c.state(key), ChunkState::Unloaded);

        settle(&mut c, origin());
        assert_eq!(c.state(key), ChunkState::Resident);
        let chunk = c.chunk(key).unwrap().lock();
        assert_eq!(chunk.voxel_count(), 32 * 32 * 8);
        assert!(chunk.get(0, 100, 0).is_none());
    }

    #[test]
    fn test_failed_archive_write_regenerates() {
        let context = StreamingContext::with_store(config(32.0), Arc::new(FailingStore)).unwrap();
        let mut c = StreamingController::new(context, HeadlessMeshSink::new());
        let key = ChunkKey::new(0, 0, 0);
        c.prime(origin()).unwrap();
        c.set_block(BlockPos::new(5, 20, 5), GOLD).unwrap();

        settle(&mut c, far());
        assert_eq!(c.state(key), ChunkState::Unloaded);
        assert!(!c.archiver().contains(key));
        assert!(!c.archiver().is_busy(key));

        // Правки потеряны, чанк строится заново
        settle(&mut c, origin());
        assert_eq!(c.state(key), ChunkState::Resident);
        let chunk = c.chunk(key).unwrap().lock();
        assert!(!chunk.is_modified());
        assert_eq!(chunk.block_at(5, 20, 5), crate::blocks::AIR);
        assert!(chunk.light_at(5, 20, 5).is_none());
    }

    #[test]
    fn test_failed_restore_falls_back_to_generation() {
        let mut c = controller(32.0);
        let key = ChunkKey::new(0, 0, 0);
        // Битый блоб в архиве
        let blob = c.context().store.write(key, b"corrupt").unwrap();
        c.archiver().bulk_insert([(key, blob)]);

        c.tick(origin());
        // Запись архива снята при постановке восстановления
        assert!(!c.archiver().contains(key));
        settle(&mut c, origin());

        assert_eq!(c.state(key), ChunkState::Resident);
        let chunk = c.chunk(key).unwrap().lock();
        assert!(!chunk.is_modified());
        assert_eq!(chunk.voxel_count(), 32 * 32 * 8);
    }

    #[test]
    fn test_prime_times_out() {
        let store = Arc::new(MemoryBlobStore::new());
        let config = StreamingConfig { prime_timeout_ms: 0, ..config(256.0) };
        let context = StreamingContext::with_store(config, store).unwrap();
        let mut c = StreamingController::new(context, HeadlessMeshSink::new());
        assert!(matches!(c.prime(origin()), Err(StreamError::Timeout { .. })));
    }

    #[test]
    fn test_lights_near() {
        let mut c = controller(32.0);
        c.prime(origin()).unwrap();
        c.set_block(BlockPos::new(2, 10, 2), GOLD).unwrap();
        c.set_block(BlockPos::new(30, 10, 30), GOLD).unwrap();

        let near = c.lights_near(Vec3::new(0.0, 0.0, 0.0), 10.0);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].position, Vec3::new(2.5, 10.5, 2.5));
        assert_eq!(c.visible_lights(origin()).len(), 2);
        assert_eq!(c.resident_modified().len(), 1);
    }
}
