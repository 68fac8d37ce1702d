//! Scene orchestration: parameters, spectrum history and the active shaper.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use glam::Mat4;
use log::{debug, info, warn};

use super::scheduler::RebuildScheduler;
use crate::colour::ColourMapperKind;
use crate::error::Result;
use crate::geom::{RenderBatch, RenderMode};
use crate::params::{
    config, is_shaper_param, register_defaults, ExportConfig, HistoryConfig, ParamHost,
    ParamValue, AUDIO_RECORDING, AUDIO_SOURCE, MAPPER, RENDER_MODE, SHAPER, SPLIT,
};
use crate::remote::ParamUpdate;
use crate::shaper::{Shaper, ShaperKind};
use crate::spectrum::SpectrumHistory;

/// Static settings for a [`SculptureSystem`]
#[derive(Debug, Clone)]
pub struct SculptureSettings {
    /// Quiet period after a shaper slider change before rebuilding
    pub rebuild_delay: Duration,
    pub export: ExportConfig,
    /// Directory searched for colour map images
    pub colour_map_dir: Option<PathBuf>,
}

impl Default for SculptureSettings {
    fn default() -> Self {
        Self {
            rebuild_delay: HistoryConfig::default().rebuild_delay,
            export: ExportConfig::default(),
            colour_map_dir: None,
        }
    }
}

/// Owns the scene and reacts to parameter changes.
///
/// Shaper, mapper, render mode and split changes apply on the next
/// [`SculptureSystem::process_changes`]. Shaper slider changes only restart
/// the rebuild countdown; the surface is rebuilt once the sliders have been
/// quiet for the configured delay.
pub struct SculptureSystem {
    params: ParamHost,
    history: SpectrumHistory,
    shaper: Box<dyn Shaper>,
    shaper_kind: ShaperKind,
    mapper_kind: ColourMapperKind,
    scheduler: RebuildScheduler,
    settings: SculptureSettings,
    /// Slider updates for a family that is not active yet
    deferred: Vec<ParamUpdate>,
    /// Input device selection waiting for the owner of the live input
    source_change: Option<i32>,
}

impl SculptureSystem {
    pub fn new(history: SpectrumHistory) -> Result<Self> {
        Self::with_settings(history, SculptureSettings::default())
    }

    /// Build the default shaper over `history`
    pub fn with_settings(history: SpectrumHistory, settings: SculptureSettings) -> Result<Self> {
        let mut params = ParamHost::new();
        register_defaults(&mut params);

        let shaper_kind = ShaperKind::default();
        let mapper_kind = ColourMapperKind::default();
        let mapper = mapper_kind.load(settings.colour_map_dir.as_deref());
        let mut shaper = shaper_kind.create(mapper);
        shaper.initialise(&mut params);
        shaper.create_surface(&history, &params)?;
        params.drain_changes();

        info!(
            "Sculpture ready: {} over {}x{} spectrum",
            shaper.name(),
            history.len(),
            history.freq_count()
        );
        Ok(Self {
            params,
            history,
            shaper,
            shaper_kind,
            mapper_kind,
            scheduler: RebuildScheduler::new(settings.rebuild_delay),
            settings,
            deferred: Vec::new(),
            source_change: None,
        })
    }

    pub fn params(&self) -> &ParamHost {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamHost {
        &mut self.params
    }

    pub fn history(&self) -> &SpectrumHistory {
        &self.history
    }

    pub fn shaper(&self) -> &dyn Shaper {
        self.shaper.as_ref()
    }

    pub fn shaper_kind(&self) -> ShaperKind {
        self.shaper_kind
    }

    pub fn mapper_kind(&self) -> ColourMapperKind {
        self.mapper_kind
    }

    pub fn rebuild_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn is_recording(&self) -> bool {
        self.params.bool(AUDIO_RECORDING).unwrap_or(false)
    }

    /// Swap the active shaper family and rebuild.
    ///
    /// The new family's surface is built before the swap is committed; on
    /// failure the previous family, its sliders and its surface stay active.
    pub fn select_shaper(&mut self, kind: ShaperKind) -> Result<()> {
        let previous: Vec<_> = self
            .shaper
            .parameters()
            .into_iter()
            .filter_map(|address| self.params.get(address).cloned())
            .collect();
        self.shaper.deinitialise(&mut self.params);

        let mut shaper = kind.create(self.shaper.colour_mapper());
        shaper.initialise(&mut self.params);
        // Sliders both families share keep their value
        for param in &previous {
            if self.params.contains(&param.address) {
                if let Err(e) = self.params.set(&param.address, param.value.clone()) {
                    warn!("Cannot carry over {}: {}", param.address, e);
                }
            }
        }
        self.replay_deferred();

        let start = Instant::now();
        if let Err(e) = shaper.create_surface(&self.history, &self.params) {
            shaper.deinitialise(&mut self.params);
            for param in previous {
                self.params.register(param);
            }
            self.sync_choice(SHAPER, self.shaper_kind.key());
            warn!("Keeping {}: {} cannot be built: {}", self.shaper_kind, kind, e);
            return Err(e);
        }
        debug!(
            "Built {} surface in {:.1} ms",
            shaper.name(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        self.shaper = shaper;
        self.shaper_kind = kind;
        self.sync_choice(SHAPER, kind.key());
        self.scheduler.cancel();
        info!("Selected shaper {}", kind);

        self.apply_display_params();
        Ok(())
    }

    /// Swap the colour mapper and rebuild so every vertex picks it up
    pub fn select_mapper(&mut self, kind: ColourMapperKind) -> Result<()> {
        let mapper = kind.load(self.settings.colour_map_dir.as_deref());
        self.shaper.set_colour_mapper(mapper);
        self.mapper_kind = kind;
        self.sync_choice(MAPPER, kind.key());
        info!("Selected colour mapper {}", kind);
        self.rebuild()
    }

    /// Replace the spectrum history and rebuild immediately
    pub fn set_history(&mut self, mut history: SpectrumHistory) -> Result<()> {
        history.reset_cursor();
        self.history = history;
        self.scheduler.cancel();
        self.rebuild()
    }

    /// Write a live frame at the cursor and reshape that slice.
    ///
    /// Ignored while recording is off. Normals are flushed by the next
    /// [`SculptureSystem::tick`].
    pub fn push_frame(&mut self, frame: &[f32]) -> Result<()> {
        if !self.is_recording() {
            return Ok(());
        }
        let idx = self.history.push_frame(frame)?;
        if let Some(row) = self.history.row(idx) {
            self.shaper.update_surface(idx, row, &self.params)?;
        }
        Ok(())
    }

    /// Set a parameter from a remote update.
    ///
    /// Sliders are held back while a shaper selection is waiting to be
    /// processed, or when the active family does not have them, so a shaper
    /// change and its sliders can arrive together in any order.
    pub fn apply(&mut self, update: ParamUpdate) -> Result<()> {
        let defer = !self.params.contains(&update.address) || self.params.is_pending(SHAPER);
        if is_shaper_param(&update.address) && defer {
            debug!("Deferring {} until the next shaper change", update.address);
            self.deferred.retain(|d| d.address != update.address);
            self.deferred.push(update);
            return Ok(());
        }
        self.params.set(&update.address, update.value)
    }

    /// Set a parameter from its text form (config files, CLI)
    pub fn set_param_str(&mut self, address: &str, value: &str) -> Result<()> {
        self.params.set_from_str(address, value)
    }

    /// React to every parameter set since the last call.
    ///
    /// A failed selection does not stop the remaining changes from being
    /// processed; the first error is returned afterwards.
    pub fn process_changes(&mut self, now: Instant) -> Result<()> {
        let mut result = Ok(());
        for address in self.params.drain_changes() {
            let outcome = match address.as_str() {
                SHAPER => match self.params.choice_as::<ShaperKind>(SHAPER) {
                    Some(kind) if kind != self.shaper_kind => self.select_shaper(kind),
                    Some(_) => Ok(()),
                    None => {
                        warn!("Unknown shaper {:?}", self.params.choice(SHAPER));
                        self.sync_choice(SHAPER, self.shaper_kind.key());
                        Ok(())
                    }
                },
                MAPPER => match self.params.choice_as::<ColourMapperKind>(MAPPER) {
                    Some(kind) if kind != self.mapper_kind => self.select_mapper(kind),
                    Some(_) => Ok(()),
                    None => {
                        warn!("Unknown colour mapper {:?}", self.params.choice(MAPPER));
                        self.sync_choice(MAPPER, self.mapper_kind.key());
                        Ok(())
                    }
                },
                RENDER_MODE | SPLIT => {
                    self.apply_display_params();
                    Ok(())
                }
                AUDIO_SOURCE => {
                    self.source_change = self.params.int(AUDIO_SOURCE);
                    Ok(())
                }
                other if is_shaper_param(other) => {
                    debug!("{} changed, rebuild scheduled", other);
                    self.scheduler.schedule(now);
                    Ok(())
                }
                _ => Ok(()),
            };
            if let (Err(e), true) = (outcome, result.is_ok()) {
                result = Err(e);
            }
        }
        // Reacting may have set parameters again
        self.params.drain_changes();

        // Held-back sliders of an unchanged family reschedule on the next call
        self.replay_deferred();
        for update in self.deferred.drain(..) {
            warn!("Dropping {}: not a parameter of {}", update.address, self.shaper_kind);
        }
        result
    }

    /// Once per frame: apply changes, run a due rebuild, then flush normals
    /// and advance the animation angle from the history cursor.
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        self.process_changes(now)?;
        if self.scheduler.take_due(now) {
            self.rebuild()?;
        }
        self.apply_display_params();
        self.shaper.update(self.history.cursor_angle());
        Ok(())
    }

    /// Full rebuild from the current history and parameters
    pub fn rebuild(&mut self) -> Result<()> {
        let start = Instant::now();
        self.shaper.create_surface(&self.history, &self.params)?;
        debug!(
            "Rebuilt {} surface in {:.1} ms",
            self.shaper.name(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }

    /// Model transform and draw batches for the active surfaces
    pub fn render(&self) -> (Mat4, Vec<RenderBatch>) {
        (self.shaper.model_matrix(), self.shaper.render())
    }

    pub fn cycle_render_mode(&mut self) -> Result<RenderMode> {
        let mode = self.shaper.render_mode().next();
        self.params.set(RENDER_MODE, ParamValue::Choice(mode.key().into()))?;
        Ok(mode)
    }

    pub fn toggle_split(&mut self) -> Result<bool> {
        let split = !self.params.bool(SPLIT).unwrap_or(false);
        self.params.set(SPLIT, ParamValue::Bool(split))?;
        Ok(split)
    }

    pub fn toggle_recording(&mut self) -> Result<bool> {
        let recording = !self.is_recording();
        self.params.set(AUDIO_RECORDING, ParamValue::Bool(recording))?;
        Ok(recording)
    }

    pub fn write_stl(&self, w: &mut dyn Write) -> Result<()> {
        self.shaper.write_stl(w, self.settings.export.stl_scale)
    }

    pub fn write_obj(&self, w: &mut dyn Write) -> Result<()> {
        self.shaper.write_obj(w, self.settings.export.obj_scale)
    }

    pub fn export_stl(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut w = BufWriter::new(File::create(path)?);
        self.write_stl(&mut w)?;
        w.flush()?;
        info!("Exported STL to {}", path.display());
        Ok(())
    }

    pub fn export_obj(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut w = BufWriter::new(File::create(path)?);
        self.write_obj(&mut w)?;
        w.flush()?;
        info!("Exported OBJ to {}", path.display());
        Ok(())
    }

    pub fn save_config(&self, path: impl AsRef<Path>) -> Result<()> {
        config::save(&self.params, path)
    }

    /// Apply a saved configuration.
    ///
    /// A shaper selection takes effect as soon as it is read so that the
    /// following lines can set that shaper's sliders. Unknown addresses and
    /// unparseable values are skipped with a warning.
    pub fn load_config(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let now = Instant::now();
        for (address, value) in config::load(path)? {
            if !self.params.contains(&address) {
                warn!("Skipping unknown setting {}", address);
                continue;
            }
            if let Err(e) = self.params.set_from_str(&address, &value) {
                warn!("Skipping setting: {}", e);
                continue;
            }
            if address == SHAPER {
                self.process_changes(now)?;
            }
        }
        self.process_changes(now)?;
        // Slider values are final now, no need to wait
        self.scheduler.force(now);
        Ok(())
    }

    /// Input device selected since the last call
    pub fn take_source_change(&mut self) -> Option<i32> {
        self.source_change.take()
    }

    /// Parameter values changed since the last call, for remote mirroring
    pub fn take_changed(&mut self) -> Vec<(String, ParamValue)> {
        self.params.take_changed()
    }

    fn apply_display_params(&mut self) {
        if let Some(mode) = self.params.choice_as::<RenderMode>(RENDER_MODE) {
            self.shaper.set_render_mode(mode);
        }
        let split = self.params.bool(SPLIT).unwrap_or(false);
        self.shaper.set_split_mode(split);
    }

    /// Apply held-back slider updates the active family now has
    fn replay_deferred(&mut self) {
        let deferred = std::mem::take(&mut self.deferred);
        for update in deferred {
            if !self.params.contains(&update.address) {
                self.deferred.push(update);
                continue;
            }
            if let Err(e) = self.params.set(&update.address, update.value) {
                warn!("Ignoring deferred update: {}", e);
            }
        }
    }

    /// Store a selection without triggering another reaction
    fn sync_choice(&mut self, address: &str, key: &str) {
        if self.params.choice(address) != Some(key) {
            if let Err(e) = self.params.set(address, ParamValue::Choice(key.into())) {
                warn!("Failed to record {}: {}", address, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CAM_ZOOM;
    use glam::Vec3;

    fn system() -> SculptureSystem {
        SculptureSystem::new(SpectrumHistory::zeroed(8, 4)).unwrap()
    }

    #[test]
    fn test_starts_with_ring() {
        let system = system();
        assert_eq!(system.shaper_kind(), ShaperKind::Ring);
        assert_eq!(system.shaper().active_surfaces()[0].vertex_count(), 8 * 8);
        assert!(system.params().contains("/shaper/torus_radius"));
        assert!(!system.rebuild_pending());
    }

    #[test]
    fn test_slider_change_is_debounced() {
        let mut system = system();
        let start = Instant::now();

        system
            .apply(ParamUpdate::new("/shaper/torus_radius", ParamValue::Float(300.0)))
            .unwrap();
        system.tick(start).unwrap();
        assert!(system.rebuild_pending());
        // Mesh still uses the old radius
        let before = system.shaper().active_surfaces()[0].vertex(0, 0).unwrap();
        assert!(before.x < 250.0);

        system.tick(start + Duration::from_millis(999)).unwrap();
        assert!(system.rebuild_pending());

        system.tick(start + Duration::from_millis(1000)).unwrap();
        assert!(!system.rebuild_pending());
        let after = system.shaper().active_surfaces()[0].vertex(0, 0).unwrap();
        assert!(after.x > 250.0);
    }

    #[test]
    fn test_shaper_selection_by_parameter() {
        let mut system = system();
        system
            .apply(ParamUpdate::new(SHAPER, ParamValue::Choice("PLANE".into())))
            .unwrap();
        system.tick(Instant::now()).unwrap();

        assert_eq!(system.shaper_kind(), ShaperKind::Plane);
        assert!(!system.params().contains("/shaper/torus_radius"));
        assert!(system.params().contains("/shaper/height_multiplier"));
        assert_eq!(system.shaper().active_surfaces()[0].vertex_count(), 8 * 4);
    }

    #[test]
    fn test_sliders_arrive_with_shaper_change() {
        let mut system = system();
        system
            .apply(ParamUpdate::new(SHAPER, ParamValue::Choice("SPHERE".into())))
            .unwrap();
        system
            .apply(ParamUpdate::new("/shaper/radius", ParamValue::Float(250.0)))
            .unwrap();
        system.tick(Instant::now()).unwrap();

        assert_eq!(system.shaper_kind(), ShaperKind::Sphere);
        assert_eq!(system.params().float("/shaper/radius"), Some(250.0));
        let v = system.shaper().active_surfaces()[0].vertex(0, 0).unwrap();
        assert!((v.length() - 250.0).abs() < 1e-2);
        assert!(!system.rebuild_pending());
    }

    #[test]
    fn test_shared_slider_survives_family_switch() {
        let mut system = system();
        system
            .apply(ParamUpdate::new(SHAPER, ParamValue::Choice("CYLINDER".into())))
            .unwrap();
        system.tick(Instant::now()).unwrap();
        system
            .apply(ParamUpdate::new("/shaper/radius", ParamValue::Float(150.0)))
            .unwrap();
        system
            .apply(ParamUpdate::new("/shaper/multiplier", ParamValue::Float(4.0)))
            .unwrap();
        system.tick(Instant::now()).unwrap();

        // Cylinder and sphere share radius and multiplier
        system
            .apply(ParamUpdate::new(SHAPER, ParamValue::Choice("SPHERE".into())))
            .unwrap();
        system
            .apply(ParamUpdate::new("/shaper/radius", ParamValue::Float(220.0)))
            .unwrap();
        system.tick(Instant::now()).unwrap();

        assert_eq!(system.shaper_kind(), ShaperKind::Sphere);
        assert_eq!(system.params().float("/shaper/radius"), Some(220.0));
        assert_eq!(system.params().float("/shaper/multiplier"), Some(4.0));
    }

    #[test]
    fn test_slider_for_other_family_is_dropped() {
        let mut system = system();
        system
            .apply(ParamUpdate::new("/shaper/height_multiplier", ParamValue::Float(3.0)))
            .unwrap();
        system.tick(Instant::now()).unwrap();
        assert!(!system.params().contains("/shaper/height_multiplier"));
        assert!(!system.rebuild_pending());

        // Not carried over to a later selection
        system
            .apply(ParamUpdate::new(SHAPER, ParamValue::Choice("PLANE".into())))
            .unwrap();
        system.tick(Instant::now()).unwrap();
        assert_eq!(system.params().float("/shaper/height_multiplier"), Some(100.0));
    }

    #[test]
    fn test_failed_selection_keeps_previous_shaper() {
        // One band is enough for a ring but not for a sphere
        let mut system = SculptureSystem::new(SpectrumHistory::zeroed(8, 1)).unwrap();
        system
            .apply(ParamUpdate::new("/shaper/torus_radius", ParamValue::Float(300.0)))
            .unwrap();
        system.tick(Instant::now()).unwrap();
        system.rebuild().unwrap();
        let before = system.shaper().active_surfaces()[0].vertices().to_vec();

        system
            .apply(ParamUpdate::new(SHAPER, ParamValue::Choice("SPHERE".into())))
            .unwrap();
        system
            .apply(ParamUpdate::new(RENDER_MODE, ParamValue::Choice("POINTS".into())))
            .unwrap();
        assert!(system.tick(Instant::now()).is_err());

        assert_eq!(system.shaper_kind(), ShaperKind::Ring);
        assert_eq!(system.params().choice(SHAPER), Some("RING"));
        assert_eq!(system.params().float("/shaper/torus_radius"), Some(300.0));
        assert!(!system.params().contains("/shaper/radius"));
        assert_eq!(system.shaper().active_surfaces()[0].vertices(), &before[..]);
        // The rest of the batch still applied
        assert_eq!(system.shaper().render_mode(), RenderMode::Points);
        // Frames keep flowing into the ring
        system.push_frame(&[0.5]).unwrap();
    }

    #[test]
    fn test_unknown_shaper_is_reverted() {
        let mut system = system();
        system
            .apply(ParamUpdate::new(SHAPER, ParamValue::Choice("DONUT".into())))
            .unwrap();
        system.tick(Instant::now()).unwrap();
        assert_eq!(system.shaper_kind(), ShaperKind::Ring);
        assert_eq!(system.params().choice(SHAPER), Some("RING"));
    }

    #[test]
    fn test_push_frame_respects_recording() {
        let mut system = system();
        system.push_frame(&[1.0; 4]).unwrap();
        assert_eq!(system.history().cursor(), 1);

        system.toggle_recording().unwrap();
        system.push_frame(&[1.0; 4]).unwrap();
        assert_eq!(system.history().cursor(), 1);
        assert_eq!(system.history().row(1), Some(&[0.0; 4][..]));

        assert!(system.toggle_recording().unwrap());
        assert!(system.push_frame(&[1.0; 3]).is_err());
    }

    #[test]
    fn test_tick_uses_cursor_angle() {
        let mut system = system();
        for _ in 0..2 {
            system.push_frame(&[0.5; 4]).unwrap();
        }
        system.tick(Instant::now()).unwrap();
        // cursor 2 of 8 slices
        assert_eq!(system.shaper().base().angle, 90.0);
        assert_eq!(system.shaper().active_surfaces()[0].dirty_count(), 0);
    }

    #[test]
    fn test_audio_source_change_is_reported_once() {
        let mut system = system();
        system.tick(Instant::now()).unwrap();
        assert_eq!(system.take_source_change(), None);

        system
            .apply(ParamUpdate::new(AUDIO_SOURCE, ParamValue::Int(2)))
            .unwrap();
        system.tick(Instant::now()).unwrap();
        assert_eq!(system.take_source_change(), Some(2));
        assert_eq!(system.take_source_change(), None);
    }

    #[test]
    fn test_split_and_mode_toggles() {
        let mut system = system();
        system.toggle_split().unwrap();
        let mode = system.cycle_render_mode().unwrap();
        system.tick(Instant::now()).unwrap();

        let (_, batches) = system.render();
        assert_eq!(batches.len(), 2);
        assert_eq!(mode, RenderMode::Points);
        assert_eq!(system.shaper().render_mode(), RenderMode::Points);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");

        let mut system = system();
        system
            .apply(ParamUpdate::new(SHAPER, ParamValue::Choice("SPHERE".into())))
            .unwrap();
        system.tick(Instant::now()).unwrap();
        system
            .apply(ParamUpdate::new("/shaper/radius", ParamValue::Float(250.0)))
            .unwrap();
        system
            .apply(ParamUpdate::new(CAM_ZOOM, ParamValue::Float(2.0)))
            .unwrap();
        system.save_config(&path).unwrap();

        let mut restored = SculptureSystem::new(SpectrumHistory::zeroed(8, 4)).unwrap();
        restored.load_config(&path).unwrap();
        restored.tick(Instant::now()).unwrap();

        assert_eq!(restored.shaper_kind(), ShaperKind::Sphere);
        assert_eq!(restored.params().float("/shaper/radius"), Some(250.0));
        assert_eq!(restored.params().float(CAM_ZOOM), Some(2.0));
        let v = restored.shaper().active_surfaces()[0].vertex(0, 0).unwrap();
        assert!((v.length() - 250.0).abs() < 1e-2);
    }

    #[test]
    fn test_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let system = system();

        let stl = dir.path().join("ring.stl");
        system.export_stl(&stl).unwrap();
        let text = std::fs::read_to_string(&stl).unwrap();
        assert!(text.starts_with("solid Surface\n"));
        assert_eq!(text.matches("facet normal").count(), 2 * 8 * 8);

        let obj = dir.path().join("ring.obj");
        system.export_obj(&obj).unwrap();
        let text = std::fs::read_to_string(&obj).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 64);

        // OBJ keeps world units
        let first = text
            .lines()
            .find(|l| l.starts_with("v "))
            .and_then(|l| {
                let v: Vec<f32> = l[2..].split(' ').filter_map(|p| p.parse().ok()).collect();
                (v.len() == 3).then(|| Vec3::new(v[0], v[1], v[2]))
            })
            .unwrap();
        assert!(first.x > 100.0);
    }
}
