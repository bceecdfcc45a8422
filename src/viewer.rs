//! The interactive viewer: owns the atlases, the cursor and the canvas.
//!
//! Navigation goes through [`SpriteViewer::move_to`], which clamps the
//! requested indices, re-derives world coordinates and the sampled value, and
//! redraws only the views whose content changed.

use glam::DVec3;
use image::RgbaImage;
use tracing::{debug, trace, warn};
use web_time::Instant;

use crate::affine::AffineTransform;
use crate::atlas::Atlas;
use crate::colormap::ColorMap;
use crate::compositor::{OverlayLayer, Scene, ViewRender};
use crate::config::{ColorMapConfig, OverlayConfig, ViewerConfig};
use crate::enums::Orientation;
use crate::error::{Result, ViewerError};
use crate::geometry::{Position, VolumeGeometry};
use crate::layout::Layout;
use crate::reconstruct::PlaneReconstructor;
use crate::sampler::VoxelSampler;
use crate::text::{TextPainter, round_half_up};

pub type ChangeListener = Box<dyn FnMut(&PositionChange)>;

/// Handle returned by [`SpriteViewer::add_change_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Cursor before and after a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionChange {
    pub old: Position,
    pub new: Position,
}

/// Requested indices; axes left `None` keep their value. Out-of-range values
/// are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionUpdate {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub z: Option<i64>,
}

impl PositionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_x(mut self, x: i64) -> Self {
        self.x = Some(x);
        self
    }

    pub fn with_y(mut self, y: i64) -> Self {
        self.y = Some(y);
        self
    }

    pub fn with_z(mut self, z: i64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with(mut self, orientation: Orientation, index: i64) -> Self {
        match orientation {
            Orientation::Sagittal => self.x = Some(index),
            Orientation::Coronal => self.y = Some(index),
            Orientation::Axial => self.z = Some(index),
        }
        self
    }

    pub fn get(&self, orientation: Orientation) -> Option<i64> {
        match orientation {
            Orientation::Sagittal => self.x,
            Orientation::Coronal => self.y,
            Orientation::Axial => self.z,
        }
    }
}

/// Views that need a redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyViews([bool; 3]);

impl DirtyViews {
    pub fn none() -> Self {
        Self([false; 3])
    }

    pub fn all() -> Self {
        Self([true; 3])
    }

    pub fn mark(&mut self, orientation: Orientation) {
        self.0[orientation.index()] = true;
    }

    pub fn is_dirty(&self, orientation: Orientation) -> bool {
        self.0[orientation.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|dirty| *dirty)
    }

    pub fn iter(&self) -> impl Iterator<Item = Orientation> + '_ {
        Orientation::ALL
            .into_iter()
            .filter(|orientation| self.is_dirty(*orientation))
    }
}

pub struct SpriteViewerBuilder {
    config: ViewerConfig,
    background: Option<RgbaImage>,
    overlay: Option<(RgbaImage, OverlayConfig)>,
    color_map: Option<(RgbaImage, ColorMapConfig)>,
    painter: Option<Box<dyn TextPainter>>,
    listeners: Vec<ChangeListener>,
}

impl SpriteViewerBuilder {
    pub fn background(mut self, image: RgbaImage) -> Self {
        self.background = Some(image);
        self
    }

    pub fn overlay(mut self, image: RgbaImage, config: OverlayConfig) -> Self {
        self.overlay = Some((image, config));
        self
    }

    pub fn color_map(mut self, image: RgbaImage, config: ColorMapConfig) -> Self {
        self.color_map = Some((image, config));
        self
    }

    pub fn text_painter(mut self, painter: impl TextPainter + 'static) -> Self {
        self.painter = Some(Box::new(painter));
        self
    }

    /// Register a change listener up front.
    pub fn on_move(mut self, listener: impl FnMut(&PositionChange) + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Validate the configuration and attach the atlases.
    ///
    /// # Errors
    ///
    /// Fails without a background, on an atlas whose size does not match its
    /// tile size, and on out-of-range opacity or crosshair size.
    pub fn build(self) -> Result<SpriteViewer> {
        let config = self.config;
        config.validate()?;

        let image = self.background.ok_or(ViewerError::MissingBackground)?;
        let atlas = Atlas::new(image, config.tile.y, config.tile.z, config.depth)?;
        let background = PlaneReconstructor::new(atlas, config.mode);

        let overlay = match self.overlay {
            Some((image, overlay_config)) => {
                overlay_config.validate()?;
                let atlas = Atlas::new(
                    image,
                    overlay_config.tile.y,
                    overlay_config.tile.z,
                    overlay_config.tile.x,
                )?;
                Some(OverlayLayer {
                    planes: PlaneReconstructor::new(atlas, config.mode),
                    opacity: overlay_config.opacity as f32,
                })
            }
            None => None,
        };

        let color_map = self
            .color_map
            .map(|(image, map_config)| ColorMap::from_strip(&image, &map_config))
            .transpose()?;

        let affine = match config.affine {
            Some(rows) => AffineTransform::from_rows(rows),
            None => AffineTransform::from_origin(config.origin, config.voxel_size),
        };

        let geometry = *background.geometry();
        let clamped = |[x, y, z]: [i64; 3]| {
            Position::new(
                geometry.clamp(Orientation::Sagittal, x),
                geometry.clamp(Orientation::Coronal, y),
                geometry.clamp(Orientation::Axial, z),
            )
        };
        let position = match (config.initial_position, config.initial_world) {
            (Some(index), _) => clamped(index),
            (None, Some(world)) => match affine.world_to_voxel(DVec3::from_array(world)) {
                Some(voxel) => clamped(voxel.to_array().map(|v| round_half_up(v) as i64)),
                None => {
                    warn!("Affine is not invertible, starting at the volume center");
                    geometry.center()
                }
            },
            (None, None) => geometry.center(),
        };
        let layout = Layout::compute(
            geometry.slices(),
            config.container_width,
            config.label_margin(),
        );

        let listeners = self
            .listeners
            .into_iter()
            .enumerate()
            .map(|(index, listener)| (ListenerId(index as u64), listener))
            .collect::<Vec<_>>();

        let mut viewer = SpriteViewer {
            config,
            background,
            overlay,
            color_map,
            painter: self.painter,
            affine,
            sampler: VoxelSampler::new(),
            position,
            world: DVec3::ZERO,
            value: f64::NAN,
            layout,
            canvas: None,
            renders: [None, None, None],
            render_counts: [0; 3],
            next_listener: listeners.len() as u64,
            listeners,
            dragging: false,
        };
        viewer.refresh_derived();
        Ok(viewer)
    }
}

/// Three-view slice viewer over a background sprite atlas.
pub struct SpriteViewer {
    config: ViewerConfig,
    background: PlaneReconstructor,
    overlay: Option<OverlayLayer>,
    color_map: Option<ColorMap>,
    painter: Option<Box<dyn TextPainter>>,
    affine: AffineTransform,
    sampler: VoxelSampler,
    position: Position,
    world: DVec3,
    value: f64,
    layout: Layout,
    canvas: Option<RgbaImage>,
    renders: [Option<ViewRender>; 3],
    render_counts: [u64; 3],
    listeners: Vec<(ListenerId, ChangeListener)>,
    next_listener: u64,
    dragging: bool,
}

impl SpriteViewer {
    pub fn builder(config: ViewerConfig) -> SpriteViewerBuilder {
        SpriteViewerBuilder {
            config,
            background: None,
            overlay: None,
            color_map: None,
            painter: None,
            listeners: Vec::new(),
        }
    }

    /// Build lookup atlases if configured and draw every view once.
    pub fn initialize(&mut self) -> Result<()> {
        let start = Instant::now();
        self.background.prepare()?;
        if let Some(overlay) = &mut self.overlay {
            overlay.planes.prepare()?;
        }
        self.canvas = Some(self.blank_canvas());
        self.render_all()?;
        debug!(
            "Initialized {:?} viewer for {:?} in {:?}",
            self.config.mode,
            self.geometry().slices(),
            start.elapsed()
        );
        Ok(())
    }

    fn blank_canvas(&self) -> RgbaImage {
        RgbaImage::from_pixel(
            self.layout.canvas_width(),
            self.layout.canvas_height(),
            self.config.background_color,
        )
    }

    pub fn is_initialized(&self) -> bool {
        self.canvas.is_some()
    }

    /// Redraw all three views onto a fresh canvas.
    pub fn render_all(&mut self) -> Result<()> {
        if self.canvas.is_none() {
            return Err(ViewerError::NotInitialized);
        }
        let canvas = self.blank_canvas();
        self.render_into(canvas, DirtyViews::all())
    }

    fn render_views(&mut self, dirty: DirtyViews) -> Result<()> {
        let canvas = self
            .canvas
            .as_ref()
            .ok_or(ViewerError::NotInitialized)?
            .clone();
        self.render_into(canvas, dirty)
    }

    fn render_into(&mut self, mut canvas: RgbaImage, dirty: DirtyViews) -> Result<()> {
        let start = Instant::now();
        let scene = self.scene();
        let painter = self.painter.as_deref();
        let renders = dirty
            .iter()
            .map(|orientation| scene.render_view(&mut canvas, orientation, painter))
            .collect::<Result<Vec<_>>>()?;

        for render in renders {
            let index = render.orientation.index();
            self.render_counts[index] += 1;
            self.renders[index] = Some(render);
        }
        self.canvas = Some(canvas);
        trace!(?dirty, "Rendered in {:?}", start.elapsed());
        Ok(())
    }

    fn scene(&self) -> Scene<'_> {
        Scene {
            config: &self.config,
            layout: &self.layout,
            background: &self.background,
            overlay: self.overlay.as_ref(),
            color_map: self.color_map.as_ref(),
            position: self.position,
            world: self.world,
            value: self.value,
        }
    }

    fn refresh_derived(&mut self) {
        self.world = self.affine.voxel_to_world(self.position);
        let geometry = *self.background.geometry();
        self.value = self.sampler.sample(
            &geometry,
            self.overlay.as_ref().map(|overlay| overlay.planes.atlas()),
            self.color_map.as_ref(),
            self.position,
        );
    }

    fn dirty_views(&self, old: Position, new: Position, old_world: DVec3) -> DirtyViews {
        if old == new {
            return DirtyViews::none();
        }
        if self.config.crosshair {
            return DirtyViews::all();
        }
        let mut dirty = DirtyViews::none();
        for orientation in Orientation::ALL {
            if old.get(orientation) != new.get(orientation) {
                dirty.mark(orientation);
            }
        }
        if self.config.show_coordinates {
            let changed = [
                old_world.x != self.world.x,
                old_world.y != self.world.y,
                old_world.z != self.world.z,
            ];
            for (orientation, changed) in Orientation::ALL.into_iter().zip(changed) {
                if changed {
                    dirty.mark(orientation);
                }
            }
        }
        if self.config.show_value {
            dirty.mark(Orientation::Sagittal);
        }
        dirty
    }

    /// Move the cursor, redraw the views that changed and notify listeners.
    ///
    /// Before [`initialize`](Self::initialize) only the cursor moves. A move
    /// that clamps onto the current position changes nothing.
    pub fn move_to(&mut self, update: PositionUpdate) -> Result<DirtyViews> {
        let geometry = *self.background.geometry();
        let old = self.position;
        let mut new = old;
        for orientation in Orientation::ALL {
            if let Some(index) = update.get(orientation) {
                new.set(orientation, geometry.clamp(orientation, index));
            }
        }
        if new == old {
            return Ok(DirtyViews::none());
        }

        let old_world = self.world;
        self.position = new;
        self.refresh_derived();
        let dirty = self.dirty_views(old, new, old_world);
        if self.is_initialized() {
            self.render_views(dirty)?;
        }

        let change = PositionChange { old, new };
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
        Ok(dirty)
    }

    /// Lay the views out for a new container width and redraw everything.
    pub fn resize(&mut self, container_width: u32) -> Result<()> {
        self.config.container_width = container_width;
        self.layout = Layout::compute(
            self.geometry().slices(),
            container_width,
            self.config.label_margin(),
        );
        if self.is_initialized() {
            self.render_all()?;
        }
        Ok(())
    }

    /// Navigate to the voxel under canvas point `(x, y)`.
    pub fn pointer(&mut self, x: f64, y: f64) -> Result<DirtyViews> {
        let orientation = self.layout.classify(x);
        let view = self.layout.view(orientation);
        if view.width == 0 || view.height == 0 {
            return Ok(DirtyViews::none());
        }
        let slices = self.geometry().slices();
        let (horizontal, vertical) = orientation.in_plane();
        let width = f64::from(view.width);
        let height = f64::from(view.height);

        let offset_x = x - f64::from(view.left);
        let offset_y = y - f64::from(view.top);
        let column = round_half_up(f64::from(slices.get(horizontal) - 1) * offset_x / width);
        let row = round_half_up(f64::from(slices.get(vertical) - 1) * (height - offset_y) / height);

        self.move_to(
            PositionUpdate::new()
                .with(horizontal, column as i64)
                .with(vertical, row as i64),
        )
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> Result<DirtyViews> {
        self.dragging = true;
        self.pointer(x, y)
    }

    /// Navigate while a drag is in progress, ignored otherwise.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Result<DirtyViews> {
        if !self.dragging {
            return Ok(DirtyViews::none());
        }
        self.pointer(x, y)
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    pub fn add_change_listener(
        &mut self,
        listener: impl FnMut(&PositionChange) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(registered, _)| *registered != id);
        self.listeners.len() != before
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// World coordinates of the cursor.
    pub fn world_coordinates(&self) -> DVec3 {
        self.world
    }

    /// Overlay value under the cursor, NaN when there is none.
    pub fn voxel_value(&self) -> f64 {
        self.value
    }

    /// The composite canvas, `None` before initialization.
    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        self.background.geometry()
    }

    pub fn affine(&self) -> &AffineTransform {
        &self.affine
    }

    /// The current plane of a view at native resolution, with overlay and
    /// crosshair applied.
    pub fn plane(&self, orientation: Orientation) -> Result<RgbaImage> {
        self.scene().plane(orientation)
    }

    /// Last render of a view, `None` until it has been drawn.
    pub fn view_render(&self, orientation: Orientation) -> Option<&ViewRender> {
        self.renders[orientation.index()].as_ref()
    }

    /// Number of times a view has been drawn.
    pub fn render_count(&self, orientation: Orientation) -> u64 {
        self.render_counts[orientation.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SliceCounts;
    use image::Rgba;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// 4 slices of 6x5 in a 2x2 grid.
    fn viewer(config: ViewerConfig) -> SpriteViewer {
        let image = RgbaImage::from_fn(12, 10, |x, y| Rgba([x as u8 * 20, y as u8 * 20, 0, 255]));
        SpriteViewer::builder(config).background(image).build().unwrap()
    }

    #[test]
    fn starts_at_center() {
        let viewer = viewer(ViewerConfig::new(6, 5));
        assert_eq!(viewer.geometry().slices(), SliceCounts::new(4, 6, 5));
        assert_eq!(viewer.position(), Position::new(2, 3, 2));
    }

    #[test]
    fn initial_position_is_clamped() {
        let viewer = viewer(ViewerConfig::new(6, 5).with_initial_position(-3, 100, 1));
        assert_eq!(viewer.position(), Position::new(0, 5, 1));
    }

    #[test]
    fn initial_world_maps_through_inverse_affine() {
        let config = ViewerConfig::new(6, 5)
            .with_origin([10.0, 0.0, 0.0], 1.0)
            .with_initial_world(-8.0, 2.0, 3.0);
        assert_eq!(viewer(config).position(), Position::new(1, 1, 2));

        // far outside the volume clamps like an index
        let config = ViewerConfig::new(6, 5).with_initial_world(-50.0, 50.0, 2.6);
        assert_eq!(viewer(config).position(), Position::new(0, 5, 2));

        let config = ViewerConfig::new(6, 5)
            .with_initial_position(3, 0, 0)
            .with_initial_world(-8.0, 2.0, 3.0);
        assert_eq!(viewer(config).position(), Position::new(3, 0, 0));
    }

    #[test]
    fn initial_world_with_singular_affine_starts_at_center() {
        let config = ViewerConfig::new(6, 5)
            .with_affine([[0.0; 4]; 4])
            .with_initial_world(1.0, 1.0, 1.0);
        assert_eq!(viewer(config).position(), Position::new(2, 3, 2));
    }

    #[test]
    fn missing_background() {
        let result = SpriteViewer::builder(ViewerConfig::new(6, 5)).build();
        assert!(matches!(result, Err(ViewerError::MissingBackground)));
    }

    #[test]
    fn render_requires_initialize() {
        let mut viewer = viewer(ViewerConfig::new(6, 5));
        assert!(matches!(viewer.render_all(), Err(ViewerError::NotInitialized)));
        assert!(viewer.canvas().is_none());
        viewer.initialize().unwrap();
        assert!(viewer.canvas().is_some());
        assert_eq!(viewer.render_count(Orientation::Axial), 1);
    }

    #[test]
    fn only_changed_axis_redraws() {
        let mut viewer = viewer(ViewerConfig::new(6, 5));
        viewer.initialize().unwrap();
        let dirty = viewer.move_to(PositionUpdate::new().with_y(0)).unwrap();
        assert_eq!(dirty.iter().collect::<Vec<_>>(), vec![Orientation::Coronal]);
        assert_eq!(viewer.render_count(Orientation::Sagittal), 1);
        assert_eq!(viewer.render_count(Orientation::Coronal), 2);
    }

    #[test]
    fn crosshair_dirties_every_view() {
        let mut viewer =
            viewer(ViewerConfig::new(6, 5).with_crosshair(Rgba([0, 0, 255, 255]), 1.0));
        viewer.initialize().unwrap();
        let dirty = viewer.move_to(PositionUpdate::new().with_z(0)).unwrap();
        assert_eq!(dirty, DirtyViews::all());
    }

    #[test]
    fn value_display_dirties_sagittal() {
        let mut viewer = viewer(ViewerConfig::new(6, 5).with_value(true));
        viewer.initialize().unwrap();
        let dirty = viewer.move_to(PositionUpdate::new().with_z(0)).unwrap();
        assert!(dirty.is_dirty(Orientation::Sagittal));
        assert!(dirty.is_dirty(Orientation::Axial));
        assert!(!dirty.is_dirty(Orientation::Coronal));
    }

    #[test]
    fn listeners_see_old_and_new() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut viewer = viewer(ViewerConfig::new(6, 5));
        let id = viewer.add_change_listener(move |change| sink.borrow_mut().push(*change));

        viewer.move_to(PositionUpdate::new().with_x(0)).unwrap();
        viewer.move_to(PositionUpdate::new().with_x(0)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![PositionChange {
                old: Position::new(2, 3, 2),
                new: Position::new(0, 3, 2),
            }]
        );

        assert!(viewer.remove_change_listener(id));
        assert!(!viewer.remove_change_listener(id));
        viewer.move_to(PositionUpdate::new().with_x(3)).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn drag_only_while_pressed() {
        let mut viewer = viewer(ViewerConfig::new(6, 5).with_container_width(140));
        viewer.initialize().unwrap();
        let before = viewer.position();
        assert!(viewer.pointer_move(5.0, 5.0).unwrap().is_empty());
        assert_eq!(viewer.position(), before);

        viewer.pointer_down(0.0, 0.0).unwrap();
        viewer.pointer_up();
        let after_click = viewer.position();
        assert!(viewer.pointer_move(60.0, 5.0).unwrap().is_empty());
        assert_eq!(viewer.position(), after_click);
    }
}
