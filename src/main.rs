use image::Rgba;
use ndarray::Array3;
use sprite_volume::{
    ColorMapConfig, OverlayConfig, PositionUpdate, SpritePacker, SpriteViewer, ViewerConfig,
};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Ellipsoid phantom with a brighter core
    let (nx, ny, nz) = (40usize, 48usize, 40usize);
    let volume = Array3::from_shape_fn((nx, ny, nz), |(x, y, z)| {
        let dx = (x as f32 - nx as f32 / 2.0) / (nx as f32 / 2.2);
        let dy = (y as f32 - ny as f32 / 2.0) / (ny as f32 / 2.2);
        let dz = (z as f32 - nz as f32 / 2.0) / (nz as f32 / 2.2);
        let r = (dx * dx + dy * dy + dz * dz).sqrt();
        if r > 1.0 { 0u8 } else { (255.0 * (1.0 - 0.6 * r)) as u8 }
    });
    let background = SpritePacker::pack(volume.view()).expect("should have packed background");

    let hot = |value: u8| {
        if value < 200 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([255, (value - 200) * 4, 0, 255])
        }
    };
    let overlay = SpritePacker::pack_with(volume.view(), hot).expect("should have packed overlay");
    let strip = SpritePacker::color_strip(56, |t| Rgba([255, (t * 220.0).round() as u8, 0, 255]))
        .expect("should have built color strip");

    let config = ViewerConfig::new(ny as u32, nz as u32)
        .with_depth(nx as u32)
        .with_coordinates(true)
        .with_value(true)
        .with_crosshair(Rgba([0, 0, 255, 255]), 0.9)
        .with_lr_labels(false)
        .with_title("phantom");
    let mut viewer = SpriteViewer::builder(config)
        .background(background.image().clone())
        .overlay(
            overlay.image().clone(),
            OverlayConfig::new(ny as u32, nz as u32)
                .with_depth(nx as u32)
                .with_opacity(0.6),
        )
        .color_map(
            strip,
            ColorMapConfig {
                min: 200.0,
                max: 255.0,
                hide: false,
            },
        )
        .on_move(|change| tracing::info!("Moved from {:?} to {:?}", change.old, change.new))
        .build()
        .expect("should have built viewer");

    viewer.initialize().expect("should have rendered views");
    viewer
        .move_to(PositionUpdate::new().with_x(nx as i64 / 2 - 3))
        .expect("should have moved cursor");
    tracing::info!("Value under cursor: {}", viewer.voxel_value());

    if let Some(canvas) = viewer.canvas() {
        canvas.save("result.png").expect("should have written result.png");
    }
}
