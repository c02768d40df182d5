//! 简易 CLI 演示：构建演示场景，跑几帧可见性 / 纹理查询，
//! 展示平移、缩放与跨度守卫的效果。

use tracing::{info, warn};

use pixelcanvas_config::AppConfig;
use pixelcanvas_core::geometry::{PixeloidPoint, Vector2};
use pixelcanvas_engine::scene::{CanvasScene, EngineLimits, VisibleObject};
use pixelcanvas_engine::span::ZoomDecision;

use crate::errors::FrontendError;
use crate::raster::SoftwareRasterizer;

pub fn run_demo() -> Result<(), FrontendError> {
    let config = load_app_config();
    let mut scene = CanvasScene::with_limits(EngineLimits {
        max_texture_side: config.engine.max_texture_side,
        visibility_scale_slots: config.engine.visibility_scale_slots,
    });
    scene.set_screen_size(config.frontend.screen_width, config.frontend.screen_height);
    let mut rasterizer = SoftwareRasterizer::new();

    let ids = scene.populate_demo();
    info!(
        object_count = scene.document().object_count(),
        "CLI 演示场景已就绪"
    );

    println!("Pixelcanvas CLI 演示");
    println!(
        "视口: {}x{}，缩放={:.2}，纹理边长上限={}",
        config.frontend.screen_width,
        config.frontend.screen_height,
        scene.viewport().scale,
        scene.texture_cache().max_texture_side()
    );
    if let Some(bounds) = scene.document().bounds() {
        println!(
            "文档范围: min=({}, {}), max=({}, {})",
            bounds.min_x(),
            bounds.min_y(),
            bounds.max_x(),
            bounds.max_y()
        );
    }
    println!("演示对象 ID：");
    println!("  - 点 ID = {}", ids.point.get());
    println!("  - 线段 ID = {}", ids.line.get());
    println!("  - 矩形 ID = {}", ids.rectangle.get());
    println!("  - 圆 ID = {}", ids.circle.get());
    println!("  - 菱形 ID = {}", ids.diamond.get());

    println!();
    println!("== 第 1 帧：初始视口 ==");
    render_frame(&mut scene, &mut rasterizer)?;

    println!();
    println!("== 第 2 帧：向右平移 60 像素格 ==");
    scene.pan(Vector2::new(60.0, 0.0));
    render_frame(&mut scene, &mut rasterizer)?;

    println!();
    println!("== 第 3 帧：缩放到 2.0，纹理按新缩放重新提取 ==");
    scene.pan(Vector2::new(-60.0, 0.0));
    match scene.zoom_to(2.0)? {
        ZoomDecision::Allowed => {}
        ZoomDecision::Blocked { reason } => println!("缩放被拒绝：{reason}"),
    }
    render_frame(&mut scene, &mut rasterizer)?;

    println!();
    println!("== 跨度守卫演示 ==");
    demo_scale_span(&mut scene, &mut rasterizer)?;

    let (hits, misses) = (
        scene.visibility_cache().hits(),
        scene.visibility_cache().misses(),
    );
    println!();
    println!("可见性缓存统计：命中 {hits} 次，未命中 {misses} 次");
    println!("存活纹理数：{}", rasterizer.live_texture_count());

    scene.release_textures(&mut rasterizer);
    println!("会话结束，纹理已全部回收（剩余 {}）", rasterizer.live_texture_count());
    Ok(())
}

fn render_frame(
    scene: &mut CanvasScene,
    rasterizer: &mut SoftwareRasterizer,
) -> Result<(), FrontendError> {
    let frame = scene.visible_objects(rasterizer)?;
    println!(
        "可见对象 {} / {}：",
        frame.len(),
        scene.document().object_count()
    );
    for drawn in &frame {
        describe_visible_object(drawn);
    }
    Ok(())
}

fn describe_visible_object(drawn: &VisibleObject) {
    println!(
        "  - 对象 #{}，纹理 {}x{}，显示区域 x={:.1} y={:.1} w={:.1} h={:.1}，屏幕位置=({:.1}, {:.1})",
        drawn.id.get(),
        drawn.pixel_dimensions.width,
        drawn.pixel_dimensions.height,
        drawn.region.x,
        drawn.region.y,
        drawn.region.width,
        drawn.region.height,
        drawn.screen_position.x(),
        drawn.screen_position.y(),
    );
}

/// 在高缩放下创建对象，演示允许窗口收紧与删除后放宽。
fn demo_scale_span(
    scene: &mut CanvasScene,
    rasterizer: &mut SoftwareRasterizer,
) -> Result<(), FrontendError> {
    if let ZoomDecision::Blocked { reason } = scene.zoom_to(12.0)? {
        warn!(reason = %reason, "演示缩放被拒绝");
        return Ok(());
    }
    let high_scale_object = scene.add_point(PixeloidPoint::new(3, 3));
    print_creation_range(scene);

    match scene.can_zoom_to(17.0)? {
        ZoomDecision::Allowed => println!("缩放到 17.0：允许"),
        ZoomDecision::Blocked { reason } => println!("缩放到 17.0：{reason}"),
    }

    scene
        .remove_object(high_scale_object, rasterizer)
        .unwrap_or_else(|err| warn!(error = %err, "删除演示对象失败"));
    println!("删除高缩放对象后：");
    print_creation_range(scene);
    match scene.can_zoom_to(16.0)? {
        ZoomDecision::Allowed => println!("缩放到 16.0：允许"),
        ZoomDecision::Blocked { reason } => println!("缩放到 16.0：{reason}"),
    }
    Ok(())
}

fn print_creation_range(scene: &CanvasScene) {
    match scene.creation_scale_range() {
        Some((min, max)) => {
            println!("当前创建缩放范围：[{min:.2}, {max:.2}]");
        }
        None => println!("当前没有活跃对象。"),
    }
}

fn load_app_config() -> AppConfig {
    match AppConfig::discover() {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(error = %err, "读取配置失败，使用默认配置");
            AppConfig::default()
        }
    }
}
