use std::path::Path;
use std::sync::Arc;

use splashcursor::analysis::FieldMetrics;
use splashcursor::{FluidEffect, SimulationConfig};
use winit::{
    event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "test" {
        // Run headless and export capture PNGs
        run_headless_test()
    } else {
        run_windowed()
    }
}

fn run_headless_test() -> Result<(), Box<dyn std::error::Error>> {
    println!("Running headless splash simulation with quantitative analysis...");

    let config = SimulationConfig {
        sim_resolution: 128,
        dye_resolution: 512,
        ..Default::default()
    };
    let mut effect = pollster::block_on(FluidEffect::headless(512, 512, config))?;

    // Seed the fields the way the on-screen effect does at startup.
    effect.multiple_splats(8);

    for frame in 1..=60 {
        effect.advance(1.0 / 60.0);

        if frame % 15 == 0 {
            let velocity = pollster::block_on(effect.read_velocity())?;
            let dye = pollster::block_on(effect.read_dye())?;
            let (w, h) = effect.sim_size();
            FieldMetrics::analyze(&velocity, &dye, w as usize, h as usize, frame).print_summary();

            let image = pollster::block_on(effect.capture_frame())?;
            let path = format!("splash_frame_{frame:04}.png");
            image.save(Path::new(&path))?;
            println!("wrote {path}");
        }
    }

    println!("Test completed.");
    Ok(())
}

fn run_windowed() -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;
    #[allow(deprecated)]
    let window = Arc::new(
        event_loop.create_window(
            winit::window::WindowAttributes::default()
                .with_title("splashcursor")
                .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720)),
        )?,
    );

    let size = window.inner_size();
    let mut effect = pollster::block_on(FluidEffect::new(
        window.clone(),
        size.width,
        size.height,
        SimulationConfig::default(),
    ))?;
    let mut cursor: Option<(f32, f32)> = None;

    #[allow(deprecated)]
    event_loop.run(move |event, control_flow| match event {
        Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => control_flow.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => control_flow.exit(),
            WindowEvent::CursorMoved { position, .. } => {
                // winit reports physical (device) pixels, which is what the
                // effect expects.
                cursor = Some((position.x as f32, position.y as f32));
                effect.pointer_move(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    if let Some((x, y)) = cursor {
                        effect.pointer_down(x, y);
                    }
                }
                ElementState::Released => effect.pointer_up(),
            },
            WindowEvent::Resized(size) => effect.resize_surface(size.width, size.height),
            WindowEvent::RedrawRequested => effect.update(),
            _ => {}
        },
        Event::AboutToWait => window.request_redraw(),
        _ => {}
    })?;

    Ok(())
}
