/*
MIT License

Copyright (c) 2021, 2022, 2024, 2025 Vincent Hiribarren

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

use log::{error, info};
use pollster::FutureExt;
use std::env;
use std::process::ExitCode;

use crate::config::DemoConfig;
use crate::draw_context::{Dimensions, DrawContext};
use crate::error::InitError;
use crate::interaction::InteractionLoop;
use crate::platform::{Key, PlatformEvent, PlatformInput};
use crate::render_loop::{QuadRenderer, Renderer};
use crate::window::run_event_loop;

const GLOBAL_LOG_FILTER: log::LevelFilter = log::LevelFilter::Info;
const ENV_HEADLESS: &str = "HEADLESS";

/// Runs the demo until the window is closed. Any setup failure yields exit
/// code 1.
#[must_use]
pub fn launch_app() -> ExitCode {
    init_log();
    info!("Init app");
    let config = DemoConfig::default();
    let result = if env::var(ENV_HEADLESS).is_ok() {
        info!("Running in headless mode");
        run_headless(&config)
    } else {
        run_event_loop(config)
    };
    match result {
        Ok(()) => {
            info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_log() {
    use fern::colors::{Color, ColoredLevelConfig};
    let colors = ColoredLevelConfig::new()
        .info(Color::Blue)
        .debug(Color::Green);
    let applied = fern::Dispatch::new()
        .level(GLOBAL_LOG_FILTER)
        .level_for(env!("CARGO_CRATE_NAME"), log::LevelFilter::Debug)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}:{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                colors.color(record.level()),
                record.target(),
                record.line().unwrap_or_default(),
                message
            ));
        })
        .chain(std::io::stdout())
        .apply();
    if let Err(err) = applied {
        eprintln!("Logger already initialized: {err}");
    }
}

// Offscreen replay of a short interaction, for environments without a display.
fn run_headless(config: &DemoConfig) -> anyhow::Result<()> {
    let dimensions = config.initial_dimensions();
    let draw_context = DrawContext::new(None, dimensions)
        .block_on()
        .map_err(InitError::render)?;
    let mut renderer = QuadRenderer::new(draw_context);
    let mut interaction = InteractionLoop::new(config, dimensions, renderer.homogeneous_depth());
    interaction.start(&mut renderer);

    let mut input = PlatformInput::default();
    input.push(PlatformEvent::KeyDown(Key::D));
    input.push(PlatformEvent::KeyDown(Key::D));
    interaction.tick(&mut input, &mut renderer)?;

    input.accumulate_mouse_motion(100.0, -50.0);
    interaction.tick(&mut input, &mut renderer)?;

    input.push(PlatformEvent::Resized(Dimensions {
        width: 640,
        height: 360,
    }));
    input.push(PlatformEvent::Quit);
    while interaction.is_running() {
        interaction.tick(&mut input, &mut renderer)?;
    }

    let camera = interaction.camera();
    info!(
        "Headless session done: eye {:?}, target {:?}, viewport {:?}",
        camera.eye,
        camera.center,
        interaction.viewport()
    );
    Ok(())
}
