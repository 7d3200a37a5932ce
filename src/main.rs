mod gfx;
mod midi;
mod model;
mod osc;
mod renderer;

use gfx::ScreenDraw;
use macroquad::prelude::*;
use midi::MidiInputManager;
use model::Mpd218Model;
use osc::OscListener;
use renderer::Renderer;
use tokio::runtime::Runtime;

const SCREEN_WIDTH: f32 = 1280.0;
const SCREEN_HEIGHT: f32 = 720.0;
const OSC_PORT: u16 = 9000;
const MIDI_PORT_KEYWORD: &str = "MPD218";

const BACKGROUND: Color = Color {
    r: 0.02,
    g: 0.02,
    b: 0.02,
    a: 1.0,
};
const STATUS_COLOR: Color = Color {
    r: 0.6,
    g: 0.6,
    b: 0.6,
    a: 0.8,
};

#[macroquad::main(window_conf)]
async fn main() {
    let runtime = Runtime::new().expect("tokio runtime");

    let mut midi = MidiInputManager::new();
    match midi.connect_matching(MIDI_PORT_KEYWORD) {
        Ok(port) => info!("MIDI input connected: {}", port),
        Err(err) => warn!("MIDI input unavailable: {:#}", err),
    }

    let osc = match OscListener::bind(&runtime, OSC_PORT) {
        Ok(listener) => {
            info!("OSC trigger listener on port {}", OSC_PORT);
            Some(listener)
        }
        Err(err) => {
            warn!("OSC listener unavailable: {:#}", err);
            None
        }
    };

    let mut model = Mpd218Model::default();
    let mut renderer = Renderer::new();
    let mut draw = ScreenDraw::new();
    let mut show_debug_layers = false;

    loop {
        let dt = f64::from(get_frame_time());

        for event in midi.poll_events() {
            model.apply(event);
        }
        if let Some(listener) = &osc {
            for (param, val1, val2) in listener.poll() {
                renderer.ingest_osc_message(param, val1, val2);
            }
        }
        if is_key_pressed(KeyCode::Tab) {
            show_debug_layers = !show_debug_layers;
        }

        renderer.set_viewport(screen_width(), screen_height());
        clear_background(BACKGROUND);
        renderer.render(dt, &model, &mut draw);
        if show_debug_layers {
            renderer.render_simple_hexagon(&model, &mut draw);
            renderer.render_bars(&model, &mut draw);
        }
        draw_status(&midi, osc.as_ref());

        next_frame().await;
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Hexpad".into(),
        fullscreen: false,
        sample_count: 1,
        window_width: SCREEN_WIDTH as i32,
        window_height: SCREEN_HEIGHT as i32,
        high_dpi: false,
        ..Default::default()
    }
}

fn draw_status(midi: &MidiInputManager, osc: Option<&OscListener>) {
    let midi_line = match midi.port_name() {
        Some(name) => format!("MIDI {name}"),
        None => "MIDI -".to_string(),
    };
    let osc_line = match osc {
        Some(listener) => format!("OSC :{}", listener.port()),
        None => "OSC -".to_string(),
    };
    let text = format!("{midi_line}   {osc_line}   TAB debug");
    draw_text_ex(
        &text,
        12.0,
        screen_height() - 12.0,
        TextParams {
            font_size: 16,
            color: STATUS_COLOR,
            ..Default::default()
        },
    );
}
