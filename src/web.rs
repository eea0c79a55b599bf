//! Browser front end: canvas presenter, keyboard and pointer wiring, Web
//! Audio beeps and the `requestAnimationFrame` loop.

use std::cell::{Cell, RefCell};
use std::io;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, window, AudioContext, HtmlCanvasElement, OscillatorType};

use crate::config::Difficulty;
use crate::events::{EventSink, GameEvent};
use crate::game::{Game, TickOutcome};
use crate::graphics::Graphics;
use crate::input::{FrameInput, KeyEdges};
use crate::render::Renderer;
use crate::texture::TextureTable;

const CANVAS_ID: &str = "game-canvas";
const KEY_ESCAPE: u32 = 27;

type LoopClosure = RefCell<Option<Closure<dyn FnMut(f64)>>>;
type ResizeClosure = RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>>;

thread_local! {
    static GAME: RefCell<Option<Game>> = const { RefCell::new(None) };
    static GFX: RefCell<Option<Graphics>> = const { RefCell::new(None) };
    static RENDERER: RefCell<Option<Renderer>> = const { RefCell::new(None) };
    static TEXTURES: RefCell<Option<TextureTable>> = const { RefCell::new(None) };
    static LOOP: LoopClosure = const { RefCell::new(None) };
    static RESIZE_CB: ResizeClosure = const { RefCell::new(None) };
    static KEYS: RefCell<[bool; 256]> = const { RefCell::new([false; 256]) };
    static KEY_EDGES: RefCell<KeyEdges> = RefCell::new(KeyEdges::new());
    static MOUSE_DELTA: Cell<(f64, f64)> = const { Cell::new((0.0, 0.0)) };
    static MOUSE_CLICKED: Cell<bool> = const { Cell::new(false) };
    static ZOOM_BUTTON: Cell<bool> = const { Cell::new(false) };
    static LISTENERS_INSTALLED: Cell<bool> = const { Cell::new(false) };
    static STOPPING: Cell<bool> = const { Cell::new(false) };
    static AUDIO_CTX: RefCell<Option<AudioContext>> = const { RefCell::new(None) };
}

/// Line-buffered writer onto the browser console
#[derive(Default)]
struct ConsoleWriter(Vec<u8>);

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if !self.0.is_empty() {
            let line = String::from_utf8_lossy(&self.0);
            console::log_1(&JsValue::from_str(line.trim_end()));
        }
    }
}

/// Install the console subscriber; later calls are no-ops
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_writer(ConsoleWriter::default)
        .with_max_level(tracing::Level::DEBUG)
        .without_time()
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

// Simple sound synthesis using Web Audio API
fn play_sound(frequency: f64, duration: f64) {
    AUDIO_CTX.with(|ctx_cell| {
        if ctx_cell.borrow().is_none() {
            if let Ok(audio_ctx) = AudioContext::new() {
                *ctx_cell.borrow_mut() = Some(audio_ctx);
            }
        }

        if let Some(ctx) = ctx_cell.borrow().as_ref() {
            let (Ok(oscillator), Ok(gain)) = (ctx.create_oscillator(), ctx.create_gain()) else {
                return;
            };
            oscillator.set_type(OscillatorType::Square);
            oscillator.frequency().set_value(frequency as f32);
            oscillator.connect_with_audio_node(&gain).ok();
            gain.connect_with_audio_node(&ctx.destination()).ok();
            gain.gain().set_value(0.1);

            let now = ctx.current_time();
            oscillator.start_with_when(now).ok();
            oscillator.stop_with_when(now + duration).ok();
        }
    });
}

/// Turns simulation events into beeps and notes reload requests so the
/// loop can arm a completion timer
#[derive(Default)]
struct WebAudioSink {
    reload_started: bool,
}

impl EventSink for WebAudioSink {
    fn emit(&mut self, event: GameEvent) {
        let (frequency, duration) = match event {
            GameEvent::Shoot => (220.0, 0.08),
            GameEvent::DryFire => (90.0, 0.05),
            GameEvent::Reload => {
                self.reload_started = true;
                (330.0, 0.06)
            }
            GameEvent::ReloadComplete { .. } => (520.0, 0.06),
            GameEvent::Hit { headshot: false } => (660.0, 0.04),
            GameEvent::Hit { headshot: true } | GameEvent::Kill { headshot: true } => (990.0, 0.1),
            GameEvent::Kill { headshot: false } => (120.0, 0.2),
            GameEvent::DamageTaken { .. } => (70.0, 0.15),
            GameEvent::Heal { .. } => (780.0, 0.1),
            GameEvent::Pickup { .. } => (880.0, 0.05),
            GameEvent::Footstep => (55.0, 0.03),
            GameEvent::PlayerDied => (40.0, 0.6),
        };
        play_sound(frequency, duration);
    }
}

fn performance_now() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

fn window_size() -> Result<(u32, u32), JsValue> {
    let w = window().ok_or("No window")?;
    let width = w.inner_width()?.as_f64().unwrap_or(640.0) * 0.95;
    let height = w.inner_height()?.as_f64().unwrap_or(400.0) * 0.90;
    Ok((width.max(1.0) as u32, height.max(1.0) as u32))
}

/// Fire-and-forget reload completion. The session check inside the game
/// makes a timer that outlives a restart harmless.
fn schedule_reload_timer(session: u64, delay_ms: f64) {
    let Some(w) = window() else {
        return;
    };
    let cb = Closure::once_into_js(move || {
        GAME.with(|g| {
            if let Some(ref mut game) = *g.borrow_mut() {
                game.on_reload_timer(session, performance_now(), &mut WebAudioSink::default());
            }
        });
    });
    let _ = w.set_timeout_with_callback_and_timeout_and_arguments_0(
        cb.unchecked_ref(),
        delay_ms.ceil() as i32,
    );
}

fn update_canvas_size() {
    let Ok((width, height)) = window_size() else {
        return;
    };
    GFX.with(|gfx| {
        if let Some(ref mut g) = *gfx.borrow_mut() {
            let _ = g.resize(width, height);
        }
    });
    GAME.with(|g| {
        if let Some(ref mut game) = *g.borrow_mut() {
            game.set_viewport(width, height);
        }
    });
}

fn install_resize_listener() -> Result<(), JsValue> {
    RESIZE_CB.with(|rcb| {
        if rcb.borrow().is_some() {
            return Ok(());
        }
        let cb = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(|_e: web_sys::Event| {
            let gfx_present = GFX.with(|g| g.borrow().is_some());
            if gfx_present {
                update_canvas_size();
            }
        }));
        window()
            .ok_or("No window")?
            .add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())?;
        *rcb.borrow_mut() = Some(cb);
        Ok(())
    })
}

fn uninstall_resize_listener() {
    RESIZE_CB.with(|rcb| {
        if let (Some(cb), Some(w)) = (rcb.borrow().as_ref(), window()) {
            let _ = w.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
        }
        *rcb.borrow_mut() = None;
    });
}

fn install_mouse_look(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let move_cb = Closure::<dyn FnMut(web_sys::MouseEvent)>::wrap(Box::new(
        |evt: web_sys::MouseEvent| {
            let (dx, dy) = (evt.movement_x() as f64, evt.movement_y() as f64);
            MOUSE_DELTA.with(|md| {
                let (x, y) = md.get();
                md.set((x + dx, y + dy));
            });
        },
    ));
    canvas.add_event_listener_with_callback("mousemove", move_cb.as_ref().unchecked_ref())?;
    move_cb.forget();

    let down_cb = Closure::<dyn FnMut(web_sys::MouseEvent)>::wrap(Box::new(
        |evt: web_sys::MouseEvent| match evt.button() {
            0 => MOUSE_CLICKED.with(|mc| mc.set(true)),
            2 => ZOOM_BUTTON.with(|z| z.set(true)),
            _ => {}
        },
    ));
    canvas.add_event_listener_with_callback("mousedown", down_cb.as_ref().unchecked_ref())?;
    down_cb.forget();

    let up_cb = Closure::<dyn FnMut(web_sys::MouseEvent)>::wrap(Box::new(
        |evt: web_sys::MouseEvent| {
            if evt.button() == 2 {
                ZOOM_BUTTON.with(|z| z.set(false));
            }
        },
    ));
    canvas.add_event_listener_with_callback("mouseup", up_cb.as_ref().unchecked_ref())?;
    up_cb.forget();

    let lock_cb = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(|_e: web_sys::Event| {
        if let Some(canvas) = window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(CANVAS_ID))
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        {
            canvas.request_pointer_lock();
        }
    }));
    canvas.add_event_listener_with_callback("click", lock_cb.as_ref().unchecked_ref())?;
    lock_cb.forget();
    Ok(())
}

fn install_key_listeners() -> Result<(), JsValue> {
    let w = window().ok_or("No window")?;
    let keydown = Closure::<dyn FnMut(_)>::wrap(Box::new(|e: web_sys::KeyboardEvent| {
        let code = e.key_code();
        if code == KEY_ESCAPE && !e.repeat() {
            GAME.with(|g| {
                if let Some(ref mut game) = *g.borrow_mut() {
                    let paused = !game.is_paused();
                    game.set_paused(paused);
                }
            });
        }
        KEYS.with(|k| {
            if let Some(slot) = k.borrow_mut().get_mut(code as usize) {
                *slot = true;
            }
        });
    }));
    let keyup = Closure::<dyn FnMut(_)>::wrap(Box::new(|e: web_sys::KeyboardEvent| {
        KEYS.with(|k| {
            if let Some(slot) = k.borrow_mut().get_mut(e.key_code() as usize) {
                *slot = false;
            }
        });
    }));
    w.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
    w.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
    keydown.forget();
    keyup.forget();
    Ok(())
}

/// Drain the accumulated pointer and click state into one frame of input
fn take_input() -> FrameInput {
    let look = MOUSE_DELTA.with(|md| md.replace((0.0, 0.0)));
    let clicked = MOUSE_CLICKED.with(|mc| mc.replace(false));
    let zoom = ZOOM_BUTTON.with(|z| z.get());
    KEYS.with(|k| KEY_EDGES.with(|e| e.borrow_mut().frame(&k.borrow(), look, clicked, zoom)))
}

fn frame(now: f64) {
    let input = take_input();
    let mut sink = WebAudioSink::default();

    let tick = GAME.with(|g| {
        g.borrow_mut().as_mut().map(|game| {
            let outcome = game.tick(now, &input, &mut sink);
            (outcome, game.session(), game.config().weapon.reload_ms)
        })
    });
    let Some((outcome, session, reload_ms)) = tick else {
        return;
    };
    if sink.reload_started {
        schedule_reload_timer(session, reload_ms);
    }
    if outcome == TickOutcome::PlayerDead && input.fire {
        GAME.with(|g| {
            if let Some(ref mut game) = *g.borrow_mut() {
                game.restart();
            }
        });
    }

    GAME.with(|g| {
        let Some(ref game) = *g.borrow() else {
            return;
        };
        GFX.with(|gfx| {
            let Some(ref mut graphics) = *gfx.borrow_mut() else {
                return;
            };
            RENDERER.with(|r| {
                TEXTURES.with(|t| {
                    if let (Some(renderer), Some(textures)) = (r.borrow().as_ref(), t.borrow().as_ref()) {
                        renderer.render(game.world(), textures, graphics.buffer_mut());
                    }
                });
            });
            if let Err(err) = graphics.present() {
                console::error_1(&err);
            }
        });
    });
}

fn start_loop() -> Result<(), JsValue> {
    LOOP.with(|l| {
        if l.borrow().is_some() {
            return Ok(());
        }

        let closure = Closure::wrap(Box::new(move |ts: f64| {
            if STOPPING.with(|s| s.get()) || GAME.with(|g| g.borrow().is_none()) {
                return;
            }

            frame(ts);

            LOOP.with(|l2| {
                if let (Some(cb), Some(w)) = (l2.borrow().as_ref(), window()) {
                    let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
                }
            });
        }) as Box<dyn FnMut(f64)>);

        window()
            .ok_or("No window")?
            .request_animation_frame(closure.as_ref().unchecked_ref())?;
        *l.borrow_mut() = Some(closure);
        Ok(())
    })
}

#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    start_game_with_difficulty(1)
}

#[wasm_bindgen]
pub fn start_game_with_difficulty(diff: u8) -> Result<(), JsValue> {
    init_logging();
    let difficulty = Difficulty::from_index(diff);
    let (width, height) = window_size()?;

    if !LISTENERS_INSTALLED.with(|l| l.replace(true)) {
        install_key_listeners()?;
    }

    if GFX.with(|gfx| gfx.borrow().is_none()) {
        let graphics = Graphics::new(CANVAS_ID, width, height)?;
        let canvas = window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(CANVAS_ID))
            .ok_or("Canvas not found")?
            .dyn_into::<HtmlCanvasElement>()?;
        install_mouse_look(&canvas)?;
        GFX.with(|gfx| *gfx.borrow_mut() = Some(graphics));
    }
    TEXTURES.with(|t| {
        if t.borrow().is_none() {
            *t.borrow_mut() = Some(TextureTable::procedural());
        }
    });

    let seed = js_sys::Date::now() as u64;
    let mut game = Game::arena(difficulty, seed);
    game.set_viewport(width, height);
    RENDERER.with(|r| *r.borrow_mut() = Some(Renderer::new(game.config().render.clone())));
    GAME.with(|gm| *gm.borrow_mut() = Some(game));

    update_canvas_size();
    install_resize_listener()?;
    start_loop()
}

#[wasm_bindgen]
pub fn stop_game() {
    STOPPING.with(|s| s.set(true));
    LOOP.with(|l| {
        *l.borrow_mut() = None;
    });
    uninstall_resize_listener();

    GAME.with(|gm| {
        *gm.borrow_mut() = None;
    });
    GFX.with(|gfx| {
        *gfx.borrow_mut() = None;
    });

    KEYS.with(|k| k.borrow_mut().fill(false));
    KEY_EDGES.with(|e| e.borrow_mut().reset());
    MOUSE_DELTA.with(|md| md.set((0.0, 0.0)));
    MOUSE_CLICKED.with(|mc| mc.set(false));
    ZOOM_BUTTON.with(|z| z.set(false));
    STOPPING.with(|s| s.set(false));
}

#[wasm_bindgen]
pub fn set_paused(paused: bool) {
    GAME.with(|g| {
        if let Some(ref mut game) = *g.borrow_mut() {
            game.set_paused(paused);
        }
    });
}

#[wasm_bindgen]
pub fn restart_game() {
    GAME.with(|g| {
        if let Some(ref mut game) = *g.borrow_mut() {
            game.restart();
        }
    });
}

/// Session summary as JSON, empty object when no game is running
#[wasm_bindgen]
pub fn game_snapshot() -> String {
    GAME.with(|g| {
        g.borrow()
            .as_ref()
            .and_then(|game| serde_json::to_string(&game.snapshot()).ok())
            .unwrap_or_else(|| "{}".to_string())
    })
}
