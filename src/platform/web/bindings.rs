//! JavaScript entry points
//!
//! `mount` builds a `DomHost` inside the given element, wires pointer and
//! keyboard input plus an intersection observer, and drives the engine from
//! `requestAnimationFrame` until the handle is destroyed.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Event, EventTarget, HtmlCanvasElement, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, KeyboardEvent, PointerEvent,
};

use super::presenter::Presenter;
use super::{DomHost, element_viewport};
use crate::config::MountOptions;
use crate::consts::FRAME_DT_MS;
use crate::error::MountError;
use crate::lifecycle::{CityHandle, mount};
use crate::scene::PointerId;

/// Install the panic hook and console logger. Safe to call more than once.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::debug_1(&"logger already installed".into());
    }
}

type Listener = Closure<dyn FnMut(Event)>;
type ObserverCallback = Closure<dyn FnMut(js_sys::Array)>;

/// Page-level input wiring owned by one mount
#[derive(Default)]
struct PageBindings {
    listeners: Vec<(EventTarget, &'static str, Listener)>,
    observer: Option<(IntersectionObserver, ObserverCallback)>,
}

impl PageBindings {
    fn listen<E: JsCast + 'static>(
        &mut self,
        target: &EventTarget,
        name: &'static str,
        mut f: impl FnMut(E) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Listener::new(move |event: Event| {
            if let Ok(event) = event.dyn_into::<E>() {
                f(event);
            }
        });
        target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        self.listeners.push((target.clone(), name, closure));
        Ok(())
    }

    fn unbind(&mut self) {
        for (target, name, closure) in self.listeners.drain(..) {
            let _ = target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        }
        if let Some((observer, _callback)) = self.observer.take() {
            observer.disconnect();
        }
    }
}

/// Also covers a `bind_page` that fails halfway
impl Drop for PageBindings {
    fn drop(&mut self) {
        self.unbind();
    }
}

/// Canvas-space position of a pointer event
fn pointer_position(canvas: &HtmlCanvasElement, event: &PointerEvent) -> Vec2 {
    let rect = canvas.get_bounding_client_rect();
    let sx = if rect.width() > 0.0 {
        canvas.width() as f64 / rect.width()
    } else {
        1.0
    };
    let sy = if rect.height() > 0.0 {
        canvas.height() as f64 / rect.height()
    } else {
        1.0
    };
    Vec2::new(
        ((event.client_x() as f64 - rect.left()) * sx) as f32,
        ((event.client_y() as f64 - rect.top()) * sy) as f32,
    )
}

fn pointer_id(event: &PointerEvent) -> PointerId {
    PointerId::from_raw(Some(event.pointer_id()))
}

fn bind_page(
    handle: &CityHandle<DomHost>,
    canvas: &HtmlCanvasElement,
    container: &HtmlElement,
) -> Result<PageBindings, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let window_target: EventTarget = window.into();
    let canvas_target: EventTarget = canvas.clone().into();
    let mut bindings = PageBindings::default();

    // Pointer presses and drags land on the canvas
    {
        let weak = handle.downgrade();
        let canvas = canvas.clone();
        bindings.listen(&canvas_target, "pointerdown", move |event: PointerEvent| {
            if let Some(handle) = weak.upgrade() {
                handle.pointer_down(pointer_id(&event), pointer_position(&canvas, &event));
            }
        })?;
    }
    {
        let weak = handle.downgrade();
        let canvas = canvas.clone();
        bindings.listen(&canvas_target, "pointermove", move |event: PointerEvent| {
            if let Some(handle) = weak.upgrade() {
                handle.pointer_move(
                    pointer_id(&event),
                    pointer_position(&canvas, &event),
                    event.buttons() != 0,
                );
            }
        })?;
    }
    {
        let weak = handle.downgrade();
        bindings.listen(&canvas_target, "pointerleave", move |event: PointerEvent| {
            if let Some(handle) = weak.upgrade() {
                handle.pointer_leave(pointer_id(&event));
            }
        })?;
    }

    // Releases are caught page-wide so a press never sticks
    {
        let weak = handle.downgrade();
        bindings.listen(&window_target, "pointerup", move |event: PointerEvent| {
            if let Some(handle) = weak.upgrade() {
                handle.pointer_up(pointer_id(&event));
            }
        })?;
    }
    {
        let weak = handle.downgrade();
        bindings.listen(&window_target, "pointercancel", move |event: PointerEvent| {
            if let Some(handle) = weak.upgrade() {
                handle.pointer_cancel(pointer_id(&event));
            }
        })?;
    }

    // Keyboard
    {
        let weak = handle.downgrade();
        bindings.listen(&window_target, "keydown", move |event: KeyboardEvent| {
            if let Some(handle) = weak.upgrade() {
                if handle.key_down(&event.code()) {
                    event.prevent_default();
                }
            }
        })?;
    }
    {
        let weak = handle.downgrade();
        bindings.listen(&window_target, "keyup", move |event: KeyboardEvent| {
            if let Some(handle) = weak.upgrade() {
                handle.key_up(&event.code());
            }
        })?;
    }

    // Scrolled out of view: pause
    {
        let weak = handle.downgrade();
        let callback = ObserverCallback::new(move |entries: js_sys::Array| {
            let visible = entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                .last()
                .map(|entry| entry.is_intersecting());
            if let (Some(visible), Some(handle)) = (visible, weak.upgrade()) {
                handle.viewport_visibility_changed(visible);
            }
        });
        match IntersectionObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => {
                observer.observe(container);
                bindings.observer = Some((observer, callback));
            }
            Err(err) => log::warn!("no IntersectionObserver, visibility pausing disabled: {err:?}"),
        }
    }

    Ok(bindings)
}

/// Per-mount render loop state
struct FrameLoop {
    handle: CityHandle<DomHost>,
    presenter: Presenter,
    canvas: HtmlCanvasElement,
    bindings: Rc<RefCell<PageBindings>>,
    last_time: Option<f64>,
}

impl FrameLoop {
    fn draw(&self) -> Result<(), JsValue> {
        let size = Vec2::new(self.canvas.width() as f32, self.canvas.height() as f32);
        self.presenter.clear(size);
        if let Some(result) = self.handle.with_world(|w| self.presenter.draw_world(w)) {
            result?;
        }
        if let Some(result) = self.handle.with_overlay(|o| self.presenter.draw_overlay(o)) {
            result?;
        }
        Ok(())
    }
}

fn request_animation_frame(state: Rc<RefCell<FrameLoop>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(move |time: f64| {
        frame_loop(state, time);
    });
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}

fn frame_loop(state: Rc<RefCell<FrameLoop>>, time: f64) {
    {
        let mut s = state.borrow_mut();
        if s.handle.is_destroyed() {
            s.bindings.borrow_mut().unbind();
            log::debug!("frame loop stopped");
            return;
        }

        let elapsed = s.last_time.map_or(FRAME_DT_MS, |last| (time - last) as f32);
        s.last_time = Some(time);
        s.handle.frame(elapsed);
        if let Err(err) = s.draw() {
            log::warn!("draw failed: {err:?}");
        }
        s.handle.with_host(DomHost::sweep);
    }

    request_animation_frame(state);
}

/// Handle returned to JavaScript by `mount`
#[wasm_bindgen]
pub struct JsCityHandle {
    handle: CityHandle<DomHost>,
    bindings: Rc<RefCell<PageBindings>>,
}

#[wasm_bindgen]
impl JsCityHandle {
    pub fn pause(&self) {
        self.handle.pause();
    }

    pub fn resume(&self) {
        self.handle.resume();
    }

    pub fn destroy(&self) {
        self.handle.destroy();
        self.bindings.borrow_mut().unbind();
    }

    /// Visibility signal from the host page (true resumes, false pauses)
    #[wasm_bindgen(js_name = setVisible)]
    pub fn set_visible(&self, visible: bool) {
        self.handle.viewport_visibility_changed(visible);
    }

    #[wasm_bindgen(js_name = setMuted)]
    pub fn set_muted(&self, muted: bool) {
        self.handle.set_muted(muted);
    }

    #[wasm_bindgen(js_name = isDestroyed)]
    pub fn is_destroyed(&self) -> bool {
        self.handle.is_destroyed()
    }
}

/// Mount the city into `container`.
///
/// `options` mirrors `MountOptions` in camelCase (`pixelArt`, `mute`,
/// `basePath`, `backgroundColor`, `seed`, `config`); `on_status` receives
/// every status message.
#[wasm_bindgen(js_name = mount)]
pub fn mount_city(
    container: Option<HtmlElement>,
    options: JsValue,
    on_status: Option<js_sys::Function>,
) -> Result<JsCityHandle, JsValue> {
    let Some(container) = container else {
        log::error!("mount called without a container");
        return Err(JsValue::from_str(&MountError::MissingContainer.to_string()));
    };

    let mut options: MountOptions = if options.is_undefined() || options.is_null() {
        MountOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options)?
    };
    if let Some(callback) = on_status {
        options = options.with_status(move |message| {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(message)) {
                log::warn!("status callback threw: {err:?}");
            }
        });
    }
    let pixel_art = options.pixel_art;
    let background = options.background_color.clone();

    let host = DomHost::new(container.clone())?;
    let viewport = element_viewport(&container);
    let canvas = host.canvas().clone();
    let images = host.images();
    let slot = host.slot();

    let handle =
        mount(host, Some(viewport), options).map_err(|err| JsValue::from_str(&err.to_string()))?;
    *slot.borrow_mut() = Some(handle.downgrade());

    let wired = Presenter::new(&canvas, images, background, pixel_art)
        .and_then(|presenter| Ok((presenter, bind_page(&handle, &canvas, &container)?)));
    let (presenter, bindings) = match wired {
        Ok(wired) => wired,
        Err(err) => {
            handle.destroy();
            return Err(err);
        }
    };
    let bindings = Rc::new(RefCell::new(bindings));

    request_animation_frame(Rc::new(RefCell::new(FrameLoop {
        handle: handle.clone(),
        presenter,
        canvas,
        bindings: Rc::clone(&bindings),
        last_time: None,
    })));

    Ok(JsCityHandle { handle, bindings })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_dropped_bindings_stop_listening() {
        let target = EventTarget::new().unwrap();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let mut bindings = PageBindings::default();
        bindings
            .listen(&target, "ping", move |_: Event| counter.set(counter.get() + 1))
            .unwrap();
        target.dispatch_event(&Event::new("ping").unwrap()).unwrap();
        assert_eq!(hits.get(), 1);

        drop(bindings);
        target.dispatch_event(&Event::new("ping").unwrap()).unwrap();
        assert_eq!(hits.get(), 1);
    }
}
