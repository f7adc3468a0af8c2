//! Browser host
//!
//! `DomHost` owns the canvas it appends to the container, the page listeners
//! the engine asks for, the loaded sprites and the Web Audio manager. Page
//! events reach the engine through a weak handle installed right after mount.

mod bindings;
mod loader;
mod presenter;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    Document, Event, EventTarget, HtmlCanvasElement, HtmlElement, HtmlImageElement,
    ResizeObserver, Window,
};

use super::{AudioState, Host, HostListener, Viewport};
use crate::assets::{AssetKey, AssetRequest};
use crate::audio::AudioManager;
use crate::lifecycle::{CityHandle, WeakCityHandle};

pub use bindings::{JsCityHandle, init_logging, mount_city};

/// Slot the listeners read the engine handle from
pub(crate) type HandleSlot = Rc<RefCell<Option<WeakCityHandle<DomHost>>>>;

pub type ImageStore = Rc<RefCell<HashMap<AssetKey, HtmlImageElement>>>;

type Listener = Closure<dyn FnMut(Event)>;
type ObserverCallback = Closure<dyn FnMut(js_sys::Array)>;

/// How a host listener is hooked into the page
enum Attachment {
    Event(Listener),
    /// Container size changes, including ones the window never sees
    Observer(ResizeObserver, ObserverCallback),
}

pub struct DomHost {
    window: Window,
    document: Document,
    container: HtmlElement,
    canvas: HtmlCanvasElement,
    slot: HandleSlot,
    listeners: HashMap<HostListener, Attachment>,
    /// Detached while possibly still on the call stack; dropped on the next sweep
    retired: Vec<Attachment>,
    images: ImageStore,
    audio: Rc<RefCell<AudioManager>>,
}

/// Client size of `element`
pub fn element_viewport(element: &HtmlElement) -> Viewport {
    Viewport::new(element.client_width() as f32, element.client_height() as f32)
}

impl DomHost {
    /// Create the canvas inside `container`
    pub fn new(container: HtmlElement) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        canvas.set_class_name("quantum-city-canvas");
        let style = canvas.style();
        style.set_property("display", "block")?;
        style.set_property("width", "100%")?;
        style.set_property("height", "100%")?;
        style.set_property("touch-action", "none")?;
        container.append_child(&canvas)?;

        let host = Self {
            window,
            document,
            container,
            canvas,
            slot: Rc::new(RefCell::new(None)),
            listeners: HashMap::new(),
            retired: Vec::new(),
            images: Rc::new(RefCell::new(HashMap::new())),
            audio: Rc::new(RefCell::new(AudioManager::new())),
        };
        host.fit_canvas();
        Ok(host)
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn container(&self) -> &HtmlElement {
        &self.container
    }

    pub fn images(&self) -> ImageStore {
        Rc::clone(&self.images)
    }

    pub(crate) fn slot(&self) -> HandleSlot {
        Rc::clone(&self.slot)
    }

    /// Match the canvas backing store to the container size
    pub fn fit_canvas(&self) {
        let size = element_viewport(&self.container).size();
        self.canvas.set_width(size.x as u32);
        self.canvas.set_height(size.y as u32);
    }

    /// Drop listeners retired during an earlier dispatch
    pub fn sweep(&mut self) {
        self.retired.clear();
    }

    fn target(&self, listener: HostListener) -> EventTarget {
        match listener {
            HostListener::PageVisibility => self.document.clone().into(),
            _ => self.window.clone().into(),
        }
    }

    fn upgrade(slot: &HandleSlot) -> Option<CityHandle<DomHost>> {
        slot.borrow().as_ref().and_then(WeakCityHandle::upgrade)
    }

    fn make_listener(&self, listener: HostListener) -> Listener {
        let slot = Rc::clone(&self.slot);
        let document = self.document.clone();
        let resize = self.resize_callback();
        Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(handle) = Self::upgrade(&slot) else {
                return;
            };
            match listener {
                HostListener::PageVisibility => handle.page_visibility_changed(
                    document.visibility_state() == web_sys::VisibilityState::Hidden,
                ),
                HostListener::UnlockPointerDown
                | HostListener::UnlockTouchStart
                | HostListener::UnlockKeyDown => handle.user_gesture(event.is_trusted()),
                HostListener::Resize => resize(&handle),
                HostListener::Blur => handle.focus_lost(),
            }
        })
    }

    /// Refit the canvas and tell the engine about the new container size
    fn resize_callback(&self) -> impl Fn(&CityHandle<DomHost>) + 'static {
        let container = self.container.clone();
        let canvas = self.canvas.clone();
        move |handle| {
            let viewport = element_viewport(&container);
            let size = viewport.size();
            canvas.set_width(size.x as u32);
            canvas.set_height(size.y as u32);
            handle.resize(viewport);
        }
    }

    /// Watch the container itself; falls back to window resizes when
    /// `ResizeObserver` is missing
    fn observe_container(&self) -> Option<Attachment> {
        let slot = Rc::clone(&self.slot);
        let resize = self.resize_callback();
        let callback = ObserverCallback::new(move |_entries: js_sys::Array| {
            if let Some(handle) = Self::upgrade(&slot) {
                resize(&handle);
            }
        });
        match ResizeObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => {
                observer.observe(&self.container);
                Some(Attachment::Observer(observer, callback))
            }
            Err(err) => {
                log::warn!("no ResizeObserver, using window resize: {err:?}");
                None
            }
        }
    }

    fn listen(&self, listener: HostListener) -> Option<Attachment> {
        let closure = self.make_listener(listener);
        let target = self.target(listener);
        match target
            .add_event_listener_with_callback(listener.event_name(), closure.as_ref().unchecked_ref())
        {
            Ok(()) => Some(Attachment::Event(closure)),
            Err(err) => {
                log::warn!("could not attach {listener:?}: {err:?}");
                None
            }
        }
    }
}

impl Host for DomHost {
    fn attach(&mut self, listener: HostListener) {
        self.sweep();
        if self.listeners.contains_key(&listener) {
            return;
        }
        let attachment = match listener {
            HostListener::Resize => self.observe_container().or_else(|| self.listen(listener)),
            _ => self.listen(listener),
        };
        if let Some(attachment) = attachment {
            self.listeners.insert(listener, attachment);
        }
    }

    fn detach(&mut self, listener: HostListener) {
        let Some(attachment) = self.listeners.remove(&listener) else {
            return;
        };
        match &attachment {
            Attachment::Event(closure) => {
                let _ = self.target(listener).remove_event_listener_with_callback(
                    listener.event_name(),
                    closure.as_ref().unchecked_ref(),
                );
            }
            Attachment::Observer(observer, _) => observer.disconnect(),
        }
        self.retired.push(attachment);
    }

    fn origin(&self) -> Option<String> {
        self.window.location().origin().ok()
    }

    fn load_assets(&mut self, requests: Vec<AssetRequest>) {
        for request in requests {
            loader::spawn_load(
                request,
                Rc::clone(&self.slot),
                Rc::clone(&self.images),
                Rc::clone(&self.audio),
            );
        }
    }

    fn resume_audio(&mut self) -> AudioState {
        let audio = self.audio.borrow();
        if let Some(promise) = audio.resume() {
            let slot = Rc::clone(&self.slot);
            spawn_local(async move {
                match JsFuture::from(promise).await {
                    Ok(_) => {
                        if let Some(handle) = Self::upgrade(&slot) {
                            handle.audio_resumed();
                        }
                    }
                    Err(err) => log::debug!("audio resume rejected: {err:?}"),
                }
            });
        }
        audio.state()
    }

    fn play_sound(&mut self, asset: AssetKey, volume: f32) {
        self.audio.borrow().play(asset, volume);
    }

    fn random_seed(&mut self) -> u64 {
        (js_sys::Math::random() * u64::MAX as f64) as u64 ^ js_sys::Date::now() as u64
    }

    fn release(&mut self) {
        self.slot.borrow_mut().take();
        self.audio.borrow_mut().close();
        self.images.borrow_mut().clear();
        self.canvas.remove();
        log::debug!("dom host released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn container() -> HtmlElement {
        let document = web_sys::window().unwrap().document().unwrap();
        let element: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
        document.body().unwrap().append_child(&element).unwrap();
        element
    }

    #[wasm_bindgen_test]
    fn test_resize_watches_the_container() {
        let mut host = DomHost::new(container()).unwrap();
        host.attach(HostListener::Resize);
        assert!(matches!(
            host.listeners.get(&HostListener::Resize),
            Some(Attachment::Observer(..))
        ));

        host.detach(HostListener::Resize);
        assert!(host.listeners.is_empty());
        host.sweep();
        host.release();
    }

    #[wasm_bindgen_test]
    fn test_blur_is_a_window_listener() {
        let mut host = DomHost::new(container()).unwrap();
        host.attach(HostListener::Blur);
        assert!(matches!(
            host.listeners.get(&HostListener::Blur),
            Some(Attachment::Event(_))
        ));
        host.detach(HostListener::Blur);
        host.release();
    }
}
