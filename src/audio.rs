//! Audio system using Web Audio API
//!
//! Sound effects are decoded into `AudioBuffer`s at boot and played through a
//! per-shot gain node. The context starts suspended until a user gesture.

use std::collections::HashMap;

use js_sys::{ArrayBuffer, Promise};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioContext, AudioContextState, Response};

use crate::assets::AssetKey;
use crate::platform::AudioState;

/// Audio manager for the city
pub struct AudioManager {
    ctx: Option<AudioContext>,
    buffers: HashMap<AssetKey, AudioBuffer>,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            buffers: HashMap::new(),
        }
    }

    pub fn state(&self) -> AudioState {
        match self.ctx.as_ref().map(|ctx| ctx.state()) {
            Some(AudioContextState::Running) => AudioState::Running,
            Some(_) => AudioState::Suspended,
            None => AudioState::Unavailable,
        }
    }

    /// Ask a suspended context to resume (needs a user gesture). The returned
    /// promise settles once the context is actually running.
    pub fn resume(&self) -> Option<Promise> {
        let ctx = self.ctx.as_ref()?;
        if ctx.state() != AudioContextState::Suspended {
            return None;
        }
        ctx.resume().ok()
    }

    /// Context used for decoding, if audio is available
    pub fn context(&self) -> Option<AudioContext> {
        self.ctx.clone()
    }

    pub fn insert(&mut self, key: AssetKey, buffer: AudioBuffer) {
        self.buffers.insert(key, buffer);
    }

    /// Play a decoded effect once
    pub fn play(&self, key: AssetKey, volume: f32) {
        let vol = volume.clamp(0.0, 1.0);
        if vol <= 0.0 {
            return;
        }
        let (Some(ctx), Some(buffer)) = (&self.ctx, self.buffers.get(&key)) else {
            return;
        };
        if ctx.state() != AudioContextState::Running {
            return;
        }
        if self.start_source(ctx, buffer, vol).is_none() {
            log::warn!("could not play {key:?}");
        }
    }

    fn start_source(&self, ctx: &AudioContext, buffer: &AudioBuffer, vol: f32) -> Option<()> {
        let source = ctx.create_buffer_source().ok()?;
        let gain = ctx.create_gain().ok()?;
        source.set_buffer(Some(buffer));
        gain.gain().set_value(vol);
        source.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;
        source.start().ok()
    }

    /// Close the context; nothing plays afterwards
    pub fn close(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            let _ = ctx.close();
        }
        self.buffers.clear();
    }
}

/// Fetch and decode one sound file
pub async fn fetch_and_decode(ctx: &AudioContext, url: &str) -> Result<AudioBuffer, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await?
        .dyn_into()?;
    if !response.ok() {
        return Err(JsValue::from_str(&format!("HTTP {}", response.status())));
    }
    let bytes: ArrayBuffer = JsFuture::from(response.array_buffer()?).await?.dyn_into()?;
    let decoded = JsFuture::from(ctx.decode_audio_data(&bytes)?).await?;
    decoded.dyn_into()
}
