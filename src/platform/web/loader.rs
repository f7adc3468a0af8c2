//! Asynchronous asset fetches; each result is reported through the handle

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::HtmlImageElement;

use super::{HandleSlot, ImageStore};
use crate::assets::{AssetKind, AssetRequest};
use crate::audio::{AudioManager, fetch_and_decode};

pub(super) fn spawn_load(
    request: AssetRequest,
    slot: HandleSlot,
    images: ImageStore,
    audio: Rc<RefCell<AudioManager>>,
) {
    spawn_local(async move {
        let AssetRequest { key, url } = request;
        let outcome = match key.kind() {
            AssetKind::Image => load_image(&url).await.map(|image| {
                let size = Vec2::new(image.natural_width() as f32, image.natural_height() as f32);
                images.borrow_mut().insert(key, image);
                Some(size)
            }),
            AssetKind::Audio => {
                let ctx = audio.borrow().context();
                match ctx {
                    Some(ctx) => fetch_and_decode(&ctx, &url).await.map(|buffer| {
                        audio.borrow_mut().insert(key, buffer);
                        None
                    }),
                    // No audio: the sound simply never plays
                    None => Ok(None),
                }
            }
        };

        let handle = slot.borrow().as_ref().and_then(|weak| weak.upgrade());
        let Some(handle) = handle else {
            log::debug!("{key:?} arrived after teardown");
            return;
        };
        match outcome {
            Ok(size) => handle.asset_loaded(key, size),
            Err(err) => {
                let reason = err.as_string().unwrap_or_else(|| format!("{err:?}"));
                handle.asset_failed(key, &reason);
            }
        }
    });
}

async fn load_image(url: &str) -> Result<HtmlImageElement, JsValue> {
    let image = HtmlImageElement::new()?;
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        image.set_onload(Some(&resolve));
        image.set_onerror(Some(&reject));
    });
    image.set_src(url);
    JsFuture::from(promise)
        .await
        .map_err(|_| JsValue::from_str(&format!("image failed to load: {url}")))?;
    image.set_onload(None);
    image.set_onerror(None);
    Ok(image)
}
