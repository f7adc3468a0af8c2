//! Canvas 2D presenter
//!
//! Reads the scenes after each frame and draws them. Paused scenes are still
//! drawn in their frozen state.

use std::f64::consts::TAU;

use glam::Vec2;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use super::ImageStore;
use crate::assets::AssetKey;
use crate::scene::{ButtonView, OverlayScene, WorldScene};
use crate::sim::{CatKey, CatState, Direction};

/// Sprite scales relative to the source images
const ROBOT_SCALE: f64 = 0.12;
const CAT_SCALE: f64 = 32.0 / 480.0;
const CORPSE_SCALE: f64 = 0.12;
/// Corpses sit slightly below the street position
const CORPSE_GROUND_OFFSET: f64 = 12.0;

const ARROW_FILL: &str = "#ffec58";
const ARROW_STROKE: &str = "#e48d25";
const BUTTON_STROKE: &str = "rgba(0, 246, 255, 0.65)";
const BUTTON_LABEL: &str = "rgba(0, 246, 255, 0.85)";

pub struct Presenter {
    ctx: CanvasRenderingContext2d,
    images: ImageStore,
    background: String,
}

impl Presenter {
    pub fn new(
        canvas: &HtmlCanvasElement,
        images: ImageStore,
        background: String,
        pixel_art: bool,
    ) -> Result<Self, JsValue> {
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into()?;
        ctx.set_image_smoothing_enabled(!pixel_art);
        Ok(Self {
            ctx,
            images,
            background,
        })
    }

    fn image(&self, key: AssetKey) -> Option<HtmlImageElement> {
        self.images.borrow().get(&key).cloned()
    }

    pub fn clear(&self, size: Vec2) {
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_fill_style_str(&self.background);
        self.ctx.fill_rect(0.0, 0.0, size.x as f64, size.y as f64);
    }

    pub fn draw_world(&self, world: &WorldScene) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        let scroll = world.camera().scroll;
        ctx.save();
        ctx.translate(-scroll.x.round() as f64, -scroll.y.round() as f64)?;

        if let Some(backdrop) = self.image(AssetKey::Backdrop) {
            ctx.draw_image_with_html_image_element(&backdrop, 0.0, 0.0)?;
        }

        for key in CatKey::ALL {
            let cat = world.cat(key);
            let (asset, scale, drop) = match cat.state() {
                CatState::Alive => (AssetKey::CatAlive, CAT_SCALE, 0.0),
                CatState::Dead => (AssetKey::CatCorpse, CORPSE_SCALE, CORPSE_GROUND_OFFSET),
                CatState::Hidden => continue,
            };
            if let Some(image) = self.image(asset) {
                let (w, h) = scaled(&image, scale);
                let p = cat.position;
                ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    &image,
                    p.x as f64 - w / 2.0,
                    p.y as f64 - h + drop,
                    w,
                    h,
                )?;
            }
        }

        if let Some(hazard) = world.hazard() {
            if let Some(car) = self.image(AssetKey::Car) {
                ctx.save();
                ctx.set_global_alpha(hazard.alpha.clamp(0.0, 1.0) as f64);
                self.draw_centered(&car, hazard.pos, 1.0, hazard.flip_x())?;
                ctx.restore();
            }
        }

        let player = world.player();
        if let Some(robot) = self.image(AssetKey::Robot) {
            self.draw_centered(&robot, player.pos, ROBOT_SCALE, player.facing_left)?;
        }

        let arrow = world.arrow();
        if arrow.visible() {
            self.draw_arrow(arrow.pos, arrow.rotation, arrow.alpha)?;
        }

        ctx.restore();
        Ok(())
    }

    fn draw_centered(
        &self,
        image: &HtmlImageElement,
        pos: Vec2,
        scale: f64,
        flip: bool,
    ) -> Result<(), JsValue> {
        let (w, h) = scaled(image, scale);
        let ctx = &self.ctx;
        ctx.save();
        ctx.translate(pos.x as f64, pos.y as f64)?;
        if flip {
            ctx.scale(-1.0, 1.0)?;
        }
        ctx.draw_image_with_html_image_element_and_dw_and_dh(image, -w / 2.0, -h / 2.0, w, h)?;
        ctx.restore();
        Ok(())
    }

    /// Rounded shaft plus head, 106x40, pointing along +x before rotation
    fn draw_arrow(&self, pos: Vec2, rotation: f32, alpha: f32) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        ctx.save();
        ctx.translate(pos.x as f64, pos.y as f64)?;
        ctx.rotate(rotation as f64)?;
        ctx.translate(-53.0, -20.0)?;
        ctx.set_global_alpha(alpha.clamp(0.0, 1.0) as f64);
        ctx.set_fill_style_str(ARROW_FILL);
        ctx.set_stroke_style_str(ARROW_STROKE);
        ctx.set_line_width(3.0);

        ctx.begin_path();
        ctx.round_rect_with_f64(0.0, 12.0, 74.0, 16.0, 8.0)?;
        ctx.fill();
        ctx.stroke();

        ctx.begin_path();
        ctx.move_to(74.0, 0.0);
        ctx.line_to(106.0, 20.0);
        ctx.line_to(74.0, 40.0);
        ctx.close_path();
        ctx.fill();
        ctx.stroke();

        ctx.restore();
        Ok(())
    }

    pub fn draw_overlay(&self, overlay: &OverlayScene) -> Result<(), JsValue> {
        for button in overlay.buttons() {
            self.draw_button(&button)?;
        }
        Ok(())
    }

    fn draw_button(&self, button: &ButtonView) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        let c = button.center;
        let r = (button.radius * button.scale) as f64;
        ctx.save();
        ctx.set_global_alpha(1.0);
        ctx.set_fill_style_str(&format!("rgba(4, 17, 36, {:.2})", button.alpha));
        ctx.set_stroke_style_str(BUTTON_STROKE);
        ctx.set_line_width(2.0);
        ctx.begin_path();
        ctx.arc(c.x as f64, c.y as f64, r, 0.0, TAU)?;
        ctx.fill();
        ctx.stroke();

        ctx.set_fill_style_str(BUTTON_LABEL);
        ctx.set_font(&format!("{}px monospace", (32.0 * button.scale).round()));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.fill_text(label(button.direction), c.x as f64, c.y as f64)?;
        ctx.restore();
        Ok(())
    }
}

fn scaled(image: &HtmlImageElement, scale: f64) -> (f64, f64) {
    (
        image.natural_width() as f64 * scale,
        image.natural_height() as f64 * scale,
    )
}

fn label(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "^",
        Direction::Down => "v",
        Direction::Left => "<",
        Direction::Right => ">",
    }
}
