//! Host without a page: records what the engine asks for
//!
//! Used by the native demo and by tests. Asset loads are only recorded; the
//! caller reports results through the handle.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use glam::Vec2;

use super::{AudioState, Host, HostListener};
use crate::assets::{AssetKey, AssetRequest};

/// Everything the headless host was asked to do
#[derive(Debug, Default)]
pub struct HostLog {
    /// Currently attached listeners
    pub attached: BTreeSet<HostListener>,
    /// Every detach call, in order
    pub detached: Vec<HostListener>,
    pub requests: Vec<AssetRequest>,
    pub sounds: Vec<(AssetKey, f32)>,
    pub resume_calls: usize,
    pub released: usize,
}

#[derive(Debug, Clone)]
pub struct HeadlessHost {
    log: Rc<RefCell<HostLog>>,
    /// Answer to the next resume attempts
    audio: Rc<RefCell<AudioState>>,
    seed: u64,
}

impl HeadlessHost {
    pub fn new(seed: u64) -> Self {
        Self {
            log: Rc::default(),
            audio: Rc::new(RefCell::new(AudioState::Suspended)),
            seed,
        }
    }

    /// Shared view of the log (stays valid after the host moves into `mount`)
    pub fn log(&self) -> Rc<RefCell<HostLog>> {
        Rc::clone(&self.log)
    }

    /// Shared knob controlling what `resume_audio` reports
    pub fn audio_state(&self) -> Rc<RefCell<AudioState>> {
        Rc::clone(&self.audio)
    }

    /// Backdrop size reported for the default demo world
    pub fn backdrop_size() -> Vec2 {
        Vec2::new(1600.0, 900.0)
    }
}

impl Host for HeadlessHost {
    fn attach(&mut self, listener: HostListener) {
        self.log.borrow_mut().attached.insert(listener);
    }

    fn detach(&mut self, listener: HostListener) {
        let mut log = self.log.borrow_mut();
        log.attached.remove(&listener);
        log.detached.push(listener);
    }

    fn load_assets(&mut self, requests: Vec<AssetRequest>) {
        self.log.borrow_mut().requests.extend(requests);
    }

    fn resume_audio(&mut self) -> AudioState {
        self.log.borrow_mut().resume_calls += 1;
        *self.audio.borrow()
    }

    fn play_sound(&mut self, asset: AssetKey, volume: f32) {
        log::debug!("sound {asset:?} at {volume:.2}");
        self.log.borrow_mut().sounds.push((asset, volume));
    }

    fn random_seed(&mut self) -> u64 {
        self.seed
    }

    fn release(&mut self) {
        self.log.borrow_mut().released += 1;
    }
}
