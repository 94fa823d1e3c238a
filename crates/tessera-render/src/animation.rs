//! Frame-sequence sprite animation.
//!
//! Animations own their atlas regions and write the active region into the
//! entity's [`SpriteFrame`] when it changes. That write is an ordinary
//! component mutation, so the model updater picks it up through the regular
//! dirty path with no extra wiring.

use tessera_core::{
    ecs::{Component, Entity, Registry},
    profiling::profile_function,
};

use crate::{atlas::AtlasRegion, components::SpriteFrame};

/// Animation state cycling through a list of atlas regions.
#[derive(Debug, Clone)]
pub struct SpriteAnimation {
    frames: Vec<AtlasRegion>,
    /// Current frame index
    current: usize,
    /// Time per frame in seconds
    frame_duration: f32,
    /// Time accumulated since last frame change
    elapsed: f32,
    /// Whether the animation loops
    looping: bool,
    /// Whether the animation is playing
    playing: bool,
}

impl Component for SpriteAnimation {}

impl SpriteAnimation {
    pub fn new(frames: Vec<AtlasRegion>, fps: f32) -> Self {
        assert!(!frames.is_empty(), "animation needs at least one frame");
        Self {
            frames,
            current: 0,
            frame_duration: 1.0 / fps,
            elapsed: 0.0,
            looping: true,
            playing: true,
        }
    }

    /// Set whether the animation loops.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Advance by `dt` seconds.
    ///
    /// Returns true if the frame changed.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.playing {
            return false;
        }

        self.elapsed += dt;
        if self.elapsed < self.frame_duration {
            return false;
        }
        self.elapsed -= self.frame_duration;

        if self.current + 1 >= self.frames.len() {
            if self.looping {
                self.current = 0;
            } else {
                self.playing = false;
                return false;
            }
        } else {
            self.current += 1;
        }
        true
    }

    pub fn current_region(&self) -> AtlasRegion {
        self.frames[self.current]
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Stop and rewind to the first frame.
    pub fn stop(&mut self) {
        self.playing = false;
        self.current = 0;
        self.elapsed = 0.0;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

/// Step every animation and push changed frames into `SpriteFrame`.
pub fn advance_animations(reg: &mut Registry, dt: f32) {
    profile_function!();
    let ents: Vec<Entity> = reg
        .query::<SpriteAnimation>()
        .map(|(ent, _)| ent)
        .collect();

    for ent in ents {
        let Some(anim) = reg.get_component_mut::<SpriteAnimation>(ent) else {
            continue;
        };
        if !anim.advance(dt) {
            continue;
        }
        let region = anim.current_region();
        if let Some(frame) = reg.get_component_mut::<SpriteFrame>(ent) {
            frame.region = region;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn two_frames() -> Vec<AtlasRegion> {
        vec![
            AtlasRegion::new(Vec2::ZERO, Vec2::new(16.0, 16.0)),
            AtlasRegion::new(Vec2::new(16.0, 0.0), Vec2::new(16.0, 16.0)),
        ]
    }

    #[test]
    fn test_advance_flips_frame_at_duration() {
        let mut anim = SpriteAnimation::new(two_frames(), 10.0);
        assert!(!anim.advance(0.05));
        assert!(anim.advance(0.06));
        assert_eq!(anim.current_region().position, Vec2::new(16.0, 0.0));
    }

    #[test]
    fn test_looping_wraps_to_first_frame() {
        let mut anim = SpriteAnimation::new(two_frames(), 10.0);
        anim.advance(0.1);
        anim.advance(0.1);
        assert_eq!(anim.current_region().position, Vec2::ZERO);
        assert!(anim.is_playing());
    }

    #[test]
    fn test_one_shot_stops_on_last_frame() {
        let mut anim = SpriteAnimation::new(two_frames(), 10.0).looping(false);
        anim.advance(0.1);
        anim.advance(0.1);
        anim.advance(0.1);
        assert!(!anim.is_playing());
        assert_eq!(anim.current_region().position, Vec2::new(16.0, 0.0));
    }

    #[test]
    fn test_frame_write_marks_sprite_frame_changed() {
        let mut reg = Registry::new();
        let ent = reg.spawn((
            SpriteFrame::new(AtlasRegion::new(Vec2::ZERO, Vec2::new(16.0, 16.0))),
            SpriteAnimation::new(two_frames(), 10.0),
        ));
        reg.clear_events();

        advance_animations(&mut reg, 0.15);

        assert_eq!(reg.take_changed::<SpriteFrame>(), vec![ent]);
        assert_eq!(
            reg.get_component::<SpriteFrame>(ent).unwrap().region.position,
            Vec2::new(16.0, 0.0)
        );
    }

    #[test]
    fn test_unchanged_frame_stays_clean() {
        let mut reg = Registry::new();
        reg.spawn((
            SpriteFrame::new(AtlasRegion::new(Vec2::ZERO, Vec2::new(16.0, 16.0))),
            SpriteAnimation::new(two_frames(), 10.0),
        ));
        reg.clear_events();

        advance_animations(&mut reg, 0.01);

        assert!(reg.take_changed::<SpriteFrame>().is_empty());
    }
}
