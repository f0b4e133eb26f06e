//! The animation engine: compiles configs into keyframe tracks and applies them.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::animation::config::AnimationConfig;
use crate::animation::tween::{Key, Track, TweenProperty, dwell_track};
use crate::foundation::error::EngineResult;
use crate::scene::node::NodeId;

/// Fraction of the cycle where the pet hand reaches contact.
const PET_DWELL_START: f64 = 0.45;
/// Fraction of the cycle where the pet hand leaves contact.
const PET_DWELL_END: f64 = 0.55;
/// Vertical contact offset in percent of node height.
const PET_CONTACT_PERCENT: f64 = -60.0;

/// Transform values captured from a node at attach time.
///
/// Tracks are relative to this base, never to the node's live transform, so a
/// mid-cycle reinstall cannot drift.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TweenBase {
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) rotation_deg: f64,
    pub(crate) scale_x: f64,
    pub(crate) scale_y: f64,
}

/// Per-property transform values sampled from a node's tween set.
///
/// `None` fields are left at the node's stored transform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransformOverride {
    /// Horizontal position in stage units.
    pub x: Option<f64>,
    /// Vertical position in stage units.
    pub y: Option<f64>,
    /// Rotation in degrees.
    pub rotation_deg: Option<f64>,
    /// Horizontal scale factor.
    pub scale_x: Option<f64>,
    /// Vertical scale factor.
    pub scale_y: Option<f64>,
}

/// Placement of the decorative pet hand relative to the node center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PetOverlay {
    /// Horizontal offset in stage units.
    pub dx_units: f64,
    /// Vertical offset in percent of the node's height (negative is up).
    pub dy_percent: f64,
}

struct PetRig {
    dx_units: f64,
    y_track: Track,
}

#[derive(Default)]
struct TweenSet {
    tracks: SmallVec<[Track; 2]>,
    pet: Option<PetRig>,
}

impl TweenSet {
    fn len(&self) -> usize {
        self.tracks.len() + usize::from(self.pet.is_some())
    }
}

/// Owns every active tween set, keyed by node.
///
/// Exactly one set exists per node at any time: installing tears the previous
/// set down first, and teardown is idempotent.
#[derive(Default)]
pub struct AnimationEngine {
    sets: HashMap<NodeId, TweenSet>,
}

impl AnimationEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the node's tween set. Safe to call when none is attached.
    pub fn clear(&mut self, id: NodeId) {
        self.sets.remove(&id);
    }

    /// Number of active tweens (tracks plus overlay rig) for `id`.
    pub fn active_tween_count(&self, id: NodeId) -> usize {
        self.sets.get(&id).map_or(0, TweenSet::len)
    }

    /// Total number of nodes with an attached tween set.
    pub fn attached_nodes(&self) -> usize {
        self.sets.len()
    }

    pub(crate) fn install(
        &mut self,
        id: NodeId,
        base: TweenBase,
        config: &AnimationConfig,
    ) -> EngineResult<()> {
        config.validate()?;
        // Teardown before install keeps the one-set-per-node invariant even if
        // track construction fails below.
        self.sets.remove(&id);

        let Some(period) = config.cycle_secs() else {
            return Ok(());
        };

        let mut set = TweenSet::default();
        match *config {
            AnimationConfig::None => return Ok(()),
            AnimationConfig::Shake { .. } => {
                // Out to +10, through base to -10, back: covers ±10 while
                // starting and ending the cycle at the attach position.
                set.tracks.push(Track::new(
                    TweenProperty::X,
                    period,
                    vec![
                        Key::linear(0.0, base.x),
                        Key::linear(0.25, base.x + 10.0),
                        Key::linear(0.75, base.x - 10.0),
                        Key::linear(1.0, base.x),
                    ],
                )?);
            }
            AnimationConfig::Spin { .. } => {
                set.tracks.push(Track::sweep(
                    TweenProperty::RotationDeg,
                    period,
                    base.rotation_deg,
                    base.rotation_deg + 360.0,
                ));
            }
            AnimationConfig::Bounce { .. } => {
                set.tracks
                    .push(Track::yoyo(TweenProperty::Y, period, base.y, base.y - 20.0));
            }
            AnimationConfig::Zoom { .. } => {
                set.tracks.push(Track::yoyo(
                    TweenProperty::ScaleX,
                    period,
                    base.scale_x,
                    base.scale_x * 1.2,
                ));
                set.tracks.push(Track::yoyo(
                    TweenProperty::ScaleY,
                    period,
                    base.scale_y,
                    base.scale_y * 1.2,
                ));
            }
            AnimationConfig::Slide { .. } => {
                set.tracks.push(Track::yoyo(
                    TweenProperty::X,
                    period,
                    base.x,
                    base.x + 40.0,
                ));
            }
            AnimationConfig::Flip { .. } => {
                set.tracks.push(Track::yoyo(
                    TweenProperty::ScaleX,
                    period,
                    base.scale_x,
                    -base.scale_x,
                ));
            }
            AnimationConfig::Pet {
                hand_x,
                hand_y,
                pat_distance,
                ..
            } => {
                let rest = -(pat_distance + 60.0) + hand_y;
                let contact = PET_CONTACT_PERCENT + hand_y;
                set.pet = Some(PetRig {
                    dx_units: hand_x - 50.0,
                    y_track: dwell_track(
                        TweenProperty::Y,
                        period,
                        rest,
                        contact,
                        (PET_DWELL_START, PET_DWELL_END),
                    ),
                });
            }
        }

        self.sets.insert(id, set);
        Ok(())
    }

    /// Sample the node's tween set at `t_secs` since attach.
    pub fn sample(&self, id: NodeId, t_secs: f64) -> Option<TransformOverride> {
        let set = self.sets.get(&id)?;
        if set.tracks.is_empty() {
            return None;
        }

        let mut out = TransformOverride::default();
        for track in &set.tracks {
            let v = track.sample(t_secs);
            match track.property {
                TweenProperty::X => out.x = Some(v),
                TweenProperty::Y => out.y = Some(v),
                TweenProperty::RotationDeg => out.rotation_deg = Some(v),
                TweenProperty::ScaleX => out.scale_x = Some(v),
                TweenProperty::ScaleY => out.scale_y = Some(v),
            }
        }
        Some(out)
    }

    /// Sample the pet hand placement for `id` at `t_secs`, if a pet rig is attached.
    pub fn pet_overlay(&self, id: NodeId, t_secs: f64) -> Option<PetOverlay> {
        let rig = self.sets.get(&id)?.pet.as_ref()?;
        Some(PetOverlay {
            dx_units: rig.dx_units,
            dy_percent: rig.y_track.sample(t_secs),
        })
    }

    /// Drop tween sets for nodes not in `keep` (history restore sweep).
    pub(crate) fn retain_nodes(&mut self, keep: &std::collections::HashSet<NodeId>) {
        self.sets.retain(|id, _| keep.contains(id));
    }

    /// Whether a tween set is attached for `id`.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.sets.contains_key(&id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/engine.rs"]
mod tests;