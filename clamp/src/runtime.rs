//! Per-actor runtime state threaded through ticks.
//!
//! A `RuntimeData` lives in the runtime slot of its actor's
//! [`GroundClampingData`] and is only written once a clamp has been finalized,
//! so readers always see the last completed clamp.

use std::any::Any;

use crate::{data::GroundClampingData, types::Rot};

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeData {
    last_clamped_offset: f32,
    last_clamped_time: f64,
    last_clamped_rotation: Rot,
    clamped: bool,
}

impl Default for RuntimeData {
    fn default() -> Self {
        Self {
            last_clamped_offset: 0.0,
            last_clamped_time: 0.0,
            last_clamped_rotation: Rot::identity(),
            clamped: false,
        }
    }
}

impl RuntimeData {
    /// Vertical delta between the raw and the clamped position at the last clamp.
    #[inline]
    pub fn last_clamped_offset(&self) -> f32 {
        self.last_clamped_offset
    }

    #[inline]
    pub fn set_last_clamped_offset(&mut self, offset: f32) {
        self.last_clamped_offset = offset;
    }

    /// Simulation time of the last real query.
    #[inline]
    pub fn last_clamped_time(&self) -> f64 {
        self.last_clamped_time
    }

    /// Record the time of a real query. Time never moves backwards; older
    /// values are ignored.
    pub fn set_last_clamped_time(&mut self, time: f64) {
        if time < self.last_clamped_time {
            log::debug!(
                "Ignoring clamp time {} older than last clamp time {}.",
                time,
                self.last_clamped_time
            );
            return;
        }
        self.last_clamped_time = time;
    }

    #[inline]
    pub fn last_clamped_rotation(&self) -> &Rot {
        &self.last_clamped_rotation
    }

    #[inline]
    pub fn set_last_clamped_rotation(&mut self, rotation: Rot) {
        self.last_clamped_rotation = rotation;
    }

    /// Whether at least one clamp has been finalized for this actor.
    #[inline]
    pub fn has_clamped(&self) -> bool {
        self.clamped
    }

    /// Commit the result of a finalized clamp.
    pub(crate) fn record(&mut self, offset: f32, time: f64, rotation: Rot) {
        self.set_last_clamped_offset(offset);
        self.set_last_clamped_time(time);
        self.set_last_clamped_rotation(rotation);
        self.clamped = true;
    }
}

/// Return the actor's runtime data, creating it when missing.
///
/// A slot holding anything other than `RuntimeData` (state left behind by a
/// different clamper) is discarded and replaced with fresh, zeroed data.
pub fn get_or_create_runtime_data(data: &mut GroundClampingData) -> &mut RuntimeData {
    let slot = data.runtime_slot_mut();

    if let Some(existing) = slot.as_ref() {
        if !existing.is::<RuntimeData>() {
            log::error!("Ground clamping runtime slot is being replaced by new runtime data.");
            *slot = None;
        }
    }

    slot.get_or_insert_with(|| Box::new(RuntimeData::default()) as Box<dyn Any + Send>)
        .downcast_mut::<RuntimeData>()
        .unwrap_or_else(|| unreachable!("runtime slot holds RuntimeData after replacement"))
}
