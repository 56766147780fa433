//! Formation layouts and the single active formation.
//!
//! Slots are laid out in a local frame around the leader: `x` is the
//! lateral offset (positive to the right of the heading) and `y` is the
//! distance behind. [`FormationController::slot_positions`] rotates that
//! frame onto the formation heading.

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::math::Vec2;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FormationType {
    #[default]
    None = 0,
    Line = 1,
    Column = 2,
    Wedge = 3,
    Box = 4,
}

impl FormationType {
    pub const ALL: [FormationType; 5] = [
        FormationType::None,
        FormationType::Line,
        FormationType::Column,
        FormationType::Wedge,
        FormationType::Box,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            FormationType::None => "none",
            FormationType::Line => "line",
            FormationType::Column => "column",
            FormationType::Wedge => "wedge",
            FormationType::Box => "box",
        }
    }
}

/// Local `(lateral, back)` offset of the member at `rank` (leader is rank 0)
/// in a formation of `total` members.
pub fn slot_offset(kind: FormationType, rank: usize, total: usize, spacing: f32) -> Vec2 {
    if rank == 0 {
        return Vec2::ZERO;
    }
    // Odd ranks go right, even ranks left, widening every second rank.
    let k = ((rank + 1) / 2) as f32;
    let side = if rank % 2 == 1 { 1.0 } else { -1.0 };
    match kind {
        FormationType::None => Vec2::ZERO,
        FormationType::Line => Vec2::new(side * k * spacing, 0.0),
        FormationType::Column => Vec2::new(0.0, rank as f32 * spacing),
        FormationType::Wedge => Vec2::new(side * k * spacing, k * spacing),
        FormationType::Box => {
            let cols = (total.max(1) as f32).sqrt().ceil().max(1.0) as usize;
            let col = rank % cols;
            let row = rank / cols;
            Vec2::new(col as f32 * spacing, row as f32 * spacing)
        }
    }
}

/// Map a local slot offset onto the world, given the formation heading.
pub fn rotate_offset(offset: Vec2, heading: Vec2) -> Vec2 {
    let forward = match heading.normalize() {
        v if v == Vec2::ZERO => Vec2::new(1.0, 0.0),
        v => v,
    };
    let right = -forward.perp();
    right * offset.x - forward * offset.y
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    pub kind: FormationType,
    /// Members in rank order; `members[0]` is the leader.
    pub members: Vec<u32>,
    pub heading: Vec2,
}

impl Formation {
    pub fn leader(&self) -> u32 {
        self.members[0]
    }

    pub fn rank_of(&self, unit_id: u32) -> Option<usize> {
        self.members.iter().position(|&m| m == unit_id)
    }

    pub fn contains(&self, unit_id: u32) -> bool {
        self.rank_of(unit_id).is_some()
    }
}

#[derive(Debug, Clone)]
pub struct FormationController {
    spacing: [f32; 5],
    max_lag: f32,
    active: Option<Formation>,
}

impl FormationController {
    pub fn new(default_spacing: f32, max_lag: f32) -> Self {
        Self {
            spacing: [default_spacing; 5],
            max_lag,
            active: None,
        }
    }

    pub fn spacing(&self, kind: FormationType) -> f32 {
        self.spacing[kind.index()]
    }

    pub fn set_spacing(&mut self, kind: FormationType, spacing: f32) -> NavResult<()> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(NavError::InvalidSpacing(spacing));
        }
        self.spacing[kind.index()] = spacing;
        Ok(())
    }

    pub fn active(&self) -> Option<&Formation> {
        self.active.as_ref()
    }

    /// Replace any active formation. `members` must already be filtered to
    /// known units; duplicates keep their first position.
    pub fn create(&mut self, kind: FormationType, members: &[u32]) -> NavResult<&Formation> {
        let mut ranked: Vec<u32> = Vec::with_capacity(members.len());
        for &id in members {
            if !ranked.contains(&id) {
                ranked.push(id);
            }
        }
        if ranked.is_empty() {
            return Err(NavError::EmptyFormation);
        }
        log::debug!(
            "formation {} created: leader {} with {} followers",
            kind.label(),
            ranked[0],
            ranked.len() - 1
        );
        Ok(&*self.active.insert(Formation {
            kind,
            members: ranked,
            heading: Vec2::new(1.0, 0.0),
        }))
    }

    pub fn disband(&mut self) -> Option<Formation> {
        self.active.take()
    }

    /// Drop a unit from the formation. A removed leader hands over to the
    /// first follower; removing the last member disbands.
    pub fn remove_member(&mut self, unit_id: u32) {
        let Some(formation) = self.active.as_mut() else {
            return;
        };
        formation.members.retain(|&m| m != unit_id);
        if formation.members.is_empty() {
            self.active = None;
        }
    }

    /// Point the formation at `target` from the leader's `leader_position`
    /// and return `(unit_id, target)` for every member.
    pub fn plan_move(
        &mut self,
        leader: u32,
        leader_position: Vec2,
        target: Vec2,
    ) -> NavResult<Vec<(u32, Vec2)>> {
        let formation = self.active.as_mut().ok_or(NavError::NoFormation)?;
        if formation.leader() != leader {
            return Err(NavError::NotFormationLeader(leader));
        }
        let heading = target - leader_position;
        if heading.length_squared() > 1e-12 {
            formation.heading = heading.normalize();
        }
        Ok(self.slot_positions(target))
    }

    /// World position of every member's slot around `anchor`.
    pub fn slot_positions(&self, anchor: Vec2) -> Vec<(u32, Vec2)> {
        let Some(formation) = self.active.as_ref() else {
            return Vec::new();
        };
        let spacing = self.spacing(formation.kind);
        let total = formation.members.len();
        formation
            .members
            .iter()
            .enumerate()
            .map(|(rank, &id)| {
                let local = slot_offset(formation.kind, rank, total, spacing);
                (id, anchor + rotate_offset(local, formation.heading))
            })
            .collect()
    }

    /// Furthest a follower may trail its slot before the leader waits.
    pub fn lag_limit(&self) -> f32 {
        self.active
            .as_ref()
            .map(|f| self.max_lag * self.spacing(f.kind))
            .unwrap_or(f32::INFINITY)
    }
}
