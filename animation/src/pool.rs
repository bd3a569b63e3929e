use std::collections::BTreeMap;

use model::{ChainId, Coordinate};

use crate::surface::{MarkerId, MarkerVisual, SurfaceHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(u64);

struct ChainEntry {
    marker: Option<MarkerId>,
    last_position: Option<Coordinate>,
    /// The member currently allowed to move the shared marker. Exclusive at
    /// any instant; hands off as one route completes and the next begins.
    owner: Option<MemberId>,
    /// Member -> animating flag.
    members: BTreeMap<MemberId, bool>,
}

/// Registry handing out one shared marker per chain, so back-to-back route
/// animations look like a single uninterrupted trip. Explicitly constructed
/// and passed to the runners that need it; tests instantiate their own.
#[derive(Default)]
pub struct MarkerPool {
    next_member: u64,
    chains: BTreeMap<ChainId, ChainEntry>,
}

impl MarkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a chain. Every runner registers before anything else and keeps
    /// the returned ID until teardown.
    pub fn register(&mut self, chain: &ChainId) -> MemberId {
        let member = MemberId(self.next_member);
        self.next_member += 1;
        let entry = self.chains.entry(chain.clone()).or_insert_with(|| ChainEntry {
            marker: None,
            last_position: None,
            owner: None,
            members: BTreeMap::new(),
        });
        entry.members.insert(member, false);
        debug!(
            "Chain {:?}: member {:?} registered ({} total)",
            chain,
            member,
            entry.members.len()
        );
        member
    }

    /// The shared marker handle, created lazily by whichever member gets
    /// here first. Later calls return the existing handle unchanged, never
    /// repositioning it; that stability is what removes the visual pop at
    /// segment hand-off. None only when the surface is unusable this frame.
    pub fn get_or_create_marker(
        &mut self,
        chain: &ChainId,
        surface: &SurfaceHandle,
        visual: &MarkerVisual,
        initial: Coordinate,
    ) -> Option<MarkerId> {
        let entry = self.chains.get_mut(chain)?;
        if let Some(marker) = entry.marker {
            return Some(marker);
        }
        let marker = surface.with(|s| s.add_marker(visual, initial))?;
        entry.marker = Some(marker);
        entry.last_position = Some(initial);
        debug!("Chain {:?}: created shared marker {:?}", chain, marker);
        Some(marker)
    }

    /// Record which member currently drives the shared marker. Turning a
    /// member on displaces any previous owner.
    pub fn set_member_animating(&mut self, chain: &ChainId, member: MemberId, animating: bool) {
        let Some(entry) = self.chains.get_mut(chain) else {
            return;
        };
        if !entry.members.contains_key(&member) {
            return;
        }
        if animating {
            if let Some(prev) = entry.owner {
                if prev != member {
                    entry.members.insert(prev, false);
                    debug!(
                        "Chain {:?}: hand-off from {:?} to {:?}",
                        chain, prev, member
                    );
                }
            }
            entry.owner = Some(member);
        } else if entry.owner == Some(member) {
            entry.owner = None;
        }
        entry.members.insert(member, animating);
    }

    /// Move the shared marker. Applied only when `member` owns motion; the
    /// pool serializes writes so chained runners never fight over the marker.
    pub fn update_position(
        &mut self,
        chain: &ChainId,
        member: MemberId,
        surface: &SurfaceHandle,
        pos: Coordinate,
        rotation_degrees: f64,
    ) {
        let Some(entry) = self.chains.get_mut(chain) else {
            return;
        };
        if entry.owner != Some(member) {
            return;
        }
        let Some(marker) = entry.marker else {
            return;
        };
        if surface
            .with(|s| s.move_marker(marker, pos, rotation_degrees))
            .is_some()
        {
            entry.last_position = Some(pos);
        }
    }

    pub fn marker(&self, chain: &ChainId) -> Option<MarkerId> {
        self.chains.get(chain)?.marker
    }

    /// Where the shared marker was last placed.
    pub fn marker_position(&self, chain: &ChainId) -> Option<Coordinate> {
        self.chains.get(chain)?.last_position
    }

    /// Leave a chain. Idempotent; the marker is only removed from the
    /// surface once the last member is gone.
    pub fn release(&mut self, chain: &ChainId, member: MemberId, surface: &SurfaceHandle) {
        let Some(entry) = self.chains.get_mut(chain) else {
            return;
        };
        if entry.members.remove(&member).is_none() {
            return;
        }
        if entry.owner == Some(member) {
            entry.owner = None;
        }
        if entry.members.is_empty() {
            if let Some(marker) = entry.marker {
                let _ = surface.with(|s| s.remove_marker(marker));
            }
            self.chains.remove(chain);
            debug!("Chain {:?}: last member {:?} left, marker removed", chain, member);
        }
    }
}
