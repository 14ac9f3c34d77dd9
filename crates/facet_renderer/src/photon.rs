//! Photons and the append-only store they are deposited into.

use facet_math::Vec3;

use crate::{Color, RenderResult};

/// A packet of light energy resting on a diffuse surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    pub position: Vec3,
    /// Unit vector pointing back towards where the photon came from
    pub incoming_direction: Vec3,
    /// RGB power carried by the photon
    pub power: Color,
}

impl Photon {
    pub fn new(position: Vec3, incoming_direction: Vec3, power: Color) -> Self {
        Self {
            position,
            incoming_direction,
            power,
        }
    }
}

/// Photons deposited during one emission run.
///
/// Every deposit lands in the global sequence. Deposits whose path crossed
/// at least one specular bounce are recorded in the caustic sequence too,
/// from the same deposit event.
#[derive(Debug, Clone, Default)]
pub struct PhotonStore {
    caustic: Vec<Photon>,
    global: Vec<Photon>,
}

impl PhotonStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with room for `photons` global deposits.
    ///
    /// Fails with an allocation error instead of aborting when the
    /// reservation cannot be satisfied.
    pub fn with_capacity(photons: usize) -> RenderResult<Self> {
        let mut store = Self::new();
        store.global.try_reserve_exact(photons)?;
        Ok(store)
    }

    /// Record a deposit.
    pub fn deposit(&mut self, photon: Photon, caustic: bool) {
        if caustic {
            self.caustic.push(photon);
        }
        self.global.push(photon);
    }

    /// Concatenate another store onto this one, preserving order.
    pub fn append(&mut self, mut other: PhotonStore) -> RenderResult<()> {
        self.caustic.try_reserve(other.caustic.len())?;
        self.global.try_reserve(other.global.len())?;
        self.caustic.append(&mut other.caustic);
        self.global.append(&mut other.global);
        Ok(())
    }

    pub fn caustic(&self) -> &[Photon] {
        &self.caustic
    }

    pub fn global(&self) -> &[Photon] {
        &self.global
    }

    /// Number of deposit events (the size of the global sequence).
    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    /// End the emission phase, handing out (caustic, global) for indexing.
    pub fn freeze(self) -> (Vec<Photon>, Vec<Photon>) {
        (self.caustic, self.global)
    }
}
