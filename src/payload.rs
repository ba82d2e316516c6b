//! Payload-type allocation for RTX/RED/ULPFEC (spec §4.2).

use std::collections::BTreeMap;

use rand::Rng as _;

/// Forward error correction scheme applied to an outgoing media section.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FecType {
    None,
    UlpRed,
}

/// The set of payload types this engine has allocated for one media index:
/// the negotiated media codec's own PT plus whichever auxiliary PTs
/// (rtx/red/ulpfec/red-rtx) were derived from it.
#[derive(Clone, Debug, Default)]
pub struct PayloadTypeSlot {
    pub media_pt: Option<u8>,
    pub red_pt: Option<u8>,
    pub ulpfec_pt: Option<u8>,
    pub rtx_pt: Option<u8>,
    pub red_rtx_pt: Option<u8>,
}

/// Lowest/highest dynamic payload type an auxiliary PT may be allocated from
/// (spec §4.2 step 2/3: `[96, 127]`).
const DYNAMIC_PT_RANGE: std::ops::RangeInclusive<u8> = 96..=127;

/// Allocates auxiliary payload types across every media index of a
/// PeerConnection, the same way `medea-jason`'s `PeerConnection` keeps one
/// flat registry of send/receive parameters rather than a per-transceiver
/// copy, so a PT picked for one transceiver can never collide with another's.
#[derive(Clone, Debug, Default)]
pub struct PayloadTypeAllocator {
    slots: BTreeMap<usize, PayloadTypeSlot>,
}

impl PayloadTypeAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn slot(&self, media_index: usize) -> Option<&PayloadTypeSlot> {
        self.slots.get(&media_index)
    }

    fn is_used(&self, pt: u8) -> bool {
        self.slots.values().any(|slot| {
            slot.media_pt == Some(pt)
                || slot.red_pt == Some(pt)
                || slot.ulpfec_pt == Some(pt)
                || slot.rtx_pt == Some(pt)
                || slot.red_rtx_pt == Some(pt)
        })
    }

    /// Finds the lowest unused payload type in `[96, 127]`.
    fn allocate_dynamic_pt(&self) -> Option<u8> {
        DYNAMIC_PT_RANGE.into_iter().find(|pt| !self.is_used(*pt))
    }

    /// Reserves `media_pt` for `media_index` so no auxiliary PT collides
    /// with it (spec §4.2 step 1).
    pub fn reserve_media_pt(&mut self, media_index: usize, media_pt: u8) {
        self.slots.entry(media_index).or_default().media_pt = Some(media_pt);
    }

    /// Runs the full allocation algorithm for one outgoing codec (spec
    /// §4.2 steps 2-3). `do_nack` requests an RTX payload type; `fec`
    /// requests RED/ULPFEC payload types.
    ///
    /// Returns `None` if the dynamic PT space is exhausted.
    pub fn allocate(
        &mut self,
        media_index: usize,
        do_nack: bool,
        fec: FecType,
    ) -> Option<()> {
        if fec == FecType::UlpRed {
            let red_pt = self.allocate_dynamic_pt()?;
            self.slots.entry(media_index).or_default().red_pt = Some(red_pt);
            let ulpfec_pt = self.allocate_dynamic_pt()?;
            self.slots.entry(media_index).or_default().ulpfec_pt = Some(ulpfec_pt);
        }
        if do_nack {
            let rtx_pt = self.allocate_dynamic_pt()?;
            self.slots.entry(media_index).or_default().rtx_pt = Some(rtx_pt);
            if fec == FecType::UlpRed {
                let red_rtx_pt = self.allocate_dynamic_pt()?;
                self.slots.entry(media_index).or_default().red_rtx_pt = Some(red_rtx_pt);
            }
        }
        Some(())
    }
}

/// Generates a random SSRC for a locally-originated RTX stream (spec §4.2
/// step 4).
#[must_use]
pub fn generate_rtx_ssrc() -> u32 {
    rand::thread_rng().gen::<u32>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_unused_dynamic_pt() {
        let mut alloc = PayloadTypeAllocator::new();
        alloc.reserve_media_pt(0, 111);
        alloc.allocate(0, true, FecType::None).unwrap();
        assert_eq!(alloc.slot(0).unwrap().rtx_pt, Some(96));

        alloc.allocate(1, true, FecType::UlpRed).unwrap();
        let slot1 = alloc.slot(1).unwrap();
        assert_eq!(slot1.red_pt, Some(97));
        assert_eq!(slot1.ulpfec_pt, Some(98));
        assert_eq!(slot1.rtx_pt, Some(99));
        assert_eq!(slot1.red_rtx_pt, Some(100));
    }

    #[test]
    fn never_reuses_a_pt_across_media_indices() {
        let mut alloc = PayloadTypeAllocator::new();
        alloc.allocate(0, true, FecType::None).unwrap();
        alloc.allocate(1, true, FecType::None).unwrap();
        assert_ne!(alloc.slot(0).unwrap().rtx_pt, alloc.slot(1).unwrap().rtx_pt);
    }
}
