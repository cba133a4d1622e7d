use bitmaps::Bitmap as BM;

/// A fixed-width bitmap recording which transceivers have attested to a
/// message. Indexed by the transceiver's stable per-handler index, so the set
/// survives transceiver removal and re-registration.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct Bitmap {
    map: u128,
}

impl Bitmap {
    pub const BITS: u8 = 128;

    pub fn new() -> Self {
        Bitmap { map: 0 }
    }

    pub fn from_value(value: u128) -> Self {
        Bitmap { map: value }
    }

    pub fn set(&mut self, index: u8, value: bool) {
        let mut bm = BM::<128>::from_value(self.map);
        bm.set(index as usize, value);
        self.map = *bm.as_value();
    }

    pub fn get(&self, index: u8) -> bool {
        BM::<128>::from_value(self.map).get(index as usize)
    }

    pub fn count_ones(&self) -> u8 {
        BM::<128>::from_value(self.map).len().try_into().unwrap()
    }
}
