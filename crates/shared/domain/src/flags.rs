use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// File access flags, bit-compatible with the storage library's own values.
    ///
    /// Read-only access is the absence of [`AccessFlags::READ_WRITE`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct AccessFlags: u32 {
        const READ_WRITE = 1 << 0;
        const TRUNCATE = 1 << 1;
        const EXCLUSIVE = 1 << 2;
        const CREATE = 1 << 4;
    }
}

impl AccessFlags {
    pub const READ_ONLY: Self = Self::empty();

    #[must_use]
    pub const fn is_read_only(self) -> bool {
        !self.contains(Self::READ_WRITE)
    }
}

impl From<u32> for AccessFlags {
    fn from(bits: u32) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl Serialize for AccessFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for AccessFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}
