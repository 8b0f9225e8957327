//! 站点地址（6 字节，与无线网卡 MAC 地址同构）

use crate::LinkError;
use std::fmt;
use std::str::FromStr;

/// 6 字节站点地址
///
/// 文本形式为 `AA:BB:CC:DD:EE:FF`（大小写均可解析，输出为大写）。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PeerId(pub [u8; 6]);

impl PeerId {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({self})")
    }
}

impl FromStr for PeerId {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LinkError::InvalidPeerId(s.to_string());

        let mut bytes = [0u8; 6];
        let mut parts = s.trim().split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 || !part.bytes().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; 6]> for PeerId {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PeerId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for PeerId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: PeerId = "aa:bb:cc:dd:ee:02".parse().unwrap();
        assert_eq!(id.0, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x02]);
        assert_eq!(id.to_string(), "AA:BB:CC:DD:EE:02");
        assert_eq!(format!("{:?}", id), "PeerId(AA:BB:CC:DD:EE:02)");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in [
            "",
            "AA:BB:CC:DD:EE",
            "AA:BB:CC:DD:EE:FF:00",
            "AA:BB:CC:DD:EE:GG",
            "A:BB:CC:DD:EE:FF",
            "AABBCCDDEEFF",
        ] {
            assert!(
                matches!(text.parse::<PeerId>(), Err(LinkError::InvalidPeerId(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_sign_prefix() {
        assert!("+A:BB:CC:DD:EE:02".parse::<PeerId>().is_err());
        assert!("AA:BB:CC:DD:EE:-2".parse::<PeerId>().is_err());
        assert_eq!(
            "FF:FF:FF:FF:FF:FF".parse::<PeerId>().unwrap(),
            PeerId::new([0xFF; 6])
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_as_text() {
        let id = PeerId::new([1, 2, 3, 4, 5, 6]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"01:02:03:04:05:06\"");
        let back: PeerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<PeerId>("\"nope\"").is_err());
    }
}
