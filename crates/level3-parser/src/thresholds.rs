//! Data level to physical value decoding.
//!
//! Each product carries 16 threshold halfwords in its description block.
//! 16-level products store one flagged value per level; digital products
//! store a minimum, an increment and a level count.

use serde::{Deserialize, Serialize};

use crate::tables::DataLevelScheme;

/// Physical value of a decoded gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Value(f32),
    BelowThreshold,
    NoData,
    RangeFolded,
}

impl DataValue {
    pub fn value(self) -> Option<f32> {
        match self {
            DataValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

const FLAG_SPECIAL: u8 = 0x80;
const FLAG_GREATER: u8 = 0x40;
const FLAG_LESS: u8 = 0x20;
const FLAG_PLUS: u8 = 0x10;
const FLAG_MINUS: u8 = 0x08;
const FLAG_SCALE_100: u8 = 0x04;
const FLAG_SCALE_20: u8 = 0x02;
const FLAG_SCALE_10: u8 = 0x01;

/// Qualifier attached to a 16-level threshold ("> 75", "< -30").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Qualifier {
    None,
    Greater,
    Less,
    Plus,
}

/// A decoded 16-level threshold entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: DataValue,
    pub qualifier: Qualifier,
}

/// Decode one flagged threshold halfword.
pub fn decode_threshold(halfword: u16) -> Threshold {
    let [flags, magnitude] = halfword.to_be_bytes();

    if flags & FLAG_SPECIAL != 0 {
        let value = match magnitude {
            1 => DataValue::BelowThreshold,
            3 => DataValue::RangeFolded,
            _ => DataValue::NoData,
        };
        return Threshold {
            value,
            qualifier: Qualifier::None,
        };
    }

    let mut value = f32::from(magnitude);
    if flags & FLAG_SCALE_100 != 0 {
        value /= 100.0;
    } else if flags & FLAG_SCALE_20 != 0 {
        value /= 20.0;
    } else if flags & FLAG_SCALE_10 != 0 {
        value /= 10.0;
    }
    if flags & FLAG_MINUS != 0 {
        value = -value;
    }

    let qualifier = if flags & FLAG_GREATER != 0 {
        Qualifier::Greater
    } else if flags & FLAG_LESS != 0 {
        Qualifier::Less
    } else if flags & FLAG_PLUS != 0 {
        Qualifier::Plus
    } else {
        Qualifier::None
    };

    Threshold {
        value: DataValue::Value(value),
        qualifier,
    }
}

/// Level to value table for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct DataLevels {
    values: Vec<DataValue>,
}

impl DataLevels {
    /// Build the table from the product's threshold halfwords.
    pub fn from_thresholds(scheme: DataLevelScheme, thresholds: &[u16; 16]) -> Self {
        let values = match scheme {
            DataLevelScheme::Legacy16 => thresholds
                .iter()
                .map(|&h| decode_threshold(h).value)
                .collect(),
            DataLevelScheme::Linear => {
                let min = f32::from(thresholds[0] as i16) / 10.0;
                let increment = f32::from(thresholds[1] as i16) / 10.0;
                // Halfword 2 counts data levels; codes 0 and 1 come first.
                let levels = (usize::from(thresholds[2]) + 2).min(256);
                (0..levels)
                    .map(|level| match level {
                        0 => DataValue::BelowThreshold,
                        1 => DataValue::RangeFolded,
                        _ => DataValue::Value(min + (level - 2) as f32 * increment),
                    })
                    .collect()
            }
        };
        Self { values }
    }

    /// Physical value of a data level; levels past the table are no data.
    pub fn decode(&self, level: u16) -> DataValue {
        self.values
            .get(usize::from(level))
            .copied()
            .unwrap_or(DataValue::NoData)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_special_codes() {
        assert_eq!(decode_threshold(0x8001).value, DataValue::BelowThreshold);
        assert_eq!(decode_threshold(0x8002).value, DataValue::NoData);
        assert_eq!(decode_threshold(0x8003).value, DataValue::RangeFolded);
    }

    #[test]
    fn test_decode_flagged_values() {
        // "-30"
        let t = decode_threshold(0x081E);
        assert_eq!(t.value, DataValue::Value(-30.0));
        // "> 75"
        let t = decode_threshold(0x404B);
        assert_eq!(t.value, DataValue::Value(75.0));
        assert_eq!(t.qualifier, Qualifier::Greater);
        // 2.5 scaled by 10
        assert_eq!(decode_threshold(0x0119).value, DataValue::Value(2.5));
        // 0.5 scaled by 100
        assert_eq!(decode_threshold(0x0432).value, DataValue::Value(0.5));
    }

    #[test]
    fn test_linear_levels() {
        let mut thresholds = [0u16; 16];
        thresholds[0] = (-320i16) as u16;
        thresholds[1] = 5;
        thresholds[2] = 254;
        let levels = DataLevels::from_thresholds(DataLevelScheme::Linear, &thresholds);
        assert_eq!(levels.len(), 256);
        assert_eq!(levels.decode(0), DataValue::BelowThreshold);
        assert_eq!(levels.decode(1), DataValue::RangeFolded);
        assert_eq!(levels.decode(2), DataValue::Value(-32.0));
        assert_eq!(levels.decode(66), DataValue::Value(0.0));
        assert_eq!(levels.decode(253), DataValue::Value(93.5));
        assert_eq!(levels.decode(254), DataValue::Value(94.0));
        assert_eq!(levels.decode(255), DataValue::Value(94.5));
        assert_eq!(levels.decode(256), DataValue::NoData);
    }

    #[test]
    fn test_linear_levels_short_table() {
        let mut thresholds = [0u16; 16];
        thresholds[0] = (-635i16) as u16;
        thresholds[1] = 5;
        thresholds[2] = 10;
        let levels = DataLevels::from_thresholds(DataLevelScheme::Linear, &thresholds);
        assert_eq!(levels.len(), 12);
        assert_eq!(levels.decode(11), DataValue::Value(-59.0));
        assert_eq!(levels.decode(12), DataValue::NoData);
    }
}
