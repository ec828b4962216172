use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

/// Round a float to N decimal places.
pub fn round_f64(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}

/// Wrapper that rounds f64 to 6 decimal places on serialization.
pub(crate) fn serialize_f64_rounded<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_f64(*v, 6))
}

pub(crate) fn serialize_point<S: Serializer>(p: &[f64; 2], s: S) -> Result<S::Ok, S::Error> {
    let rounded = [round_f64(p[0], 6), round_f64(p[1], 6)];
    rounded.serialize(s)
}

pub(crate) fn serialize_points<S: Serializer>(pts: &[[f64; 2]], s: S) -> Result<S::Ok, S::Error> {
    let mut seq = s.serialize_seq(Some(pts.len()))?;
    for p in pts {
        seq.serialize_element(&[round_f64(p[0], 6), round_f64(p[1], 6)])?;
    }
    seq.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_f64() {
        assert_eq!(round_f64(1.23456789, 6), 1.234568);
        assert_eq!(round_f64(-0.0000004, 6), -0.0);
        assert_eq!(round_f64(2.5, 0), 3.0);
    }
}
