//! Geohash encoding for provider geo-point parameters.

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";
const BITS_PER_CHAR: usize = 5;

/// Encodes a coordinate pair into a base-32 geohash of exactly `precision` characters.
///
/// Bits alternate between longitude and latitude, starting with longitude, each bit
/// halving the remaining interval. Callers are expected to pass latitude in
/// `[-90, 90]` and longitude in `[-180, 180]`.
pub fn encode(lat: f64, lon: f64, precision: usize) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut even_bit = true;
    let mut bit = 0;
    let mut index = 0_usize;

    while hash.len() < precision {
        let (range, value) = if even_bit {
            (&mut lon_range, lon)
        } else {
            (&mut lat_range, lat)
        };
        let mid = (range.0 + range.1) / 2.0;
        index <<= 1;
        if value >= mid {
            index |= 1;
            range.0 = mid;
        } else {
            range.1 = mid;
        }
        even_bit = !even_bit;

        bit += 1;
        if bit == BITS_PER_CHAR {
            hash.push(BASE32[index] as char);
            bit = 0;
            index = 0;
        }
    }

    hash
}
