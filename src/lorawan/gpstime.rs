//! GPS time conversion
//!
//! GPS time counts seconds since 1980-01-06T00:00:00Z without leap seconds,
//! so it runs ahead of UTC by the number of leap seconds inserted since the
//! epoch (18 as of 2017-01-01).

use chrono::{DateTime, TimeZone, Utc};

/// Unix timestamp of the GPS epoch.
const GPS_EPOCH_UNIX: i64 = 315_964_800;

/// Unix timestamps at which a leap second took effect after the GPS epoch.
const LEAP_SECONDS_UNIX: [i64; 18] = [
    362_793_600,   // 1981-07-01
    394_329_600,   // 1982-07-01
    425_865_600,   // 1983-07-01
    489_024_000,   // 1985-07-01
    567_993_600,   // 1988-01-01
    631_152_000,   // 1990-01-01
    662_688_000,   // 1991-01-01
    709_948_800,   // 1992-07-01
    741_484_800,   // 1993-07-01
    773_020_800,   // 1994-07-01
    820_454_400,   // 1996-01-01
    867_715_200,   // 1997-07-01
    915_148_800,   // 1999-01-01
    1_136_073_600, // 2006-01-01
    1_230_768_000, // 2009-01-01
    1_341_100_800, // 2012-07-01
    1_435_708_800, // 2015-07-01
    1_483_228_800, // 2017-01-01
];

/// Whole GPS seconds at instant `t` (sub-second part truncated).
pub fn to_gps(t: DateTime<Utc>) -> i64 {
    let unix = t.timestamp();
    let leaps = LEAP_SECONDS_UNIX.iter().filter(|&&l| l <= unix).count() as i64;
    unix - GPS_EPOCH_UNIX + leaps
}

/// Instant at `gps` whole seconds since the GPS epoch.
pub fn from_gps(gps: i64) -> DateTime<Utc> {
    let leaps = LEAP_SECONDS_UNIX
        .iter()
        .enumerate()
        .filter(|(i, &l)| l - GPS_EPOCH_UNIX + *i as i64 + 1 <= gps)
        .count() as i64;
    let unix = gps + GPS_EPOCH_UNIX - leaps;
    Utc.timestamp_opt(unix, 0)
        .single()
        .unwrap_or_default()
}
