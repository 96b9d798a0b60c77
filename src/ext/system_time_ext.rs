use std::time::SystemTime;

use ordered_float::OrderedFloat;

/// Modification time in seconds since the Unix epoch.
///
/// Stored as a float because that is what the snapshot file holds, and
/// wrapped so trees of entries can be compared with `==`.
pub type ModTime = OrderedFloat<f64>;

pub trait SystemTimeExt {
    fn to_mod_time(&self) -> ModTime;
}

impl SystemTimeExt for SystemTime {
    fn to_mod_time(&self) -> ModTime {
        let seconds = match self.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(after) => after.as_secs_f64(),
            Err(before) => -before.duration().as_secs_f64(),
        };
        OrderedFloat(seconds)
    }
}
