/// Upstream signal sources.
///
/// Submodules:
/// - `cones`: forecast cone geometry → in-cone flags, storm type, days until impact.
/// - `nws`: NWS active alerts → watch/warning/evacuation flags.

pub mod cones;
pub mod nws;
