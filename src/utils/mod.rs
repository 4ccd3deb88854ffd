use crate::configs;
use std::time::Instant;

/// Returns a formatted string of elapsed time, e.g.
/// `1min 34.852s`
pub fn get_formatted_elapsed_time(instant: Instant) -> String {
    let dur = instant.elapsed();
    let minutes = dur.as_secs() / 60;
    let sub_sec = dur.as_secs() % 60;
    let sub_milli = dur.subsec_millis();
    if minutes > 0 {
        return format!("{}min {}.{:03}s", minutes, sub_sec, sub_milli);
    }
    format!("{}.{:03}s", sub_sec, sub_milli)
}

/// Number of worker threads a tool may spawn: the logical CPU count, capped
/// by `max_procs` in settings.json when that is positive.
pub fn get_num_procs() -> isize {
    let mut num_procs = num_cpus::get() as isize;
    if let Ok(configs) = configs::get_configs() {
        if configs.max_procs > 0 && configs.max_procs < num_procs {
            num_procs = configs.max_procs;
        }
    }
    num_procs.max(1)
}

/// Strips a trailing `.sgrd`, `.sdat` or `.asc` extension from a grid name.
pub fn strip_grid_extension(name: &str) -> &str {
    for ext in [".sgrd", ".sdat", ".asc"] {
        if name.len() > ext.len() && name.to_lowercase().ends_with(ext) {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_strip_grid_extension() {
        assert_eq!(strip_grid_extension("slope.sgrd"), "slope");
        assert_eq!(strip_grid_extension("slope.SDAT"), "slope");
        assert_eq!(strip_grid_extension("slope"), "slope");
        assert_eq!(strip_grid_extension(".sgrd"), ".sgrd");
    }

    #[test]
    fn test_num_procs_positive() {
        assert!(get_num_procs() >= 1);
    }

    #[test]
    fn test_elapsed_time_format() {
        let s = get_formatted_elapsed_time(Instant::now());
        assert!(s.ends_with('s'));
    }
}
