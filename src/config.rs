use log::Level;

pub const REVEAL_SELECTOR: &str = "[data-animate]";
pub const COUNTER_SELECTOR: &str = ".counter[data-target]";
pub const COUNTER_TARGET_ATTR: &str = "data-target";
pub const VISIBLE_CLASS: &str = "visible";

pub const INTERSECTION_THRESHOLD: f64 = 0.1;
// Negative bottom margin fires the reveal 80px before the element is fully in view
pub const INTERSECTION_ROOT_MARGIN: &str = "0px 0px -80px 0px";

pub const SAFETY_TIMEOUT_MS: u32 = 1000;
pub const COUNTER_DURATION_MS: f64 = 1600.0;
pub const THOUSANDS_SEPARATOR: char = ',';

pub const NAV_ID: &str = "nav";
pub const NAV_SCROLL_THRESHOLD: f64 = 100.0;

#[cfg(debug_assertions)]
pub fn get_log_level() -> Level {
    Level::Debug
}

#[cfg(not(debug_assertions))]
pub fn get_log_level() -> Level {
    Level::Info
}

/// Timing and layout knobs for the reveal coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealConfig {
    pub threshold: f64,
    pub root_margin: String,
    pub safety_timeout_ms: u32,
    pub counter_duration_ms: f64,
    pub thousands_separator: char,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: INTERSECTION_THRESHOLD,
            root_margin: INTERSECTION_ROOT_MARGIN.to_string(),
            safety_timeout_ms: SAFETY_TIMEOUT_MS,
            counter_duration_ms: COUNTER_DURATION_MS,
            thousands_separator: THOUSANDS_SEPARATOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavConfig {
    pub scroll_threshold: f64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: NAV_SCROLL_THRESHOLD,
        }
    }
}
