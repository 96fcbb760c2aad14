//! Logger bootstrap, grounded on the teacher's `service::logging::Logger`:
//! `simplelog::TermLogger` with RFC-3339 timestamps, and noisy-dependency
//! module filtering disabled at Trace level. `sqlx`/`sea_orm` are dropped
//! from the filter list -- this runtime has no database -- `tower`,
//! `tracing`, `hyper` and `axum` stay, since `via-web` pulls in the same
//! HTTP stack the teacher's own filter list was written for.

use log::LevelFilter;
use simplelog::ConfigBuilder;

use crate::config::Config;

const FILTERED_MODULES: &[&str] = &["tower", "tracing", "hyper", "axum"];

pub struct Logger {}

impl Logger {
    pub fn init_logger(config: &Config) {
        let log_level_filter = Self::convert_level_filter(config.log_level_filter);
        let apply_filters = Self::should_filter_dependencies(config.log_level_filter);
        let log_config = Self::build_log_config(apply_filters);

        simplelog::TermLogger::init(log_level_filter, log_config, simplelog::TerminalMode::Mixed, simplelog::ColorChoice::Auto)
            .expect("failed to start simplelog");
    }

    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filtered_modules_excludes_database_crates() {
        assert!(!FILTERED_MODULES.contains(&"sqlx"));
        assert!(!FILTERED_MODULES.contains(&"sea_orm"));
    }

    #[test]
    fn filtered_modules_still_covers_the_http_stack() {
        for module in ["tower", "tracing", "hyper", "axum"] {
            assert!(FILTERED_MODULES.contains(&module));
        }
    }

    #[test]
    fn should_filter_dependencies_trace_level_disables_filtering() {
        assert!(!Logger::should_filter_dependencies(LevelFilter::Trace));
    }

    #[test]
    fn should_filter_dependencies_other_levels_enable_filtering() {
        for level in [LevelFilter::Off, LevelFilter::Error, LevelFilter::Warn, LevelFilter::Info, LevelFilter::Debug] {
            assert!(Logger::should_filter_dependencies(level));
        }
    }

    #[test]
    fn build_log_config_does_not_panic_either_way() {
        let _ = Logger::build_log_config(true);
        let _ = Logger::build_log_config(false);
    }
}
