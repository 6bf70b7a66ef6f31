#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = sideline_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A validated config must always convert into runtime settings.
        let _ = sideline_core::AssessCfg::from(&cfg);
    }
});
