//! Fuzz target: `SamplingConfig::from_json`
//!
//! Arbitrary payloads either fail with a typed error or yield a config
//! that passes validation and survives a postcard round trip through the
//! in-memory store.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use pointio::adapters::config_store::MemConfigStore;
use pointio::app::ports::ConfigPort;
use pointio::config::SamplingConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = SamplingConfig::from_json(data) else {
        return;
    };
    assert!(config.validate().is_ok());

    let mut store = MemConfigStore::new();
    assert!(store.save(&config).is_ok());
    assert_eq!(store.load().ok(), Some(config));
});
